//! Delete files older than a cutoff from a storage zone directory.
//!
//! All stale files are deleted concurrently in one settled batch; a failed
//! delete never stops the others.
//!
//! Environment: BUNNY_STORAGE_ZONE, BUNNY_STORAGE_API_KEY, optionally
//! BUNNY_STORAGE_REGION, BUNNY_SCAN_PATH, BUNNY_MAX_AGE_DAYS and
//! BUNNY_DRY_RUN.

use chrono::{Duration, Utc};

use bunny_storage::storage::{Region, StorageClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = bunny_storage::config::load_from_env()?;
    let profile = config
        .get_profile(None)
        .ok_or_else(|| anyhow::anyhow!("no profile configured"))?;

    let client = StorageClient::new(
        profile.access_key.clone(),
        profile.storage_zone.clone(),
        Region::from_code(&profile.region)?,
    );

    let scan_path = std::env::var("BUNNY_SCAN_PATH").unwrap_or_else(|_| "/".to_string());
    let max_age_days: i64 = std::env::var("BUNNY_MAX_AGE_DAYS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(30);
    let dry_run = std::env::var("BUNNY_DRY_RUN").map(|v| v != "false").unwrap_or(true);

    let cutoff = Utc::now().naive_utc() - Duration::days(max_age_days);

    let stale: Vec<String> = client
        .list(&scan_path)
        .await?
        .into_iter()
        .filter(|e| !e.is_directory && e.date_modified < cutoff)
        .map(|e| format!("{}{}", e.path, e.name))
        .collect();

    if stale.is_empty() {
        println!("nothing older than {max_age_days} day(s) in {scan_path}");
        return Ok(());
    }

    if dry_run {
        for path in &stale {
            println!("would delete {path}");
        }
        println!("{} file(s) would be deleted (set BUNNY_DRY_RUN=false to delete)", stale.len());
        return Ok(());
    }

    let failures = client.delete_multiple(&stale).await;
    println!("deleted {} of {} file(s)", stale.len() - failures.len(), stale.len());
    for (path, message) in &failures {
        eprintln!("failed: {path}: {message}");
    }

    Ok(())
}
