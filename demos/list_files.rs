//! List the files in a storage zone directory.
//!
//! Reads BUNNY_STORAGE_ZONE, BUNNY_STORAGE_API_KEY and optionally
//! BUNNY_STORAGE_REGION from the environment.
//!
//! Run with:
//! ```
//! cargo run --example list_files -- /my-zone/some-dir/
//! ```

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

    let directory = std::env::args().nth(1).unwrap_or_else(|| "/".to_string());

    for entry in client.list(&directory).await? {
        let marker = if entry.is_directory { "/" } else { "" };
        println!(
            "{:>12}  {}  {}{}",
            entry.size,
            entry.date_modified.format("%Y-%m-%d %H:%M:%S"),
            entry.name,
            marker
        );
    }

    Ok(())
}
