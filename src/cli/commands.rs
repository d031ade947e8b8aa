//! CLI command implementations
//!
//! Each command takes a configured [`StorageClient`] and prints its result
//! to stdout. Library errors are wrapped with anyhow context at this
//! boundary.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use tracing::{info, warn};

use crate::storage::StorageClient;

/// List a directory, as text or JSON
pub async fn cmd_ls(client: &StorageClient, path: &str, json: bool) -> Result<()> {
    let entries = client
        .list(path)
        .await
        .with_context(|| format!("Failed to list '{path}'"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for entry in &entries {
        let marker = if entry.is_directory { "/" } else { "" };
        println!(
            "{:>12}  {}  {}{}",
            entry.size,
            entry.date_modified.format("%Y-%m-%d %H:%M:%S"),
            entry.name,
            marker
        );
    }
    info!(count = entries.len(), path, "listing complete");
    Ok(())
}

/// Upload a local file
pub async fn cmd_put(
    client: &StorageClient,
    local: &Path,
    remote: &str,
    checksum: bool,
) -> Result<()> {
    client
        .upload_file(local, remote, checksum)
        .await
        .with_context(|| format!("Failed to upload {local:?} to '{remote}'"))?;
    println!("Uploaded {} -> {}", local.display(), remote);
    Ok(())
}

/// Download an object to a local file
pub async fn cmd_get(client: &StorageClient, remote: &str, local: &Path) -> Result<()> {
    let bytes = client
        .download_file(remote, local)
        .await
        .with_context(|| format!("Failed to download '{remote}'"))?;
    println!("Downloaded {} -> {} ({} bytes)", remote, local.display(), bytes);
    Ok(())
}

/// Delete one or more objects.
///
/// A single path propagates its error directly; multiple paths are deleted
/// concurrently and per-path failures are reported without aborting the
/// rest.
pub async fn cmd_rm(client: &StorageClient, paths: &[String]) -> Result<()> {
    if let [path] = paths {
        client
            .delete(path)
            .await
            .with_context(|| format!("Failed to delete '{path}'"))?;
        println!("Deleted {path}");
        return Ok(());
    }

    let failures = client.delete_multiple(paths).await;
    for path in paths {
        match failures.get(path) {
            Some(message) => warn!(path = %path, %message, "delete failed"),
            None => println!("Deleted {path}"),
        }
    }

    if !failures.is_empty() {
        for (path, message) in &failures {
            eprintln!("failed: {path}: {message}");
        }
        anyhow::bail!("{} of {} deletes failed", failures.len(), paths.len());
    }
    Ok(())
}

/// Check whether an object exists; returns the answer for the exit code
pub async fn cmd_exists(client: &StorageClient, path: &str) -> Result<bool> {
    let exists = client
        .exists(path)
        .await
        .with_context(|| format!("Failed to check '{path}'"))?;
    println!("{exists}");
    Ok(exists)
}

/// Delete files in a directory older than the given age.
///
/// Directories are never pruned. With `dry_run` the candidates are printed
/// but nothing is deleted.
pub async fn cmd_prune(
    client: &StorageClient,
    dir: &str,
    older_than_days: i64,
    dry_run: bool,
) -> Result<()> {
    let cutoff = Utc::now().naive_utc() - Duration::days(older_than_days);

    let entries = client
        .list(dir)
        .await
        .with_context(|| format!("Failed to list '{dir}'"))?;

    let stale: Vec<String> = entries
        .iter()
        .filter(|e| !e.is_directory && e.date_modified < cutoff)
        .map(|e| format!("{}{}", e.path, e.name))
        .collect();

    if stale.is_empty() {
        println!("Nothing to prune in {dir}");
        return Ok(());
    }

    if dry_run {
        for path in &stale {
            println!("would delete {path}");
        }
        println!("{} file(s) would be deleted", stale.len());
        return Ok(());
    }

    let failures = client.delete_multiple(&stale).await;
    println!(
        "Pruned {} of {} file(s) older than {} day(s)",
        stale.len() - failures.len(),
        stale.len(),
        older_than_days
    );

    if !failures.is_empty() {
        for (path, message) in &failures {
            eprintln!("failed: {path}: {message}");
        }
        anyhow::bail!("{} delete(s) failed", failures.len());
    }
    Ok(())
}
