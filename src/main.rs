use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod config;
mod storage;

use storage::{Region, StorageClient};

#[derive(Parser)]
#[command(name = "bunny-storage")]
#[command(version, about = "Client for the Bunny edge storage HTTP API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(long, global = true)]
    config: Option<String>,

    /// Profile to use from config
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Storage zone name
    #[arg(long, global = true, env = "BUNNY_STORAGE_ZONE")]
    zone: Option<String>,

    /// API access key
    #[arg(long, global = true, env = "BUNNY_STORAGE_API_KEY")]
    access_key: Option<String>,

    /// Storage region code (de, uk, se, ny, la, sg, syd, br, jh)
    #[arg(long, global = true, env = "BUNNY_STORAGE_REGION")]
    region: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// List objects in a directory
    Ls {
        /// Remote directory path
        #[arg(default_value = "/")]
        path: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Upload a local file
    Put {
        /// Local file to upload
        local: PathBuf,

        /// Remote destination path
        remote: String,

        /// Send a SHA-256 checksum header for server-side verification
        #[arg(long)]
        checksum: bool,
    },

    /// Download an object to a local file
    Get {
        /// Remote object path
        remote: String,

        /// Local destination file
        local: PathBuf,
    },

    /// Delete objects (more than one path deletes concurrently)
    Rm {
        /// Remote paths to delete
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Check whether an object exists
    Exists {
        /// Remote object path
        path: String,
    },

    /// Delete files older than a given age
    Prune {
        /// Remote directory to scan
        dir: String,

        /// Age threshold in days
        #[arg(long, default_value = "30")]
        older_than_days: i64,

        /// Only print what would be deleted
        #[arg(long)]
        dry_run: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Sequential single-operation CLI; current_thread is sufficient
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<()> {
    let client = build_client(&cli)?;

    match cli.command {
        Commands::Ls { path, json } => {
            cli::commands::cmd_ls(&client, &path, json).await?;
        }
        Commands::Put {
            local,
            remote,
            checksum,
        } => {
            cli::commands::cmd_put(&client, &local, &remote, checksum).await?;
        }
        Commands::Get { remote, local } => {
            cli::commands::cmd_get(&client, &remote, &local).await?;
        }
        Commands::Rm { paths } => {
            cli::commands::cmd_rm(&client, &paths).await?;
        }
        Commands::Exists { path } => {
            let exists = cli::commands::cmd_exists(&client, &path).await?;
            if !exists {
                std::process::exit(1);
            }
        }
        Commands::Prune {
            dir,
            older_than_days,
            dry_run,
        } => {
            cli::commands::cmd_prune(&client, &dir, older_than_days, dry_run).await?;
        }
    }

    Ok(())
}

/// Build the storage client from flags, environment, or config file.
///
/// Priority: explicit --zone/--access-key/--region flags (which also read
/// the BUNNY_STORAGE_* variables) over the config file profile.
fn build_client(cli: &Cli) -> Result<StorageClient> {
    if let (Some(zone), Some(access_key)) = (&cli.zone, &cli.access_key) {
        let region = match &cli.region {
            Some(code) => Region::from_code(code)?,
            None => Region::default(),
        };
        return Ok(StorageClient::new(access_key.clone(), zone.clone(), region));
    }

    let config = config::load_config(cli.config.as_deref(), cli.profile.as_deref())?;
    let profile = config
        .get_profile(None)
        .ok_or_else(|| anyhow::anyhow!("No profile found in configuration"))?;

    let region = Region::from_code(&profile.region)?;
    Ok(StorageClient::new(
        profile.access_key.clone(),
        profile.storage_zone.clone(),
        region,
    ))
}
