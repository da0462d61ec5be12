//! queuedash - terminal dashboard for a local SQS emulator
//!
//! Polls the emulator's statistics endpoint, shows per-queue message counts, and can
//! purge or delete queues through the SQS control endpoint.

mod config;
mod console;

use clap::Parser;
use queuedash_client::{Dashboard, EmulatorClient};
use queuedash_core::{KeyValueStore, MemoryStore, SqliteStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, Overrides, StorageConfig};

#[derive(Parser, Debug)]
#[command(name = "queuedash")]
#[command(about = "Monitoring dashboard for a local SQS emulator", long_about = None)]
struct Args {
    /// Config file (defaults to ./queuedash.toml if present)
    #[arg(short, long, env = "QUEUEDASH_CONFIG")]
    config: Option<PathBuf>,

    /// Base URL of the statistics endpoint
    #[arg(long, env = "QUEUEDASH_STATISTICS_URL")]
    statistics_url: Option<String>,

    /// Base URL of the SQS control endpoint
    #[arg(long, env = "QUEUEDASH_CONTROL_URL")]
    control_url: Option<String>,

    /// Account id used when building queue URLs
    #[arg(long, env = "QUEUEDASH_ACCOUNT_ID")]
    account_id: Option<String>,

    /// Poll interval in milliseconds
    #[arg(long, env = "QUEUEDASH_POLL_INTERVAL_MS")]
    poll_interval_ms: Option<u64>,

    /// Directory for the favorites database
    #[arg(long, env = "QUEUEDASH_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Keep favorites in memory only
    #[arg(long)]
    no_persist: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", env = "QUEUEDASH_LOG_LEVEL")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr so they don't tear the table on stdout
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "queuedash={0},queuedash_client={0},queuedash_core={0}",
                    args.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = Config::load(args.config.as_deref())?;
    config.apply(Overrides {
        statistics_url: args.statistics_url,
        control_url: args.control_url,
        account_id: args.account_id,
        poll_interval_ms: args.poll_interval_ms,
        data_dir: args.data_dir,
        no_persist: args.no_persist,
    });

    let endpoints = config.endpoints.to_endpoint_config()?;
    info!("Starting queuedash...");
    info!("  Statistics: {}", endpoints.statistics_endpoint());
    info!("  Control: {}", endpoints.control_endpoint());
    info!("  Poll interval: {:?}", config.polling.interval());

    let client = Arc::new(EmulatorClient::new(endpoints)?);
    let favorites = open_favorites(&config.storage);

    let dashboard = Arc::new(Dashboard::new(
        client.clone(),
        client,
        favorites,
        config.polling.interval(),
    ));

    console::Console::new(dashboard).run().await
}

/// Favorites backend; falls back to memory if the database can't be opened
fn open_favorites(storage: &StorageConfig) -> Arc<dyn KeyValueStore> {
    match storage {
        StorageConfig::Memory => {
            info!("  Favorites: in memory");
            Arc::new(MemoryStore::new())
        }
        StorageConfig::Sqlite { path } => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    warn!(path = %parent.display(), error = %e, "Failed to create data directory");
                }
            }

            match SqliteStore::open(path) {
                Ok(store) => {
                    info!("  Favorites: {}", path.display());
                    Arc::new(store)
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Favorites database unavailable, keeping favorites in memory");
                    Arc::new(MemoryStore::new())
                }
            }
        }
    }
}
