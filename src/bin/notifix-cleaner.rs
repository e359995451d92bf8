//! NOTIFIX Cleaner Binary
//!
//! Long-running maintenance daemon deleting stale message tracking records.

use anyhow::Context;
use clap::Parser;
use notifix::{Config, MessagesCleaner, PgMessageStore};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// NOTIFIX Cleaner - Message tracking maintenance
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Postgres connection string, overrides the configuration
    #[arg(long)]
    database_url: Option<String>,

    /// Seconds between two cleanup runs
    #[arg(long)]
    interval: Option<u64>,

    /// Run a single cleanup pass and exit
    #[arg(long, default_value_t = false)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("notifix=info".parse()?))
        .init();

    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref()).context("loading configuration")?;
    if let Some(url) = args.database_url {
        config = config.with_database_url(url);
    }
    if let Some(interval) = args.interval {
        config.cleaner.interval_secs = interval;
    }

    let database_url = config
        .cleaner
        .database_url
        .as_deref()
        .context("no database configured, set cleaner.database_url or --database-url")?;

    let store = PgMessageStore::connect(database_url)
        .await
        .context("connecting to the notifications database")?;
    let cleaner = MessagesCleaner::new(Arc::new(store), &config.cleaner);

    if args.once {
        let deleted = cleaner.clean_once().await?;
        info!("Cleanup pass deleted {} tracked messages", deleted);
        return Ok(());
    }

    info!(
        "Starting NOTIFIX cleaner, interval: {:?}, retention: {}h",
        cleaner.interval(),
        cleaner.retention().num_hours()
    );

    let shutdown = CancellationToken::new();
    let handle = cleaner.spawn(shutdown.clone());

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");
    shutdown.cancel();
    handle.await?;

    Ok(())
}
