//! docstore CLI: store and query JSON documents in SQLite. Config from env and optional CLI args.

use anyhow::{Context, Result};
use clap::Parser;
use docstore::{DocumentStore, StoreConfig};
use docstore_cli::{execute, init_tracing, Cli};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let log_file = std::env::var("DOCSTORE_LOG_FILE").ok();
    init_tracing(log_file.as_deref())?;

    let cli = Cli::parse();

    let mut config = StoreConfig::from_env().context("Load store config from env")?;
    if let Some(url) = cli.database {
        config.database_url = url;
    }

    info!(database_url = %config.database_url, "Opening document store");
    let store = DocumentStore::connect(&config)
        .await
        .with_context(|| format!("Open document store at {}", config.database_url))?;

    let output = execute(&store, cli.command).await?;
    println!("{}", output);

    store.pool().close().await;
    info!("Document store closed");
    Ok(())
}
