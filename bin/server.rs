// Family Records - Web Server
// REST API with Axum over the JSON record document

use anyhow::{Context, Result};
use clap::Parser;
use family_records::{api, config::DEFAULT_CONFIG_FILE, logging, registry, Config, JsonFileStore};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "family-records-server")]
#[command(about = "HTTP API for family record entry")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Record document (overrides config file)
    #[arg(short, long, env = "FAMILY_RECORDS_DATA")]
    data: Option<PathBuf>,

    /// Listen address (overrides config file)
    #[arg(short, long, env = "FAMILY_RECORDS_BIND")]
    bind: Option<String>,

    /// Log level (overrides config file)
    #[arg(long, env = "FAMILY_RECORDS_LOG")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(&cli.config)?.with_overrides(cli.data, cli.bind, cli.log_level);
    logging::init(&config.logging)?;

    let store = JsonFileStore::new(&config.store.path);
    let app = api::app(registry(), store)
        .with_context(|| format!("Failed to open record document {:?}", config.store.path))?;
    info!(path = %config.store.path.display(), "record document opened");

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.bind))?;

    info!("server running on http://{}", config.server.bind);
    info!("API: http://{}/api/categories", config.server.bind);

    axum::serve(listener, app).await.context("Server stopped unexpectedly")?;
    Ok(())
}
