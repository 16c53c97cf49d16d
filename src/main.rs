use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use newswire::config::Config;
use newswire::feed::FeedFetcher;
use newswire::ingest::{self, RunOptions};
use newswire::registry::FeedRegistry;
use newswire::server::{self, AppState};
use newswire::storage::Database;

#[derive(Parser, Debug)]
#[command(name = "newswire", about = "Publisher feed ingestion service")]
struct Args {
    /// Path to the TOML config file
    #[arg(long, default_value = "newswire.toml")]
    config: PathBuf,

    /// Override the bind address from the config
    #[arg(long)]
    bind: Option<String>,

    /// Run a single ingestion and print the JSON summary instead of serving
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config = Config::load(&args.config).context("Failed to load configuration")?;
    let registry = FeedRegistry::from_config(&config.publishers);
    if registry.is_empty() {
        tracing::warn!("Feed registry is empty; ingestion runs will do nothing");
    }

    let db = Database::open(&config.database_path)
        .await
        .context("Failed to open article store")?;
    let fetcher =
        FeedFetcher::new(config.fetch_timeout_secs).context("Failed to build HTTP client")?;
    let options = RunOptions {
        retention_days: config.retention_days,
        concurrency: config.fetch_concurrency,
    };

    if args.once {
        let stats = ingest::run(&db, &fetcher, &registry, options).await;
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "ok": true, "stats": stats }))?
        );
        return Ok(());
    }

    let bind = args.bind.unwrap_or_else(|| config.bind.clone());
    let state = Arc::new(AppState {
        db,
        fetcher,
        registry,
        options,
    });
    let app = server::router(state);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    tracing::info!(addr = %bind, publishers = config.publishers.len(), "newswire listening");
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
