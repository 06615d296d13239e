mod metrics;
mod spider;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crawlkit_core::{
    create_loaders, load_config, validate_config, DedupMiddleware, Engine, HttpDownloader,
    ItemManager, SanitizedConfig,
};

use spider::{PageRecord, PageSpider};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("CRAWLKIT_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("crawlkit.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Seeds: {}", config.crawl.seeds.join(", "));
    if let Ok(json) = serde_json::to_string(&SanitizedConfig::from(&config)) {
        debug!("Effective configuration: {}", json);
    }

    // Create downloader
    let downloader = HttpDownloader::new(config.downloader.clone())
        .context("Failed to create HTTP downloader")?;

    // Create item pipeline
    let loaders = create_loaders::<PageRecord>(&config.output).context("Failed to create loaders")?;
    info!(
        "Loaders: {}",
        loaders.iter().map(|l| l.name()).collect::<Vec<_>>().join(", ")
    );
    let mut items = ItemManager::new(loaders);
    if config.crawl.dedup_items {
        items = items.with_middleware(DedupMiddleware::new());
    }

    let engine = Engine::new(PageSpider::new(&config.crawl), Arc::new(downloader))
        .with_config(config.engine.clone())
        .with_item_manager(items)
        .on_download_error(|request, e| {
            warn!("{} {} failed: {}", request.method, request.url, e);
        });

    let result = engine.run().await;

    if let Some(path) = &config.metrics.path {
        match metrics::write_metrics(path) {
            Ok(()) => info!("Metrics written to {:?}", path),
            Err(e) => warn!("{:#}", e),
        }
    }

    let summary = result.context("Crawl failed")?;
    info!(
        "Crawl summary: {}",
        serde_json::to_string(&summary).context("Failed to serialize crawl summary")?
    );

    Ok(())
}
