//! PubHarvest Ingestion Service
//!
//! Refreshes stored publications for every author on a fixed interval:
//! 1. Resolves each author's effective query
//! 2. Fetches and normalizes upstream records (cached)
//! 3. Upserts publications and author associations

use pubharvest_common::{
    cache::RedisCache,
    config::AppConfig,
    db::{DbPool, Repository, Store},
    metrics, VERSION,
};
use pubharvest_ingestion::{HttpBackend, IngestionPipeline, SearchClient};
use std::sync::Arc;
use tracing::{error, info, Level};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(true)
        .json()
        .init();

    info!("Starting PubHarvest Ingestion Service v{}", VERSION);

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        e
    })?;

    metrics::register_metrics();

    // Initialize collaborators
    info!("Connecting to database...");
    let db = DbPool::connect(&config.database).await?;
    let store: Arc<dyn Store> = Arc::new(Repository::new(db));

    info!("Connecting to Redis...");
    let cache = Arc::new(RedisCache::connect(&config.redis).await?);

    let backend = Arc::new(HttpBackend::new(
        config.eutils.clone(),
        config.eutils_timeout(),
    )?);
    let client = SearchClient::new(backend, cache, config.cache_ttl());
    let pipeline = IngestionPipeline::new(store, client, config.eutils.retmax);

    info!(
        interval_secs = config.sync.interval_secs,
        "Ingestion service ready"
    );

    // First tick fires immediately, then every interval
    let mut ticker = tokio::time::interval(config.sync_interval());

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match pipeline.run_for_all(false).await {
                    Ok(sweep) => info!(
                        authors = sweep.authors,
                        failed = sweep.failed,
                        upserted = sweep.upserted,
                        "Refresh sweep complete"
                    ),
                    Err(e) => error!(error = %e, "Refresh sweep failed"),
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    info!("Ingestion service shutting down");
    Ok(())
}
