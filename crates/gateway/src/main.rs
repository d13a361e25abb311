//! PubHarvest API Gateway
//!
//! The operator-facing entry point. Exposes the control surface
//! (fetch-one, fetch-all, delete-author, rebuild-dates), the author
//! admin endpoints, read endpoints for stored publications, and
//! health probes.

mod handlers;

use axum::{
    routing::{delete, get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use pubharvest_common::{
    cache::RedisCache,
    config::AppConfig,
    db::{DbPool, Repository, Store},
    metrics,
};
use pubharvest_ingestion::{AuthorLifecycle, HttpBackend, IngestionPipeline, SearchClient};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, Level};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub store: Arc<dyn Store>,
    pub pipeline: Arc<IngestionPipeline>,
    pub lifecycle: Arc<AuthorLifecycle>,
}

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

    info!("Starting PubHarvest API Gateway v{}", pubharvest_common::VERSION);

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        e
    })?;

    // Initialize metrics
    metrics::register_metrics();
    if config.observability.metrics_port != 0 {
        let metrics_addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        PrometheusBuilder::new()
            .with_http_listener(metrics_addr)
            .install()?;
        info!("Prometheus exporter listening on {}", metrics_addr);
    }

    // Initialize collaborators
    info!("Connecting to database...");
    let db = DbPool::connect(&config.database).await?;
    let store: Arc<dyn Store> = Arc::new(Repository::new(db.clone()));

    info!("Connecting to Redis...");
    let cache = Arc::new(RedisCache::connect(&config.redis).await?);

    let backend = Arc::new(HttpBackend::new(
        config.eutils.clone(),
        config.eutils_timeout(),
    )?);
    let client = SearchClient::new(backend, cache, config.cache_ttl());
    let pipeline = Arc::new(IngestionPipeline::new(
        store.clone(),
        client,
        config.eutils.retmax,
    ));
    let lifecycle = Arc::new(AuthorLifecycle::new(store.clone()));

    // Create app state
    let state = AppState {
        db,
        store,
        pipeline,
        lifecycle,
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // API routes
    let api_routes = Router::new()
        // Author admin endpoints
        .route(
            "/authors",
            post(handlers::authors::save_author).get(handlers::authors::list_authors),
        )
        .route("/authors/{id}", delete(handlers::authors::delete_author))
        // Stored records
        .route(
            "/authors/{id}/publications",
            get(handlers::authors::list_publications),
        )
        // Ingestion control surface
        .route("/authors/{id}/fetch", post(handlers::ingest::fetch_author))
        .route("/fetch-all", post(handlers::ingest::fetch_all))
        .route("/rebuild-dates", post(handlers::ingest::rebuild_dates));

    // Compose the app
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .nest("/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
