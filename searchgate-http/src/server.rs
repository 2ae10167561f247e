use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::auth::{require_secret, Secrets, RESET_PATH};
use crate::handlers::{
    delete_documents, delete_memcache, drop_index, get_memcache, health, put_documents,
    reset_search, search, set_memcache, AppState,
};
use searchgate::store::{HttpCallbackScheduler, MemoryCacheStore, MemorySearchStore};
use searchgate::{GatewayConfig, GatewayError, SearchGateway};

const DEFAULT_MAX_BODY_MB: usize = 1;

/// Assemble the API router. Everything under `/api` requires a secret
/// except the reset callback; `/health` is open. Unknown paths and
/// unsupported methods on known paths both answer with the 404 envelope.
pub fn build_router(state: Arc<AppState>, secrets: Arc<Secrets>, max_body_bytes: usize) -> Router {
    let api = Router::new()
        .route(RESET_PATH, post(reset_search).fallback(not_found))
        .route(
            "/api/search/:ns/:index",
            get(search)
                .put(put_documents)
                .delete(delete_documents)
                .fallback(not_found),
        )
        .route(
            "/api/search/:ns/:index/drop",
            post(drop_index).fallback(not_found),
        )
        .route(
            "/api/memcache",
            get(get_memcache)
                .post(set_memcache)
                .delete(delete_memcache)
                .fallback(not_found),
        )
        .route_layer(middleware::from_fn_with_state(secrets, require_secret))
        .with_state(state.clone());

    let health_route = Router::new()
        .route("/health", get(health).fallback(not_found))
        .with_state(state);

    Router::new()
        .merge(health_route)
        .merge(api)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
}

async fn not_found() -> GatewayError {
    GatewayError::NotFound
}

pub async fn serve() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let secrets = match Secrets::from_env() {
        Ok(s) => Arc::new(s),
        Err(e) => {
            eprintln!("ERROR: {}", e);
            eprintln!("Set SEARCHGATE_LIVE_SECRET and SEARCHGATE_TEST_SECRET.");
            std::process::exit(1);
        }
    };

    let bind_addr =
        std::env::var("SEARCHGATE_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    let callback_url = std::env::var("SEARCHGATE_CALLBACK_URL")
        .unwrap_or_else(|_| format!("http://{}", bind_addr));
    let max_body_mb: usize = std::env::var("SEARCHGATE_MAX_BODY_MB")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_MAX_BODY_MB);

    let config = GatewayConfig::from_env();
    tracing::info!(
        batch_size = config.batch_size,
        max_inflight_batches = config.max_inflight_batches,
        reset_delay_secs = config.reset_delay.as_secs(),
        result_ttl_secs = config.result_ttl.as_secs(),
        "Gateway configuration loaded"
    );

    let scheduler = HttpCallbackScheduler::new(callback_url, Some(secrets.live().to_string()));
    tracing::info!("Delayed resets post to {}", scheduler.base_url());

    let gateway = SearchGateway::new(
        Arc::new(MemorySearchStore::new()),
        Arc::new(MemoryCacheStore::new()),
        Arc::new(scheduler),
        config,
    );
    let state = Arc::new(AppState {
        gateway: Arc::new(gateway),
    });

    let app = build_router(state, secrets, max_body_mb * 1024 * 1024);

    tracing::info!("Starting Searchgate server on {}", bind_addr);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutting down");
}
