use axum::{extract::State, Json};
use std::sync::Arc;

use super::AppState;

/// Health check endpoint
pub async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let config = state.gateway.config();
    Json(serde_json::json!({
        "status": "ok",
        "batch_size": config.batch_size,
        "reset_delay_secs": config.reset_delay.as_secs(),
        "result_ttl_secs": config.result_ttl.as_secs(),
        "build_profile": if cfg!(debug_assertions) { "debug" } else { "release" },
    }))
}
