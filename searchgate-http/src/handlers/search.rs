use axum::{
    extract::{Path, RawQuery, State},
    Extension, Json,
};
use searchgate::{GatewayError, SearchOutcome};
use std::sync::Arc;

use super::AppState;
use crate::auth::Env;
use crate::dto::parse_params;

/// `GET /api/search/{ns}/{index}`
///
/// Returns a bare ID array for `ids=true`, the full response otherwise.
pub async fn search(
    State(state): State<Arc<AppState>>,
    Extension(env): Extension<Env>,
    Path((ns, index)): Path<(String, String)>,
    RawQuery(query): RawQuery,
) -> Result<Json<SearchOutcome>, GatewayError> {
    let params = parse_params(query.as_deref().unwrap_or_default());
    let outcome = state
        .gateway
        .search(&env.namespace(&ns), &index, &params)
        .await?;
    Ok(Json(outcome))
}
