use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, RawQuery, State},
    http::StatusCode,
};
use searchgate::{GatewayError, QueryParams};
use std::sync::Arc;

use super::AppState;
use crate::dto::{parse_params, request_body};

/// `POST /api/search/reset`: bump the generation of one index.
///
/// `ns` is the full backend namespace (already environment-prefixed), as
/// sent by the delayed callback. Form body values win over the query string.
pub async fn reset_search(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
    body: Result<Bytes, BytesRejection>,
) -> Result<StatusCode, GatewayError> {
    let body = request_body(body)?;
    let form = parse_params(&String::from_utf8_lossy(&body));
    let query = parse_params(query.as_deref().unwrap_or_default());
    let value = |name: &str| first_of(&form, name).or_else(|| first_of(&query, name));

    let (ns, index) = match (value("ns"), value("index")) {
        (Some(ns), Some(index)) => (ns, index),
        _ => return Err(GatewayError::BadRequest("ns and index required".to_string())),
    };
    state.gateway.reset_cache(&ns, &index).await?;
    Ok(StatusCode::OK)
}

fn first_of(params: &QueryParams, name: &str) -> Option<String> {
    params
        .values(name)
        .first()
        .filter(|v| !v.is_empty())
        .cloned()
}
