use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, RawQuery, State},
    http::StatusCode,
    Json,
};
use searchgate::GatewayError;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use super::AppState;
use crate::dto::{parse_params, request_body, MemcacheItem, MemcacheSetRequest};

/// Lifetime of entries written with `expiration: 0`.
const MAX_EXPIRATION: Duration = Duration::from_secs(30 * 24 * 3600);

fn requested_keys(query: Option<String>) -> Result<Vec<String>, GatewayError> {
    let params = parse_params(query.as_deref().unwrap_or_default());
    let keys = params.values("key").to_vec();
    if keys.is_empty() {
        return Err(GatewayError::BadRequest("keys not found".to_string()));
    }
    Ok(keys)
}

/// `GET /api/memcache?key=a&key=b`: the entries that exist, by key.
/// Lookup failures count as misses.
pub async fn get_memcache(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> Result<Json<BTreeMap<String, MemcacheItem>>, GatewayError> {
    let keys = requested_keys(query)?;
    let cache = state.gateway.cache();
    let mut found = BTreeMap::new();
    for key in keys {
        match cache.get(&key).await {
            Ok(Some(bytes)) => {
                let item = MemcacheItem {
                    key: key.clone(),
                    value: String::from_utf8_lossy(&bytes).into_owned(),
                    expiration: 0,
                };
                found.insert(key, item);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(key = %key, "Memcache get failed: {}", e),
        }
    }
    Ok(Json(found))
}

/// `POST /api/memcache` with `{"items": [...]}`.
pub async fn set_memcache(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<StatusCode, GatewayError> {
    let body = request_body(body)?;
    let req: MemcacheSetRequest = serde_json::from_slice(&body)?;
    let cache = state.gateway.cache();
    for item in req.items {
        let ttl = match item.expiration {
            0 => MAX_EXPIRATION,
            secs => Duration::from_secs(secs),
        };
        cache.set(&item.key, item.value.into_bytes(), ttl).await?;
    }
    Ok(StatusCode::CREATED)
}

/// `DELETE /api/memcache?key=a`. Failures are logged, never reported.
pub async fn delete_memcache(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> Result<StatusCode, GatewayError> {
    let keys = requested_keys(query)?;
    let cache = state.gateway.cache();
    for key in keys {
        if let Err(e) = cache.delete(&key).await {
            tracing::warn!(key = %key, "Memcache delete failed: {}", e);
        }
    }
    Ok(StatusCode::ACCEPTED)
}
