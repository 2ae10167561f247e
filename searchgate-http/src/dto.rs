use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use searchgate::{DocumentId, DocumentInput, GatewayError, QueryParams};
use serde::{Deserialize, Serialize};

/// Body of `PUT /api/search/{ns}/{index}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PutRequest {
    #[serde(default)]
    pub docs: Vec<DocumentInput>,
}

/// A raw cache entry as written through `POST /api/memcache`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemcacheItem {
    pub key: String,
    #[serde(default)]
    pub value: String,
    /// Lifetime in seconds; 0 keeps the entry for the maximum lifetime.
    #[serde(default)]
    pub expiration: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemcacheSetRequest {
    #[serde(default)]
    pub items: Vec<MemcacheItem>,
}

/// Decode a query string or form body, keeping repeated keys in order.
pub fn parse_params(raw: &str) -> QueryParams {
    QueryParams::from_pairs(url::form_urlencoded::parse(raw.as_bytes()).into_owned())
}

/// Unwrap a buffered request body, turning axum's plain-text rejection
/// into a [`GatewayError`] so it renders as the JSON error envelope.
pub fn request_body(body: Result<Bytes, BytesRejection>) -> Result<Bytes, GatewayError> {
    body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            GatewayError::PayloadTooLarge
        } else {
            GatewayError::BadRequest(rejection.body_text())
        }
    })
}

/// IDs for a delete: repeated `id` parameters, or else a comma-separated
/// `ids` list.
pub fn delete_ids(params: &QueryParams) -> Vec<DocumentId> {
    let repeated = params.values("id");
    if !repeated.is_empty() {
        return repeated.to_vec();
    }
    match params.values("ids").first() {
        Some(list) => list
            .split(',')
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect(),
        None => Vec::new(),
    }
}
