use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, Path, RawQuery, State},
    http::StatusCode,
    Extension, Json,
};
use searchgate::{DocumentId, GatewayError};
use std::sync::Arc;

use super::AppState;
use crate::auth::Env;
use crate::dto::{delete_ids, parse_params, request_body, PutRequest};

/// `PUT /api/search/{ns}/{index}`: index documents, returning their IDs.
pub async fn put_documents(
    State(state): State<Arc<AppState>>,
    Extension(env): Extension<Env>,
    Path((ns, index)): Path<(String, String)>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<Vec<DocumentId>>, GatewayError> {
    let body = request_body(body)?;
    let req: PutRequest = serde_json::from_slice(&body)?;
    let docs = req.docs.into_iter().map(|d| d.into_document()).collect();
    let ids = state
        .gateway
        .put(&env.namespace(&ns), &index, docs)
        .await?;
    Ok(Json(ids))
}

/// `DELETE /api/search/{ns}/{index}?id=a&id=b` (or `?ids=a,b`)
pub async fn delete_documents(
    State(state): State<Arc<AppState>>,
    Extension(env): Extension<Env>,
    Path((ns, index)): Path<(String, String)>,
    RawQuery(query): RawQuery,
) -> Result<StatusCode, GatewayError> {
    let ids = delete_ids(&parse_params(query.as_deref().unwrap_or_default()));
    state
        .gateway
        .delete(&env.namespace(&ns), &index, &ids)
        .await?;
    Ok(StatusCode::OK)
}

/// `POST /api/search/{ns}/{index}/drop`: delete every document.
pub async fn drop_index(
    State(state): State<Arc<AppState>>,
    Extension(env): Extension<Env>,
    Path((ns, index)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, GatewayError> {
    let deleted = state
        .gateway
        .drop_index(&env.namespace(&ns), &index)
        .await?;
    Ok(Json(serde_json::json!({ "deleted": deleted })))
}
