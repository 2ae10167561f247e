use http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum GatewayError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found")]
    NotFound,

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("Cache store error: {0}")]
    Cache(String),

    #[error("Search store error: {0}")]
    Search(String),

    #[error("Task scheduler error: {0}")]
    Scheduler(String),

    #[error("{op} errs: {}", .errors.join("; "))]
    AggregateWrite { op: &'static str, errors: Vec<String> },

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, GatewayError>;

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        GatewayError::BadRequest(format!("Invalid JSON: {}", e))
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        GatewayError::Scheduler(e.to_string())
    }
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Unauthorized => StatusCode::FORBIDDEN,
            GatewayError::NotFound => StatusCode::NOT_FOUND,
            GatewayError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::Cache(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Search(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Scheduler(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::AggregateWrite { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to API callers. Only bad requests echo their detail;
    /// everything else is reduced to the status text and logged instead.
    pub fn public_message(&self) -> String {
        match self {
            GatewayError::BadRequest(msg) => msg.clone(),
            other => other
                .status_code()
                .canonical_reason()
                .unwrap_or("Error")
                .to_string(),
        }
    }

    /// True for failures of the search backend or of a batched write, which
    /// are always surfaced to the caller.
    pub fn is_backend(&self) -> bool {
        matches!(
            self,
            GatewayError::Cache(_)
                | GatewayError::Search(_)
                | GatewayError::Scheduler(_)
                | GatewayError::AggregateWrite { .. }
        )
    }
}

// Axum IntoResponse implementation (feature-gated)
#[cfg(feature = "axum-support")]
use axum::response::{IntoResponse, Json, Response};
#[cfg(feature = "axum-support")]
use serde::Serialize;

#[cfg(feature = "axum-support")]
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(feature = "axum-support")]
impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if self.is_backend() {
            tracing::error!(status = status.as_u16(), "APIError: {}", self);
        } else {
            tracing::warn!(status = status.as_u16(), "APIError: {}", self);
        }
        let body = ErrorResponse {
            error: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}
