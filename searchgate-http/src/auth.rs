use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use searchgate::GatewayError;
use std::sync::Arc;

pub use searchgate::store::scheduler::SECRET_HEADER;

/// Path of the deferred reset callback. It is reachable without a secret.
pub const RESET_PATH: &str = "/api/search/reset";

/// Deployment environment selected by the caller's secret. Each one maps
/// tenants onto its own set of backend namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Env {
    Live,
    Test,
}

impl Env {
    pub fn as_str(&self) -> &'static str {
        match self {
            Env::Live => "live",
            Env::Test => "test",
        }
    }

    /// Backend namespace of a tenant in this environment, e.g. `live_shop`.
    pub fn namespace(&self, tenant: &str) -> String {
        format!("{}_{}", self.as_str(), tenant)
    }
}

#[derive(Clone)]
pub struct Secrets {
    live: String,
    test: String,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets").finish_non_exhaustive()
    }
}

impl Secrets {
    pub fn new(live: impl Into<String>, test: impl Into<String>) -> Result<Self, GatewayError> {
        let (live, test) = (live.into(), test.into());
        if live.is_empty() || test.is_empty() {
            return Err(GatewayError::Config(
                "live and test secrets must both be set".to_string(),
            ));
        }
        Ok(Secrets { live, test })
    }

    /// Read `SEARCHGATE_LIVE_SECRET` and `SEARCHGATE_TEST_SECRET`.
    pub fn from_env() -> Result<Self, GatewayError> {
        Self::new(
            std::env::var("SEARCHGATE_LIVE_SECRET").unwrap_or_default(),
            std::env::var("SEARCHGATE_TEST_SECRET").unwrap_or_default(),
        )
    }

    pub fn live(&self) -> &str {
        &self.live
    }

    pub fn resolve(&self, presented: Option<&str>) -> Option<Env> {
        match presented {
            Some(s) if s == self.live => Some(Env::Live),
            Some(s) if s == self.test => Some(Env::Test),
            _ => None,
        }
    }
}

/// Attach the caller's [`Env`] to the request, or reject it with 403.
/// The reset callback passes through even without a matching secret.
pub async fn require_secret(
    State(secrets): State<Arc<Secrets>>,
    mut request: Request,
    next: Next,
) -> Response {
    let presented = request
        .headers()
        .get(SECRET_HEADER)
        .and_then(|v| v.to_str().ok());

    match secrets.resolve(presented) {
        Some(env) => {
            request.extensions_mut().insert(env);
        }
        None if request.uri().path() == RESET_PATH => {}
        None => return GatewayError::Unauthorized.into_response(),
    }
    next.run(request).await
}
