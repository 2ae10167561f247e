use super::{DeferredTask, TaskScheduler};
use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Header carrying the API secret on callback requests.
pub const SECRET_HEADER: &str = "X-Secret";

/// Fires deferred callbacks as HTTP POSTs with form-encoded parameters.
///
/// Each scheduled task runs in its own tokio task that sleeps for the delay
/// and then posts once. Delivery is best effort: a failed callback is logged
/// and not retried.
pub struct HttpCallbackScheduler {
    base_url: String,
    secret: Option<String>,
    http_client: reqwest::Client,
}

impl HttpCallbackScheduler {
    pub fn new(base_url: impl Into<String>, secret: Option<String>) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secret,
            http_client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl TaskScheduler for HttpCallbackScheduler {
    async fn schedule(&self, task: DeferredTask) -> Result<()> {
        let target = format!("{}{}", self.base_url, task.route);
        let client = self.http_client.clone();
        let secret = self.secret.clone();

        tokio::spawn(async move {
            tokio::time::sleep(task.delay).await;
            let body = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(task.params.iter())
                .finish();
            let mut request = client
                .post(&target)
                .header(reqwest::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(body);
            if let Some(ref s) = secret {
                request = request.header(SECRET_HEADER, s);
            }
            match request.send().await {
                Ok(resp) if resp.status().is_success() => {
                    tracing::debug!(url = %target, "Deferred callback delivered");
                }
                Ok(resp) => {
                    tracing::warn!(url = %target, status = resp.status().as_u16(), "Deferred callback rejected");
                }
                Err(e) => {
                    tracing::warn!(url = %target, "Deferred callback failed: {}", e);
                }
            }
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn posts_form_params_after_delay() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/search/reset"))
            .and(header("X-Secret", "s3cret"))
            .and(body_string_contains("ns=live_shop"))
            .and(body_string_contains("index=products"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let scheduler = HttpCallbackScheduler::new(server.uri(), Some("s3cret".into()));
        scheduler
            .schedule(DeferredTask {
                route: "/api/search/reset".into(),
                params: vec![
                    ("ns".into(), "live_shop".into()),
                    ("index".into(), "products".into()),
                ],
                delay: Duration::from_millis(20),
            })
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(500)).await;
        server.verify().await;
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let s = HttpCallbackScheduler::new("http://127.0.0.1:8080/", None);
        assert_eq!(s.base_url(), "http://127.0.0.1:8080");
    }
}
