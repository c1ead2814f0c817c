//! Recommendation Client: primary backend request with a single fallback hop.
//!
//! 1. POST `{backend}/recommend`, bounded by `PRIMARY_TIMEOUT`.
//! 2. A 2xx body carrying an `alternatives` array is returned verbatim.
//! 3. Anything else (network, timeout, status, shape) hands the bare URL to the
//!    fallback recommender, exactly once, only after the primary has failed.
//! 4. If the fallback fails too, one error names both causes.
//!
//! No retries and no merging of partial results.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::llm_client::LlmError;
use crate::models::recommendation::RecommendationResult;
use crate::recommend::share::detect_source;
use crate::recommend::Device;

pub const PRIMARY_TIMEOUT: Duration = Duration::from_secs(120);
pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Second tier of the recommendation path. Receives only the product URL.
///
/// Carried by `RecommendationClient` as `Arc<dyn FallbackRecommender>`.
#[async_trait]
pub trait FallbackRecommender: Send + Sync {
    async fn recommend(&self, url: &str) -> Result<RecommendationResult, LlmError>;
}

/// Why the primary backend call did not produce a usable result.
#[derive(Debug, Error)]
pub enum PrimaryFailure {
    #[error("request timed out after {}s", .0.as_secs_f32())]
    Timeout(Duration),

    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("backend returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidShape(String),
}

#[derive(Debug, Error)]
pub enum RecommendError {
    #[error("No product URL found in the request or shared text")]
    MissingUrl,

    #[error("Could not get recommendations. Backend: {primary}. Fallback: {fallback}")]
    Unavailable {
        primary: PrimaryFailure,
        fallback: LlmError,
    },
}

#[derive(Debug, Serialize)]
struct RecommendRequest<'a> {
    url: &'a str,
    device: Device,
    refresh: bool,
    share_text: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BackendHealth {
    /// Always true: the fallback path keeps recommendations available.
    pub healthy: bool,
    pub backend_reachable: bool,
}

#[derive(Clone)]
pub struct RecommendationClient {
    http: Client,
    base_url: String,
    device: Device,
    fallback: Arc<dyn FallbackRecommender>,
    primary_timeout: Duration,
    health_timeout: Duration,
}

impl RecommendationClient {
    pub fn new(
        http: Client,
        base_url: String,
        device: Device,
        fallback: Arc<dyn FallbackRecommender>,
    ) -> Self {
        Self {
            http,
            base_url,
            device,
            fallback,
            primary_timeout: PRIMARY_TIMEOUT,
            health_timeout: HEALTH_TIMEOUT,
        }
    }

    #[cfg(test)]
    pub fn with_timeouts(mut self, primary: Duration, health: Duration) -> Self {
        self.primary_timeout = primary;
        self.health_timeout = health;
        self
    }

    pub async fn fetch(
        &self,
        url: &str,
        refresh: bool,
        share_text: Option<&str>,
    ) -> Result<RecommendationResult, RecommendError> {
        info!(
            "Fetching recommendations for {} url (refresh={refresh})",
            detect_source(url).as_str()
        );

        let primary = match self.fetch_primary(url, refresh, share_text).await {
            Ok(result) => {
                info!(
                    "Backend returned {} alternatives",
                    result.alternatives().len()
                );
                return Ok(result);
            }
            Err(failure) => failure,
        };

        warn!("Primary recommendation path failed ({primary}); using AI fallback");

        match self.fallback.recommend(url).await {
            Ok(result) => {
                info!(
                    "Fallback returned {} alternatives",
                    result.alternatives().len()
                );
                Ok(result)
            }
            Err(fallback) => {
                warn!("Fallback recommendation path failed: {fallback}");
                Err(RecommendError::Unavailable { primary, fallback })
            }
        }
    }

    /// Same as `fetch` with the backend told to bypass its cache.
    pub async fn refresh(
        &self,
        url: &str,
        share_text: Option<&str>,
    ) -> Result<RecommendationResult, RecommendError> {
        self.fetch(url, true, share_text).await
    }

    /// Probes the backend. Never reports unhealthy.
    pub async fn health(&self) -> BackendHealth {
        let probe = self
            .http
            .get(format!("{}/health", self.base_url))
            .send();
        let backend_reachable = match tokio::time::timeout(self.health_timeout, probe).await {
            Ok(Ok(response)) => response.status().is_success(),
            Ok(Err(e)) => {
                warn!("Backend health probe failed: {e}");
                false
            }
            Err(_) => {
                warn!(
                    "Backend health probe timed out after {}s",
                    self.health_timeout.as_secs_f32()
                );
                false
            }
        };
        info!("Backend reachable: {backend_reachable}");
        BackendHealth {
            healthy: true,
            backend_reachable,
        }
    }

    async fn fetch_primary(
        &self,
        url: &str,
        refresh: bool,
        share_text: Option<&str>,
    ) -> Result<RecommendationResult, PrimaryFailure> {
        let body = RecommendRequest {
            url,
            device: self.device,
            refresh,
            share_text,
        };
        let request = async {
            let response = self
                .http
                .post(format!("{}/recommend", self.base_url))
                .json(&body)
                .send()
                .await
                .map_err(PrimaryFailure::Network)?;
            let status = response.status();
            let text = response.text().await.map_err(PrimaryFailure::Network)?;
            Ok::<_, PrimaryFailure>((status, text))
        };

        // Dropping the request future on timeout aborts the in-flight call.
        let (status, text) = tokio::time::timeout(self.primary_timeout, request)
            .await
            .map_err(|_| PrimaryFailure::Timeout(self.primary_timeout))??;

        if !status.is_success() {
            return Err(PrimaryFailure::Status {
                status: status.as_u16(),
                message: backend_detail(&text),
            });
        }

        serde_json::from_str(&text).map_err(|e| PrimaryFailure::InvalidShape(e.to_string()))
    }
}

/// FastAPI errors arrive as `{"detail": "..."}`; fall back to the raw body.
fn backend_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.chars().take(200).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::net::TcpListener;

    const URL: &str = "https://www.amazon.in/dp/B08N5WRWNW";

    struct StubFallback {
        calls: AtomicUsize,
        fail: bool,
    }

    impl StubFallback {
        fn ok() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail: true,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FallbackRecommender for StubFallback {
        async fn recommend(&self, url: &str) -> Result<RecommendationResult, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(LlmError::Api {
                    status: 429,
                    message: "Quota exceeded".to_string(),
                });
            }
            Ok(serde_json::from_value(json!({
                "source": "amazon",
                "canonical_url": url,
                "alternatives": [{"title": "Fallback Phone"}]
            }))
            .unwrap())
        }
    }

    fn client(server: &Server, fallback: Arc<StubFallback>) -> RecommendationClient {
        RecommendationClient::new(Client::new(), server.url(), Device::Android, fallback)
            .with_timeouts(Duration::from_secs(5), Duration::from_secs(5))
    }

    /// A backend that accepts connections and never answers.
    async fn silent_backend() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        format!("http://{addr}")
    }

    fn title(result: &RecommendationResult, index: usize) -> &Value {
        &result.alternatives()[index]["title"]
    }

    const VALID_BODY: &str = r#"{
        "source": "amazon",
        "canonical_url": "https://www.amazon.in/dp/B08N5WRWNW",
        "query_time_iso": "2025-11-10T10:00:00",
        "alternatives": [
            {"id": "p1", "brand": "Samsung", "model": "M14", "title": "Samsung Galaxy M14",
             "image_url": "", "price_estimate": "₹12,999", "price_raw": 12999,
             "specs": ["6000mAh"], "connectivity": ["5G"], "why_pick": "Battery",
             "tradeoffs": "Plastic", "source_url": "https://www.amazon.in/s?k=m14",
             "source_site": "amazon"}
        ],
        "meta": {"validation": {"llm_valid_json": true, "image_urls_checked": true}, "warnings": []}
    }"#;

    #[tokio::test]
    async fn test_valid_primary_returned_verbatim_without_fallback() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/recommend")
            .match_body(Matcher::Json(serde_json::json!({
                "url": URL,
                "device": "android",
                "refresh": false,
                "share_text": null
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(VALID_BODY)
            .create_async()
            .await;
        let fallback = StubFallback::ok();

        let result = client(&server, fallback.clone())
            .fetch(URL, false, None)
            .await
            .unwrap();

        let expected: Value = serde_json::from_str(VALID_BODY).unwrap();
        assert_eq!(serde_json::to_value(&result).unwrap(), expected);
        assert_eq!(fallback.calls(), 0);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_loosely_typed_alternatives_are_accepted_verbatim() {
        let bodies = [
            json!({"alternatives": [{"title": "X", "price_raw": 12999.5}]}),
            json!({"alternatives": [{"title": "X", "specs": null}]}),
            json!({"alternatives": ["X"]}),
            json!({"alternatives": []}),
        ];
        for body in bodies {
            let mut server = Server::new_async().await;
            server
                .mock("POST", "/recommend")
                .with_status(200)
                .with_body(body.to_string())
                .create_async()
                .await;
            let fallback = StubFallback::ok();

            let result = client(&server, fallback.clone())
                .fetch(URL, false, None)
                .await
                .unwrap();

            assert_eq!(serde_json::to_value(&result).unwrap(), body);
            assert_eq!(fallback.calls(), 0, "fallback ran for {body}");
        }
    }

    #[tokio::test]
    async fn test_refresh_sets_flag_and_share_text() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/recommend")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "refresh": true,
                "share_text": "look at this"
            })))
            .with_status(200)
            .with_body(r#"{"alternatives": []}"#)
            .create_async()
            .await;
        let fallback = StubFallback::ok();

        let result = client(&server, fallback.clone())
            .refresh(URL, Some("look at this"))
            .await
            .unwrap();

        assert!(result.alternatives().is_empty());
        assert_eq!(fallback.calls(), 0);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_falls_back_once() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/recommend")
            .with_status(500)
            .with_body(r#"{"detail": "Backend error: scraper down"}"#)
            .create_async()
            .await;
        let fallback = StubFallback::ok();

        let result = client(&server, fallback.clone())
            .fetch(URL, false, None)
            .await
            .unwrap();

        assert_eq!(title(&result, 0), "Fallback Phone");
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test]
    async fn test_malformed_json_falls_back_once() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/recommend")
            .with_status(200)
            .with_body("{\"alternatives\": [")
            .create_async()
            .await;
        let fallback = StubFallback::ok();

        client(&server, fallback.clone())
            .fetch(URL, false, None)
            .await
            .unwrap();
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test]
    async fn test_missing_alternatives_falls_back_once() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/recommend")
            .with_status(200)
            .with_body(r#"{"message": "Price refresh not yet implemented"}"#)
            .create_async()
            .await;
        let fallback = StubFallback::ok();

        client(&server, fallback.clone())
            .fetch(URL, false, None)
            .await
            .unwrap();
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test]
    async fn test_timeout_falls_back_once() {
        let fallback = StubFallback::ok();
        let client = RecommendationClient::new(
            Client::new(),
            silent_backend().await,
            Device::Android,
            fallback.clone(),
        )
        .with_timeouts(Duration::from_millis(300), Duration::from_millis(300));

        let result = client.fetch(URL, false, None).await.unwrap();
        assert_eq!(title(&result, 0), "Fallback Phone");
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test]
    async fn test_silent_backend_reported_unreachable_but_healthy() {
        let client = RecommendationClient::new(
            Client::new(),
            silent_backend().await,
            Device::Android,
            StubFallback::ok(),
        )
        .with_timeouts(Duration::from_millis(300), Duration::from_millis(300));

        let health = client.health().await;
        assert!(health.healthy);
        assert!(!health.backend_reachable);
    }

    #[tokio::test]
    async fn test_unreachable_backend_falls_back_once() {
        let fallback = StubFallback::ok();
        let client = RecommendationClient::new(
            Client::new(),
            "http://127.0.0.1:9".to_string(),
            Device::Ios,
            fallback.clone(),
        )
        .with_timeouts(Duration::from_secs(2), Duration::from_secs(2));

        client.fetch(URL, false, None).await.unwrap();
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test]
    async fn test_both_paths_failing_names_both_causes() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/recommend")
            .with_status(503)
            .with_body(r#"{"detail": "Gemini API quota exceeded"}"#)
            .create_async()
            .await;
        let fallback = StubFallback::failing();

        let err = client(&server, fallback.clone())
            .fetch(URL, false, None)
            .await
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("status 503"), "{message}");
        assert!(message.contains("Gemini API quota exceeded"), "{message}");
        assert!(message.contains("Quota exceeded"), "{message}");
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test]
    async fn test_health_reports_healthy_when_backend_down() {
        let client = RecommendationClient::new(
            Client::new(),
            "http://127.0.0.1:9".to_string(),
            Device::Android,
            StubFallback::ok(),
        );
        let health = client.health().await;
        assert!(health.healthy);
        assert!(!health.backend_reachable);
    }

    #[tokio::test]
    async fn test_health_reports_reachable_backend() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/health")
            .with_status(200)
            .with_body(r#"{"status": "healthy"}"#)
            .create_async()
            .await;

        let health = client(&server, StubFallback::ok()).health().await;
        assert!(health.healthy);
        assert!(health.backend_reachable);
    }

    #[test]
    fn test_backend_detail_extraction() {
        assert_eq!(backend_detail(r#"{"detail": "boom"}"#), "boom");
        assert_eq!(backend_detail("Internal Server Error"), "Internal Server Error");
    }
}
