pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::documents::handlers as documents;
use crate::extraction::handlers as extraction;
use crate::recommend::handlers as recommend;
use crate::state::AppState;

/// Photos and scanned PDFs routinely exceed axum's 2 MB default.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Recommendations
        .route("/api/v1/recommendations", post(recommend::handle_recommend))
        .route(
            "/api/v1/recommendations/refresh",
            post(recommend::handle_refresh),
        )
        .route(
            "/api/v1/backend/health",
            get(recommend::handle_backend_health),
        )
        // Documents
        .route(
            "/api/v1/documents",
            get(documents::handle_list_documents)
                .post(documents::handle_save_document)
                .delete(documents::handle_clear_documents),
        )
        .route(
            "/api/v1/documents/invoices",
            post(extraction::handle_upload_invoice),
        )
        .route(
            "/api/v1/documents/warranties",
            post(extraction::handle_upload_warranty),
        )
        .route(
            "/api/v1/documents/:id",
            get(documents::handle_get_document).delete(documents::handle_delete_document),
        )
        .route(
            "/api/v1/documents/:id/warranty",
            post(extraction::handle_upload_warranty_for),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use mockito::Server;
    use reqwest::Client;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::db::memory_pool;
    use crate::documents::store::DocumentStore;
    use crate::extraction::client::ExtractionClient;
    use crate::llm_client::LlmClient;
    use crate::recommend::{Device, RecommendationClient};

    async fn app(backend: &Server, provider: &Server) -> Router {
        let config = Config {
            backend_url: backend.url(),
            gemini_api_key: "test-key".to_string(),
            gemini_api_url: provider.url(),
            gemini_model: "gemini-2.5-flash".to_string(),
            device: Device::Ios,
            database_url: "sqlite::memory:".to_string(),
            port: 0,
            rust_log: "debug".to_string(),
        };
        let llm = LlmClient::new(
            config.gemini_api_key.clone(),
            config.gemini_api_url.clone(),
            config.gemini_model.clone(),
        )
        .unwrap();
        let http = Client::new();
        build_router(AppState {
            documents: DocumentStore::new(memory_pool().await),
            recommender: RecommendationClient::new(
                http.clone(),
                config.backend_url.clone(),
                config.device,
                Arc::new(llm),
            ),
            extractor: ExtractionClient::new(http, config.backend_url.clone()),
            config,
        })
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn multipart_request(uri: &str, content_type: &str, bytes: &[u8]) -> Request<Body> {
        let boundary = "dealscout-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"doc\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_document_crud_round_trip() {
        let backend = Server::new_async().await;
        let provider = Server::new_async().await;
        let app = app(&backend, &provider).await;

        let (status, saved) = send(
            &app,
            json_request(
                "POST",
                "/api/v1/documents",
                json!({
                    "product_name": "Earbuds",
                    "brand": "boAt",
                    "store": "Flipkart",
                    "kind": "invoice",
                    "price_paid": "₹1,299",
                    "extracted_at": "2025-11-10T10:00:00Z"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = saved["id"].as_str().unwrap().to_string();
        assert_eq!(saved["kind"], "invoice");

        let (status, fetched) = send(&app, empty_request("GET", &format!("/api/v1/documents/{id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, saved);

        let (status, listed) = send(&app, empty_request("GET", "/api/v1/documents")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let (status, _) = send(&app, empty_request("DELETE", &format!("/api/v1/documents/{id}"))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(&app, empty_request("GET", &format!("/api/v1/documents/{id}"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_clear_documents() {
        let backend = Server::new_async().await;
        let provider = Server::new_async().await;
        let app = app(&backend, &provider).await;

        for name in ["A", "B"] {
            send(
                &app,
                json_request(
                    "POST",
                    "/api/v1/documents",
                    json!({"product_name": name, "brand": "x", "store": "y", "kind": "warranty"}),
                ),
            )
            .await;
        }
        let (status, body) = send(&app, empty_request("DELETE", "/api/v1/documents")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["removed"], 2);
    }

    #[tokio::test]
    async fn test_recommendations_use_share_text_url() {
        let mut backend = Server::new_async().await;
        let provider = Server::new_async().await;
        let mock = backend
            .mock("POST", "/recommend")
            .match_body(mockito::Matcher::PartialJson(json!({
                "url": "https://amzn.in/d/abc",
                "device": "ios",
                "refresh": true
            })))
            .with_status(200)
            .with_body(r#"{"alternatives": [{"title": "Alt"}], "source": "amazon"}"#)
            .create_async()
            .await;
        let app = app(&backend, &provider).await;

        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/api/v1/recommendations/refresh",
                json!({"share_text": "Look at this https://amzn.in/d/abc"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["alternatives"][0]["title"], "Alt");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_recommendations_without_url_is_bad_request() {
        let backend = Server::new_async().await;
        let provider = Server::new_async().await;
        let app = app(&backend, &provider).await;

        let (status, body) = send(
            &app,
            json_request("POST", "/api/v1/recommendations", json!({"share_text": "no link"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_dual_failure_is_service_unavailable() {
        let mut backend = Server::new_async().await;
        let mut provider = Server::new_async().await;
        backend
            .mock("POST", "/recommend")
            .with_status(500)
            .create_async()
            .await;
        provider
            .mock("POST", mockito::Matcher::Any)
            .with_status(503)
            .with_body(r#"{"error": {"message": "model overloaded"}}"#)
            .create_async()
            .await;
        let app = app(&backend, &provider).await;

        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/api/v1/recommendations",
                json!({"url": "https://www.flipkart.com/p/itm1"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let message = body["error"]["message"].as_str().unwrap();
        assert!(message.contains("status 500"), "{message}");
        assert!(message.contains("model overloaded"), "{message}");
    }

    #[tokio::test]
    async fn test_warranty_upload_for_parent() {
        let mut backend = Server::new_async().await;
        let provider = Server::new_async().await;
        backend
            .mock("POST", "/extract-warranty")
            .with_status(200)
            .with_body(r#"{"success": true, "invoice": {"warranty_period": "1 year"}}"#)
            .create_async()
            .await;
        let app = app(&backend, &provider).await;

        let (_, parent) = send(
            &app,
            json_request(
                "POST",
                "/api/v1/documents",
                json!({"id": "inv-1", "product_name": "Desk", "brand": "Ikea", "store": "Amazon", "kind": "invoice"}),
            ),
        )
        .await;
        assert_eq!(parent["id"], "inv-1");

        let (status, body) = send(
            &app,
            multipart_request("/api/v1/documents/inv-1/warranty", "application/pdf", b"%PDF slip"),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["kind"], "warranty");
        assert_eq!(body["product_name"], "Desk");
        assert_eq!(body["shared"]["warranty_period"], "1 year");
        assert_eq!(body["file"]["kind"], "pdf");

        let (_, listed) = send(&app, empty_request("GET", "/api/v1/documents")).await;
        assert_eq!(listed.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_png_invoice_upload_keeps_png_mime_type() {
        let mut backend = Server::new_async().await;
        let provider = Server::new_async().await;
        backend
            .mock("POST", "/extract-invoice")
            .match_body(mockito::Matcher::PartialJson(json!({"file_type": "image"})))
            .with_status(200)
            .with_body(r#"{"success": true, "invoice": {"product_name": "Kettle"}}"#)
            .create_async()
            .await;
        let app = app(&backend, &provider).await;

        let (status, body) = send(
            &app,
            multipart_request("/api/v1/documents/invoices", "image/png", b"\x89PNG\r\n"),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["file"]["kind"], "image");
        assert_eq!(body["file"]["mime_type"], "image/png");

        let id = body["id"].as_str().unwrap();
        let (_, stored) = send(&app, empty_request("GET", &format!("/api/v1/documents/{id}"))).await;
        assert_eq!(stored["file"]["mime_type"], "image/png");
    }

    #[tokio::test]
    async fn test_backend_health_always_healthy() {
        let backend = Server::new_async().await;
        let provider = Server::new_async().await;
        let app = app(&backend, &provider).await;

        let (status, body) = send(&app, empty_request("GET", "/api/v1/backend/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["healthy"], true);
    }
}
