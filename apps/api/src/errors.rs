use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::documents::store::StoreError;
use crate::extraction::client::ExtractionError;
use crate::recommend::RecommendError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
/// The body carries a single human-readable message.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Recommendation(#[from] RecommendError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Recommendation(e) => match e {
                RecommendError::MissingUrl => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
                }
                RecommendError::Unavailable { .. } => {
                    tracing::error!("Recommendation error: {e}");
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        "RECOMMENDATIONS_UNAVAILABLE",
                        e.to_string(),
                    )
                }
            },
            AppError::Extraction(e) => {
                let (status, code) = match e {
                    ExtractionError::Timeout => (StatusCode::GATEWAY_TIMEOUT, "EXTRACTION_TIMEOUT"),
                    ExtractionError::Network(_) => (StatusCode::BAD_GATEWAY, "EXTRACTION_UNREACHABLE"),
                    ExtractionError::InvalidResponse(_) => {
                        (StatusCode::BAD_GATEWAY, "EXTRACTION_INVALID_RESPONSE")
                    }
                    ExtractionError::Backend { .. } => (StatusCode::BAD_GATEWAY, "EXTRACTION_FAILED"),
                    ExtractionError::Rejected(_) => {
                        (StatusCode::UNPROCESSABLE_ENTITY, "EXTRACTION_REJECTED")
                    }
                    ExtractionError::EmptyUpload => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
                    ExtractionError::ParentNotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                    ExtractionError::DuplicatePayload => (StatusCode::CONFLICT, "DUPLICATE_PAYLOAD"),
                    ExtractionError::Store(_) => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR")
                    }
                };
                if status.is_server_error() {
                    tracing::error!("Extraction error: {e}");
                }
                (status, code, e.to_string())
            }
            AppError::Storage(e) => {
                tracing::error!("Storage error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "Saved documents could not be read or written".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
