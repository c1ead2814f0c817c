use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::document::{
    new_document_id, DocumentDetails, DocumentRecord, FilePayload, SharedFields,
};
use crate::state::AppState;

/// Body of a direct save. `id` and `extracted_at` are assigned when absent;
/// passing an existing id overwrites that record.
#[derive(Debug, Deserialize)]
pub struct SaveDocumentBody {
    pub id: Option<String>,
    pub product_name: String,
    pub brand: String,
    pub store: String,
    #[serde(flatten)]
    pub details: DocumentDetails,
    #[serde(default)]
    pub shared: SharedFields,
    pub extracted_at: Option<DateTime<Utc>>,
    pub file: Option<FilePayload>,
}

#[derive(Serialize)]
pub struct ClearResponse {
    pub removed: usize,
}

/// GET /api/v1/documents
pub async fn handle_list_documents(
    State(state): State<AppState>,
) -> Result<Json<Vec<DocumentRecord>>, AppError> {
    Ok(Json(state.documents.list().await?))
}

/// GET /api/v1/documents/:id
pub async fn handle_get_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DocumentRecord>, AppError> {
    state
        .documents
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Document {id} not found")))
}

/// POST /api/v1/documents
pub async fn handle_save_document(
    State(state): State<AppState>,
    Json(req): Json<SaveDocumentBody>,
) -> Result<(StatusCode, Json<DocumentRecord>), AppError> {
    if req.product_name.trim().is_empty() {
        return Err(AppError::Validation("product_name is required".to_string()));
    }
    let record = DocumentRecord {
        id: req
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(new_document_id),
        product_name: req.product_name,
        brand: req.brand,
        store: req.store,
        details: req.details,
        shared: req.shared,
        extracted_at: req.extracted_at.unwrap_or_else(Utc::now),
        file: req.file,
    };
    state.documents.save(&record).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// DELETE /api/v1/documents/:id
pub async fn handle_delete_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.documents.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/documents
pub async fn handle_clear_documents(
    State(state): State<AppState>,
) -> Result<Json<ClearResponse>, AppError> {
    let removed = state.documents.clear().await?;
    Ok(Json(ClearResponse { removed }))
}
