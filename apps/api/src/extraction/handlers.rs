use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;

use crate::errors::AppError;
use crate::extraction::flow::{upload_invoice, upload_warranty_slip, Upload};
use crate::models::document::{DocumentRecord, FileKind};
use crate::state::AppState;

/// Reads the `file` part of a multipart upload. The kind comes from an
/// optional `file_type` part ("pdf" | "image"), else the part's content type.
async fn read_upload(mut multipart: Multipart) -> Result<Upload, AppError> {
    let mut file: Option<(Option<String>, Bytes)> = None;
    let mut declared: Option<FileKind> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(e.body_text()))?;
                file = Some((content_type, bytes));
            }
            Some("file_type") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(e.body_text()))?;
                declared = Some(FileKind::from_wire_name(&text).ok_or_else(|| {
                    AppError::Validation(format!("file_type must be 'pdf' or 'image', got '{text}'"))
                })?);
            }
            _ => {}
        }
    }

    let (content_type, bytes) =
        file.ok_or_else(|| AppError::Validation("multipart field 'file' is required".to_string()))?;
    let kind = declared.unwrap_or_else(|| FileKind::from_content_type(content_type.as_deref()));
    Ok(Upload {
        kind,
        mime_type: content_type,
        bytes,
    })
}

/// POST /api/v1/documents/invoices
pub async fn handle_upload_invoice(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<DocumentRecord>), AppError> {
    let upload = read_upload(multipart).await?;
    let record = upload_invoice(&state.extractor, &state.documents, upload).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// POST /api/v1/documents/warranties
pub async fn handle_upload_warranty(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<DocumentRecord>), AppError> {
    let upload = read_upload(multipart).await?;
    let record = upload_warranty_slip(&state.extractor, &state.documents, None, upload).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// POST /api/v1/documents/:id/warranty
pub async fn handle_upload_warranty_for(
    State(state): State<AppState>,
    Path(parent_id): Path<String>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<DocumentRecord>), AppError> {
    let upload = read_upload(multipart).await?;
    let record =
        upload_warranty_slip(&state.extractor, &state.documents, Some(&parent_id), upload).await?;
    Ok((StatusCode::CREATED, Json(record)))
}
