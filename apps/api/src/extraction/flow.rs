use bytes::Bytes;
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::documents::store::DocumentStore;
use crate::extraction::client::{ExtractionClient, ExtractionError};
use crate::extraction::merge::{context_fields, invoice_record, merge_fields, warranty_record, FieldMap};
use crate::extraction::payload::PayloadState;
use crate::models::document::{new_document_id, DocumentRecord, FileKind, FilePayload};

/// A file received from the caller.
#[derive(Debug, Clone)]
pub struct Upload {
    pub kind: FileKind,
    /// Declared content type of the part, if any.
    pub mime_type: Option<String>,
    pub bytes: Bytes,
}

impl Upload {
    fn payload(&self) -> FilePayload {
        FilePayload::from_bytes(self.kind, &self.bytes).with_mime_type(self.mime_type.as_deref())
    }
}

/// Extracts a warranty slip and stores it as a new warranty record.
///
/// The record is always `warranty`, whatever the slip looks like: the upload
/// flow decides the kind. When `parent_id` names a known document its fields
/// are sent as context, and the stored file must differ from the parent's.
pub async fn upload_warranty_slip(
    client: &ExtractionClient,
    store: &DocumentStore,
    parent_id: Option<&str>,
    upload: Upload,
) -> Result<DocumentRecord, ExtractionError> {
    if upload.bytes.is_empty() {
        return Err(ExtractionError::EmptyUpload);
    }

    let parent = match parent_id {
        Some(id) => Some(
            store
                .get(id)
                .await?
                .ok_or_else(|| ExtractionError::ParentNotFound(id.to_string()))?,
        ),
        None => None,
    };
    let context = parent.as_ref().map(context_fields).unwrap_or_default();

    let state = PayloadState::pending(upload.payload());
    debug!(
        "Showing local {} preview ({} chars)",
        upload.kind.wire_name(),
        state.display_uri().len()
    );

    let extraction = client.extract_warranty(state.payload(), &context).await?;
    if let Some(message) = &extraction.message {
        debug!("Extraction backend: {message}");
    }
    let state = state.confirm(extraction.file);
    if let PayloadState::ConfirmedLocalFallback(_) = state {
        info!("Backend returned no warranty file; keeping the uploaded file");
    }

    let merged = merge_fields(&context, &extraction.fields);
    let payload = state.into_payload();

    if let Some(parent) = &parent {
        ensure_distinct_payload(parent, &payload)?;
    }

    let record = warranty_record(new_document_id(), &merged, payload, Utc::now());
    store.save(&record).await?;
    info!("Saved warranty {} for '{}'", record.id, record.product_name);
    Ok(record)
}

/// Extracts an invoice and stores it as a new invoice record with the
/// uploaded file as its payload.
pub async fn upload_invoice(
    client: &ExtractionClient,
    store: &DocumentStore,
    upload: Upload,
) -> Result<DocumentRecord, ExtractionError> {
    if upload.bytes.is_empty() {
        return Err(ExtractionError::EmptyUpload);
    }

    let state = PayloadState::pending(upload.payload());
    let extraction = client.extract_invoice(state.payload()).await?;
    let payload = state.confirm(None).into_payload();

    let fields = merge_fields(&FieldMap::new(), &extraction.fields);
    let record = invoice_record(new_document_id(), &fields, payload, Utc::now());
    store.save(&record).await?;
    info!("Saved invoice {} for '{}'", record.id, record.product_name);
    Ok(record)
}

/// Refuses a payload that is byte-for-byte the parent's file. Saving it would
/// make the warranty a copy of the invoice.
fn ensure_distinct_payload(
    parent: &DocumentRecord,
    payload: &FilePayload,
) -> Result<(), ExtractionError> {
    match &parent.file {
        Some(parent_file) if parent_file.base64 == payload.base64 => {
            warn!(
                "Warranty payload for parent {} matches the parent's file; aborting save",
                parent.id
            );
            Err(ExtractionError::DuplicatePayload)
        }
        _ => Ok(()),
    }
}
