use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::documents::store::StoreError;
use crate::extraction::merge::{fields_from_json, FieldMap};
use crate::models::document::{FileKind, FilePayload};

pub const EXTRACTION_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("The extraction service took too long to respond. Please try again.")]
    Timeout,

    #[error("Could not reach the extraction service. Check your connection and try again.")]
    Network(#[source] reqwest::Error),

    #[error("The extraction service sent a response we could not read: {0}")]
    InvalidResponse(String),

    #[error("The extraction service failed (status {status}): {message}")]
    Backend { status: u16, message: String },

    #[error("Could not extract details from this document: {0}")]
    Rejected(String),

    #[error("The uploaded file is empty")]
    EmptyUpload,

    #[error("Document {0} not found")]
    ParentNotFound(String),

    #[error(
        "This warranty file is identical to the invoice's file. \
         Nothing was saved; please upload the warranty slip itself."
    )]
    DuplicatePayload,

    #[error("Could not save the extracted document: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Serialize)]
struct WarrantyRequest<'a> {
    image_base64: &'a str,
    file_type: &'static str,
    invoice_data: &'a FieldMap,
}

#[derive(Debug, Serialize)]
struct InvoiceRequest<'a> {
    image_base64: &'a str,
    file_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    invoice: Option<Map<String, Value>>,
    #[serde(default)]
    warranty: Option<Map<String, Value>>,
    #[serde(default)]
    warranty_file_base64: Option<String>,
    #[serde(default)]
    warranty_file_type: Option<String>,
    #[serde(default)]
    warranty_image_base64: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Fields and optional replacement file returned by an extraction call.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// `invoice` fields overlaid with `warranty` fields.
    pub fields: FieldMap,
    pub file: Option<FilePayload>,
    pub message: Option<String>,
}

#[derive(Clone)]
pub struct ExtractionClient {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl ExtractionClient {
    pub fn new(http: Client, base_url: String) -> Self {
        Self {
            http,
            base_url,
            timeout: EXTRACTION_TIMEOUT,
        }
    }

    #[cfg(test)]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// POST /extract-warranty. `invoice_data` carries what is already known
    /// about the product from its parent document.
    pub async fn extract_warranty(
        &self,
        file: &FilePayload,
        invoice_data: &FieldMap,
    ) -> Result<Extraction, ExtractionError> {
        let body = WarrantyRequest {
            image_base64: &file.base64,
            file_type: file.kind.wire_name(),
            invoice_data,
        };
        info!(
            "Extracting warranty slip ({}, {} context fields)",
            file.kind.wire_name(),
            invoice_data.len()
        );
        let response = self.post("extract-warranty", &body).await?;
        Ok(into_extraction(response, file.kind))
    }

    /// POST /extract-invoice. The backend never returns a file here.
    pub async fn extract_invoice(&self, file: &FilePayload) -> Result<Extraction, ExtractionError> {
        let body = InvoiceRequest {
            image_base64: &file.base64,
            file_type: file.kind.wire_name(),
        };
        info!("Extracting invoice ({})", file.kind.wire_name());
        let response = self.post("extract-invoice", &body).await?;
        let mut extraction = into_extraction(response, file.kind);
        extraction.file = None;
        Ok(extraction)
    }

    async fn post<B: Serialize>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<ExtractResponse, ExtractionError> {
        let request = async {
            let response = self
                .http
                .post(format!("{}/{endpoint}", self.base_url))
                .json(body)
                .send()
                .await
                .map_err(ExtractionError::Network)?;
            let status = response.status();
            let text = response.text().await.map_err(ExtractionError::Network)?;
            Ok::<_, ExtractionError>((status, text))
        };

        let (status, text) = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| {
                warn!("/{endpoint} timed out after {}s", self.timeout.as_secs_f32());
                ExtractionError::Timeout
            })??;
        debug!("/{endpoint} answered {status} ({} bytes)", text.len());

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
                .unwrap_or_else(|| text.chars().take(200).collect());
            return Err(ExtractionError::Backend {
                status: status.as_u16(),
                message,
            });
        }

        let response: ExtractResponse = serde_json::from_str(&text)
            .map_err(|e| ExtractionError::InvalidResponse(e.to_string()))?;

        if response.success == Some(false) {
            return Err(ExtractionError::Rejected(
                response
                    .message
                    .unwrap_or_else(|| "no details returned".to_string()),
            ));
        }
        if response.invoice.is_none() && response.warranty.is_none() {
            return Err(ExtractionError::InvalidResponse(
                "response has neither 'invoice' nor 'warranty' fields".to_string(),
            ));
        }
        Ok(response)
    }
}

fn into_extraction(response: ExtractResponse, uploaded_kind: FileKind) -> Extraction {
    let mut fields = response
        .invoice
        .as_ref()
        .map(fields_from_json)
        .unwrap_or_default();
    if let Some(warranty) = &response.warranty {
        fields.extend(fields_from_json(warranty));
    }

    let file = match (response.warranty_file_base64, response.warranty_image_base64) {
        (Some(data), _) if !data.is_empty() => Some(FilePayload {
            kind: response
                .warranty_file_type
                .as_deref()
                .and_then(FileKind::from_wire_name)
                .unwrap_or(uploaded_kind),
            mime_type: None,
            base64: data,
        }),
        (_, Some(legacy)) if !legacy.is_empty() => Some(FilePayload {
            kind: FileKind::Image,
            mime_type: None,
            base64: legacy,
        }),
        _ => None,
    };

    Extraction {
        fields,
        file,
        message: response.message,
    }
}
