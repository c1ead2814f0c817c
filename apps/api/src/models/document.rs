use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Display value for a field the extraction could not fill.
pub const NOT_SPECIFIED: &str = "Not specified";

/// Which screen renders a record and which optional field group is meaningful.
/// Set once at creation time by the flow that produced the record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Invoice,
    Warranty,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Invoice => "invoice",
            DocumentKind::Warranty => "warranty",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Image,
    Pdf,
}

impl FileKind {
    pub fn mime_type(&self) -> &'static str {
        match self {
            FileKind::Image => "image/jpeg",
            FileKind::Pdf => "application/pdf",
        }
    }

    /// The `file_type` value the extraction backend expects.
    pub fn wire_name(&self) -> &'static str {
        match self {
            FileKind::Image => "image",
            FileKind::Pdf => "pdf",
        }
    }

    /// Maps an upload's declared content type. Anything that is not a PDF is
    /// sent to the backend as an image.
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        match content_type {
            Some(ct) if ct.eq_ignore_ascii_case("application/pdf") => FileKind::Pdf,
            _ => FileKind::Image,
        }
    }

    pub fn from_wire_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "pdf" => Some(FileKind::Pdf),
            "image" => Some(FileKind::Image),
            _ => None,
        }
    }
}

/// The embedded document file of a record. The kind travels with the bytes.
///
/// `mime_type` records the declared image format (png, webp, ...) when the
/// uploader supplied one; without it the kind's default MIME type applies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilePayload {
    pub kind: FileKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub base64: String,
}

impl FilePayload {
    pub fn from_bytes(kind: FileKind, bytes: &[u8]) -> Self {
        Self {
            kind,
            mime_type: None,
            base64: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    /// Keeps a declared MIME type if it agrees with the kind. A PDF is always
    /// `application/pdf`; an image accepts any `image/*` type.
    pub fn with_mime_type(mut self, mime_type: Option<&str>) -> Self {
        self.mime_type = match (self.kind, mime_type) {
            (FileKind::Image, Some(mime)) if is_image_mime(mime) => {
                Some(mime.trim().to_ascii_lowercase())
            }
            _ => None,
        };
        self
    }

    pub fn mime_type(&self) -> &str {
        self.mime_type.as_deref().unwrap_or_else(|| self.kind.mime_type())
    }

    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type(), self.base64)
    }
}

fn is_image_mime(mime: &str) -> bool {
    let mime = mime.trim();
    mime.len() > "image/".len()
        && mime
            .get(.."image/".len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("image/"))
        && !mime.contains(|c: char| c.is_whitespace() || c == ';' || c == ',')
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InvoiceFields {
    pub purchase_date: Option<String>,
    pub invoice_date: Option<String>,
    pub price_paid: Option<String>,
    pub net_amount: Option<String>,
    pub tax_amount: Option<String>,
    pub order_number: Option<String>,
    pub invoice_number: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WarrantyFields {
    pub order_date: Option<String>,
    pub document_date: Option<String>,
    pub seller_name: Option<String>,
    pub seller_address: Option<String>,
    pub quantity: Option<String>,
    pub product_code: Option<String>,
    pub warranty_terms: Option<String>,
    pub order_number: Option<String>,
    pub invoice_number: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SharedFields {
    pub model_sku_asin: Option<String>,
    pub specifications: Option<String>,
    pub warranty_period: Option<String>,
    pub next_service_date: Option<String>,
    pub hsn_code: Option<String>,
}

/// Kind-specific field group. The tag doubles as the record's kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocumentDetails {
    Invoice(InvoiceFields),
    Warranty(WarrantyFields),
}

/// A stored invoice or warranty extraction result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentRecord {
    pub id: String,
    pub product_name: String,
    pub brand: String,
    pub store: String,
    #[serde(flatten)]
    pub details: DocumentDetails,
    #[serde(default)]
    pub shared: SharedFields,
    pub extracted_at: DateTime<Utc>,
    pub file: Option<FilePayload>,
}

impl DocumentRecord {
    pub fn kind(&self) -> DocumentKind {
        match self.details {
            DocumentDetails::Invoice(_) => DocumentKind::Invoice,
            DocumentDetails::Warranty(_) => DocumentKind::Warranty,
        }
    }
}

/// Generates a record id: millisecond timestamp plus a short random suffix.
pub fn new_document_id() -> String {
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(9).collect();
    format!("{}-{}", Utc::now().timestamp_millis(), suffix)
}
