//! Field merging and record assembly for extraction results.
//!
//! Backend fields arrive as loose string maps. Returned values override the
//! context known from the parent document, except where the backend only
//! has a placeholder. Placeholders and gaps are shown as `NOT_SPECIFIED`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::models::document::{
    DocumentDetails, DocumentRecord, FilePayload, InvoiceFields, SharedFields, WarrantyFields,
    NOT_SPECIFIED,
};

pub type FieldMap = BTreeMap<String, String>;

const PLACEHOLDERS: &[&str] = &["n/a", "na", "none", "null", "unknown", "-", "not specified"];

pub fn is_placeholder(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || PLACEHOLDERS.iter().any(|p| value.eq_ignore_ascii_case(p))
}

/// Converts a backend JSON object into a field map. Numbers and booleans are
/// stringified; nested values and nulls are dropped.
pub fn fields_from_json(object: &Map<String, Value>) -> FieldMap {
    object
        .iter()
        .filter_map(|(key, value)| {
            let text = match value {
                Value::String(s) => s.trim().to_string(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => return None,
            };
            Some((key.clone(), text))
        })
        .collect()
}

/// Layers `returned` over `context`. Placeholder values never override.
pub fn merge_fields(context: &FieldMap, returned: &FieldMap) -> FieldMap {
    let mut merged: FieldMap = context
        .iter()
        .filter(|(_, v)| !is_placeholder(v))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    for (key, value) in returned {
        if !is_placeholder(value) {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// The fields of a known document that the extraction backend accepts as
/// `invoice_data`.
pub fn context_fields(parent: &DocumentRecord) -> FieldMap {
    let mut fields = FieldMap::new();
    let mut put = |key: &str, value: Option<&String>| {
        if let Some(v) = value.filter(|v| !is_placeholder(v)) {
            fields.insert(key.to_string(), v.clone());
        }
    };

    put("product_name", Some(&parent.product_name));
    put("brand", Some(&parent.brand));
    put("store", Some(&parent.store));
    put("model_sku_asin", parent.shared.model_sku_asin.as_ref());
    put("specifications", parent.shared.specifications.as_ref());
    put("warranty_period", parent.shared.warranty_period.as_ref());
    put("hsn_code", parent.shared.hsn_code.as_ref());

    match &parent.details {
        DocumentDetails::Invoice(inv) => {
            put("purchase_date", inv.purchase_date.as_ref());
            put("invoice_date", inv.invoice_date.as_ref());
            put("price_paid", inv.price_paid.as_ref());
            put("order_number", inv.order_number.as_ref());
            put("invoice_number", inv.invoice_number.as_ref());
        }
        DocumentDetails::Warranty(w) => {
            put("order_date", w.order_date.as_ref());
            put("order_number", w.order_number.as_ref());
            put("invoice_number", w.invoice_number.as_ref());
            put("seller_name", w.seller_name.as_ref());
        }
    }
    fields
}

/// First non-placeholder value among `keys`, or `NOT_SPECIFIED`.
fn display(fields: &FieldMap, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|k| fields.get(*k))
        .find(|v| !is_placeholder(v))
        .cloned()
        .unwrap_or_else(|| NOT_SPECIFIED.to_string())
}

fn field(fields: &FieldMap, keys: &[&str]) -> Option<String> {
    Some(display(fields, keys))
}

fn shared_fields(fields: &FieldMap) -> SharedFields {
    SharedFields {
        model_sku_asin: field(fields, &["model_sku_asin", "product_code"]),
        specifications: field(fields, &["specifications"]),
        warranty_period: field(fields, &["warranty_period"]),
        next_service_date: field(fields, &["next_service_date"]),
        hsn_code: field(fields, &["hsn_code"]),
    }
}

pub fn warranty_record(
    id: String,
    fields: &FieldMap,
    file: FilePayload,
    extracted_at: DateTime<Utc>,
) -> DocumentRecord {
    DocumentRecord {
        id,
        product_name: display(fields, &["product_name"]),
        brand: display(fields, &["brand"]),
        store: display(fields, &["store"]),
        details: DocumentDetails::Warranty(WarrantyFields {
            order_date: field(fields, &["order_date", "purchase_date"]),
            document_date: field(
                fields,
                &["document_date", "packing_slip_date", "invoice_date", "order_date"],
            ),
            seller_name: field(fields, &["seller_name"]),
            seller_address: field(fields, &["seller_address"]),
            quantity: field(fields, &["quantity"]),
            product_code: field(fields, &["product_code", "model_sku_asin"]),
            warranty_terms: field(fields, &["warranty_terms"]),
            order_number: field(fields, &["order_number"]),
            invoice_number: field(fields, &["invoice_number"]),
        }),
        shared: shared_fields(fields),
        extracted_at,
        file: Some(file),
    }
}

pub fn invoice_record(
    id: String,
    fields: &FieldMap,
    file: FilePayload,
    extracted_at: DateTime<Utc>,
) -> DocumentRecord {
    DocumentRecord {
        id,
        product_name: display(fields, &["product_name"]),
        brand: display(fields, &["brand"]),
        store: display(fields, &["store"]),
        details: DocumentDetails::Invoice(InvoiceFields {
            purchase_date: field(fields, &["purchase_date", "order_date", "invoice_date"]),
            invoice_date: field(fields, &["invoice_date"]),
            price_paid: field(fields, &["price_paid", "price", "total_amount"]),
            net_amount: field(fields, &["net_amount"]),
            tax_amount: field(fields, &["tax_amount"]),
            order_number: field(fields, &["order_number"]),
            invoice_number: field(fields, &["invoice_number"]),
        }),
        shared: shared_fields(fields),
        extracted_at,
        file: Some(file),
    }
}
