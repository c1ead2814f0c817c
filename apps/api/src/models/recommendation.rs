use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ValidationMeta {
    #[serde(default)]
    pub llm_valid_json: bool,
    #[serde(default)]
    pub image_urls_checked: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResponseMeta {
    #[serde(default)]
    pub validation: ValidationMeta,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Alternatives and price comparisons for one product URL, kept as the JSON
/// the producer sent.
///
/// The only shape requirement is a top-level `alternatives` array. Element
/// contents are not interpreted, so a backend answer is served back exactly
/// as received.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "Value", into = "Value")]
pub struct RecommendationResult(Map<String, Value>);

impl TryFrom<Value> for RecommendationResult {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Value::Object(body) = value else {
            return Err("expected a JSON object".to_string());
        };
        match body.get("alternatives") {
            Some(Value::Array(_)) => Ok(Self(body)),
            Some(_) => Err("'alternatives' is not an array".to_string()),
            None => Err("missing 'alternatives' array".to_string()),
        }
    }
}

impl From<RecommendationResult> for Value {
    fn from(result: RecommendationResult) -> Self {
        Value::Object(result.0)
    }
}

impl RecommendationResult {
    pub fn alternatives(&self) -> &[Value] {
        self.0
            .get("alternatives")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn set(&mut self, field: &str, value: impl Into<Value>) {
        self.0.insert(field.to_string(), value.into());
    }

    /// The `meta` block, or an empty one when absent or unreadable.
    pub fn meta(&self) -> ResponseMeta {
        self.0
            .get("meta")
            .cloned()
            .and_then(|meta| serde_json::from_value(meta).ok())
            .unwrap_or_default()
    }

    pub fn set_meta(&mut self, meta: &ResponseMeta) {
        if let Ok(meta) = serde_json::to_value(meta) {
            self.0.insert("meta".to_string(), meta);
        }
    }
}
