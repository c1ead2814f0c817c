use serde::Serialize;

/// Store a product URL points at.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Amazon,
    Flipkart,
    Unknown,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Amazon => "amazon",
            Source::Flipkart => "flipkart",
            Source::Unknown => "unknown",
        }
    }
}

pub fn detect_source(url: &str) -> Source {
    let url = url.to_ascii_lowercase();
    if url.contains("amazon") || url.contains("amzn") {
        Source::Amazon
    } else if url.contains("flipkart") {
        Source::Flipkart
    } else {
        Source::Unknown
    }
}

/// Pulls the first http(s) URL out of share-sheet text such as
/// "Check out this product on Amazon https://amzn.in/d/abc123".
pub fn extract_url(text: &str) -> Option<String> {
    let start = text.find("https://").or_else(|| text.find("http://"))?;
    let candidate: String = text[start..]
        .chars()
        .take_while(|c| !c.is_whitespace())
        .collect();
    let trimmed = candidate.trim_end_matches(|c: char| matches!(c, '.' | ',' | ')' | ']' | '"' | '\''));
    if trimmed.len() <= "https://".len() {
        return None;
    }
    Some(trimmed.to_string())
}

/// The URL to ask about: an explicit URL wins, otherwise the first URL found
/// in the shared text.
pub fn resolve_product_url(url: Option<&str>, share_text: Option<&str>) -> Option<String> {
    url.map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string)
        .or_else(|| share_text.and_then(extract_url))
}
