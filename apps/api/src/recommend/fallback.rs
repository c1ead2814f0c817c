use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use crate::llm_client::prompts::{ALTERNATIVES_PROMPT, JSON_ONLY_SYSTEM};
use crate::llm_client::{LlmClient, LlmError};
use crate::models::recommendation::RecommendationResult;
use crate::recommend::client::FallbackRecommender;
use crate::recommend::share::{detect_source, Source};

pub const FALLBACK_WARNING: &str = "Recommendations generated directly by the AI provider; \
    prices and links are estimates";

/// Direct provider fallback. Asks the model for alternatives in the backend's
/// response schema and fills the envelope fields locally.
#[async_trait]
impl FallbackRecommender for LlmClient {
    async fn recommend(&self, url: &str) -> Result<RecommendationResult, LlmError> {
        let source = detect_source(url);
        let site = match source {
            Source::Unknown => "Amazon or Flipkart",
            Source::Amazon => "Amazon",
            Source::Flipkart => "Flipkart",
        };
        let prompt = ALTERNATIVES_PROMPT
            .replace("{url}", url)
            .replace("{site}", site);

        info!("Requesting fallback alternatives from {}", self.model());
        let mut result: RecommendationResult = self.call_json(&prompt, JSON_ONLY_SYSTEM).await?;
        stamp_fallback_envelope(&mut result, url);
        Ok(result)
    }
}

fn stamp_fallback_envelope(result: &mut RecommendationResult, url: &str) {
    result.set("source", detect_source(url).as_str());
    result.set("canonical_url", url);
    result.set("query_time_iso", Utc::now().to_rfc3339());

    let mut meta = result.meta();
    meta.validation.llm_valid_json = true;
    meta.validation.image_urls_checked = false;
    meta.warnings.push(FALLBACK_WARNING.to_string());
    result.set_meta(&meta);
}
