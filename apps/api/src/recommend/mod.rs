// Recommendation path: primary backend call with a direct AI-provider fallback.
// The provider is reached only through llm_client.

pub mod client;
pub mod fallback;
pub mod handlers;
pub mod share;

use serde::{Deserialize, Serialize};

pub use client::{RecommendError, RecommendationClient};

/// Platform reported to the backend with every recommendation request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Device {
    Android,
    Ios,
}
