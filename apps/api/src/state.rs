use crate::config::Config;
use crate::documents::store::DocumentStore;
use crate::extraction::client::ExtractionClient;
use crate::recommend::RecommendationClient;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub documents: DocumentStore,
    /// Primary backend with the Gemini fallback behind it.
    pub recommender: RecommendationClient,
    pub extractor: ExtractionClient,
    pub config: Config,
}
