use axum::{extract::State, Json};
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::recommendation::RecommendationResult;
use crate::recommend::client::BackendHealth;
use crate::recommend::share::resolve_product_url;
use crate::recommend::RecommendError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RecommendBody {
    pub url: Option<String>,
    pub share_text: Option<String>,
    #[serde(default)]
    pub refresh: bool,
}

impl RecommendBody {
    fn product_url(&self) -> Result<String, RecommendError> {
        resolve_product_url(self.url.as_deref(), self.share_text.as_deref())
            .ok_or(RecommendError::MissingUrl)
    }
}

/// POST /api/v1/recommendations
pub async fn handle_recommend(
    State(state): State<AppState>,
    Json(req): Json<RecommendBody>,
) -> Result<Json<RecommendationResult>, AppError> {
    let url = req.product_url()?;
    let result = state
        .recommender
        .fetch(&url, req.refresh, req.share_text.as_deref())
        .await?;
    Ok(Json(result))
}

/// POST /api/v1/recommendations/refresh
pub async fn handle_refresh(
    State(state): State<AppState>,
    Json(req): Json<RecommendBody>,
) -> Result<Json<RecommendationResult>, AppError> {
    let url = req.product_url()?;
    let result = state
        .recommender
        .refresh(&url, req.share_text.as_deref())
        .await?;
    Ok(Json(result))
}

/// GET /api/v1/backend/health
pub async fn handle_backend_health(State(state): State<AppState>) -> Json<BackendHealth> {
    Json(state.recommender.health().await)
}
