mod config;
mod db;
mod documents;
mod errors;
mod extraction;
mod llm_client;
mod models;
mod recommend;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::documents::store::DocumentStore;
use crate::extraction::client::ExtractionClient;
use crate::llm_client::LlmClient;
use crate::recommend::RecommendationClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting dealscout v{}", env!("CARGO_PKG_VERSION"));

    // Local document store
    let pool = create_pool(&config.database_url).await?;
    let documents = DocumentStore::new(pool);
    info!("Document store holds {} documents", documents.count().await?);

    // Direct AI-provider client, used only as the recommendation fallback
    let llm = LlmClient::new(
        config.gemini_api_key.clone(),
        config.gemini_api_url.clone(),
        config.gemini_model.clone(),
    )?;
    info!("LLM fallback client initialized (model: {})", llm.model());

    // Backend clients share one connection pool; each call carries its own timeout
    let http = reqwest::Client::new();
    let recommender = RecommendationClient::new(
        http.clone(),
        config.backend_url.clone(),
        config.device,
        Arc::new(llm),
    );
    let extractor = ExtractionClient::new(http, config.backend_url.clone());
    info!("Backend clients initialized ({})", config.backend_url);

    let state = AppState {
        documents,
        recommender,
        extractor,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("127.0.0.1:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
