use anyhow::{bail, Context, Result};

use crate::recommend::Device;

const DEFAULT_GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_DATABASE_URL: &str = "sqlite://dealscout.db?mode=rwc";

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the recommendation / extraction backend.
    pub backend_url: String,
    pub gemini_api_key: String,
    pub gemini_api_url: String,
    pub gemini_model: String,
    pub device: Device,
    pub database_url: String,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            backend_url: trim_base_url(&require_env("BACKEND_URL")?),
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            gemini_api_url: trim_base_url(
                &std::env::var("GEMINI_API_URL")
                    .unwrap_or_else(|_| DEFAULT_GEMINI_API_URL.to_string()),
            ),
            gemini_model: std::env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string()),
            device: parse_device(
                &std::env::var("DEVICE_PLATFORM").unwrap_or_else(|_| "android".to_string()),
            )?,
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn trim_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn parse_device(value: &str) -> Result<Device> {
    match value.trim().to_ascii_lowercase().as_str() {
        "android" => Ok(Device::Android),
        "ios" => Ok(Device::Ios),
        other => bail!("DEVICE_PLATFORM must be 'android' or 'ios', got '{other}'"),
    }
}
