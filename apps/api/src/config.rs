use std::time::Duration;

use anyhow::{Context, Result};

use crate::llm_client::{Provider, ServiceConfig, DEFAULT_TIMEOUT};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub service: ServiceConfig,
    /// Session records go to PostgreSQL when set, otherwise stay in memory.
    pub database_url: Option<String>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let provider: Provider = optional_env("LLM_PROVIDER")
            .unwrap_or_else(|| "groq".to_string())
            .parse()
            .context("LLM_PROVIDER is invalid")?;

        let mut service = ServiceConfig::for_provider(provider, require_env("LLM_API_KEY")?);
        if let Some(base_url) = optional_env("LLM_BASE_URL") {
            service.base_url = base_url;
        }
        if let Some(model) = optional_env("LLM_MODEL") {
            service.model = model;
        }
        service.timeout = match optional_env("LLM_TIMEOUT_SECS") {
            Some(secs) => Duration::from_secs(
                secs.parse::<u64>()
                    .context("LLM_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
            None => DEFAULT_TIMEOUT,
        };

        Ok(Config {
            service,
            database_url: optional_env("DATABASE_URL"),
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

/// Unset and blank are treated the same.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
