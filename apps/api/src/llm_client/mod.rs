//! Analysis service client: the single point of entry for all calls to the
//! external text-generation service.
//!
//! No other module talks to the provider directly. Everything goes through
//! the `AnalysisService` trait so the pipeline can be driven by a fake in tests.
//!
//! Policy: one attempt per call, bounded by the configured timeout. There are
//! no retries here; the verification pipeline falls back instead.
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;
pub mod response;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Request timed out after {}s. Please try again.", .0.as_secs())]
    Timeout(Duration),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Service error: {0}")]
    Service(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Could not decode service response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Service returned empty content")]
    EmptyContent,
}

/// Supported OpenAI-compatible providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Groq,
    OpenRouter,
}

impl Provider {
    pub fn default_base_url(self) -> &'static str {
        match self {
            Provider::Groq => "https://api.groq.com/openai/v1",
            Provider::OpenRouter => "https://openrouter.ai/api/v1",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Provider::Groq => "llama-3.3-70b-versatile",
            Provider::OpenRouter => "anthropic/claude-sonnet-4",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Groq => f.write_str("groq"),
            Provider::OpenRouter => f.write_str("openrouter"),
        }
    }
}

impl FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "groq" => Ok(Provider::Groq),
            "openrouter" => Ok(Provider::OpenRouter),
            other => anyhow::bail!("unsupported LLM provider '{other}' (expected groq or openrouter)"),
        }
    }
}

/// Connection settings for the analysis service, injected at construction.
#[derive(Clone)]
pub struct ServiceConfig {
    pub provider: Provider,
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl ServiceConfig {
    /// Provider defaults for base URL, model, and timeout.
    pub fn for_provider(provider: Provider, api_key: String) -> Self {
        Self {
            provider,
            api_key,
            base_url: provider.default_base_url().to_string(),
            model: provider.default_model().to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

// Keeps the API key out of logs.
impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Anything that can turn a prompt into raw generated text.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    async fn invoke(&self, prompt: &str, max_output_tokens: u32) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// HTTP client for an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    config: ServiceConfig,
}

impl LlmClient {
    pub fn new(config: ServiceConfig) -> Result<Self, LlmError> {
        // The wall-clock bound is enforced per call in `invoke`.
        let client = Client::builder().build()?;
        Ok(Self { client, config })
    }

    async fn send(&self, prompt: &str, max_output_tokens: u32) -> Result<String, LlmError> {
        let request_body = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: 0.0,
            max_tokens: max_output_tokens,
        };

        let mut request = self
            .client
            .post(self.config.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&request_body);

        // OpenRouter attributes traffic by referer and title.
        if self.config.provider == Provider::OpenRouter {
            request = request
                .header("HTTP-Referer", "http://localhost:8080")
                .header("X-Title", "TransferMap");
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            warn!("Analysis service returned {}: {}", status, message);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&body)?;

        if let Some(error) = parsed.error {
            warn!("Analysis service reported an error: {}", error.message);
            return Err(LlmError::Service(error.message));
        }

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(LlmError::EmptyContent)
    }
}

#[async_trait]
impl AnalysisService for LlmClient {
    async fn invoke(&self, prompt: &str, max_output_tokens: u32) -> Result<String, LlmError> {
        let started = Instant::now();

        // Dropping the in-flight future on timeout aborts the request.
        let outcome = tokio::time::timeout(self.config.timeout, self.send(prompt, max_output_tokens))
            .await
            .unwrap_or_else(|_| Err(LlmError::Timeout(self.config.timeout)));

        match &outcome {
            Ok(content) => debug!(
                provider = %self.config.provider,
                elapsed_ms = started.elapsed().as_millis() as u64,
                content_chars = content.chars().count(),
                "Analysis service call succeeded"
            ),
            Err(e) => warn!(
                provider = %self.config.provider,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Analysis service call failed: {e}"
            ),
        }

        outcome
    }
}
