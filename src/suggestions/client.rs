//! Chat-completion client for AI story critique
//!
//! Requires the `ai` feature to be enabled for real network calls:
//! ```toml
//! invest = { version = "0.3", features = ["ai"] }
//! ```

use crate::config::AiConfig;
use thiserror::Error;

/// Placeholder value shipped in sample env files; treated as "no key"
pub const PLACEHOLDER_API_KEY: &str = "your_openai_api_key_here";

/// A prompted chat completion
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Error from the chat backend
#[derive(Debug, Error)]
pub enum AiError {
    #[error("{0} environment variable not set")]
    MissingApiKey(String),
    #[error("AI feature not enabled. Rebuild with: cargo build --features ai")]
    Disabled,
    #[error("Request failed: {0}")]
    RequestFailed(String),
    #[error("Rate limited - try again later")]
    RateLimited,
    #[error("API error: {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Something that can answer a chat prompt with text
pub trait ChatBackend: Send + Sync {
    fn complete(&self, request: &ChatRequest) -> Result<String, AiError>;
}

/// OpenAI-compatible chat completions client
pub struct OpenAiClient {
    api_key: Option<String>,
    api_key_env: String,
    model: String,
    #[cfg_attr(not(feature = "ai"), allow(dead_code))]
    endpoint: String,
    #[cfg_attr(not(feature = "ai"), allow(dead_code))]
    timeout_secs: u64,
}

impl OpenAiClient {
    /// Build a client from config, reading the key from the configured env var.
    ///
    /// A missing key is not an error here: requests fail later with
    /// [`AiError::MissingApiKey`] so the caller can fall back to text.
    pub fn from_config(config: &AiConfig) -> Self {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty() && k != PLACEHOLDER_API_KEY);
        Self {
            api_key,
            api_key_env: config.api_key_env.clone(),
            model: config.model.clone(),
            endpoint: config.endpoint.clone(),
            timeout_secs: config.timeout_secs,
        }
    }

    /// Create a client with a specific API key
    pub fn with_key(api_key: String, config: &AiConfig) -> Self {
        Self {
            api_key: Some(api_key),
            ..Self::from_config(config)
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn api_key(&self) -> Result<&str, AiError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| AiError::MissingApiKey(self.api_key_env.clone()))
    }

    #[cfg(feature = "ai")]
    fn send(&self, request: &ChatRequest) -> Result<String, AiError> {
        use serde_json::json;

        let key = self.api_key()?;
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(|e| AiError::RequestFailed(e.to_string()))?;

        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.user }
            ],
            "max_tokens": request.max_tokens,
            "temperature": request.temperature
        });

        let response = client
            .post(&self.endpoint)
            .bearer_auth(key)
            .json(&body)
            .send()
            .map_err(|e| AiError::RequestFailed(e.to_string()))?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AiError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(AiError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let json: serde_json::Value = response
            .json()
            .map_err(|e| AiError::InvalidResponse(e.to_string()))?;

        json["choices"]
            .as_array()
            .and_then(|arr| arr.first())
            .and_then(|choice| choice["message"]["content"].as_str())
            .map(|text| text.trim().to_string())
            .ok_or_else(|| AiError::InvalidResponse("No content in response".to_string()))
    }

    /// Stub implementation when ai feature is disabled
    #[cfg(not(feature = "ai"))]
    fn send(&self, _request: &ChatRequest) -> Result<String, AiError> {
        self.api_key()?;
        Err(AiError::Disabled)
    }
}

impl ChatBackend for OpenAiClient {
    fn complete(&self, request: &ChatRequest) -> Result<String, AiError> {
        tracing::debug!(model = %self.model, max_tokens = request.max_tokens, "sending chat completion");
        let result = self.send(request);
        if let Err(ref e) = result {
            tracing::warn!(error = %e, "chat completion failed");
        }
        result
    }
}

/// Check if the AI feature is available
pub fn is_ai_available() -> bool {
    cfg!(feature = "ai")
}
