//! Text generation backend
//!
//! Provides a common interface over the persona's generation provider.

mod error;
mod openai;
mod types;

#[allow(unused_imports)] // Public API re-exports
pub use error::{GenerationError, GenerationErrorKind};
pub use openai::OpenAIService;
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

const DEFAULT_API_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_MAX_TOKENS: u32 = 500;

/// Configuration for the generation provider
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: Option<u32>,
}

impl LlmConfig {
    pub fn from_env() -> Self {
        Self {
            api_url: std::env::var("LLM_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            api_key: std::env::var("LLM_API_KEY").ok().filter(|k| !k.is_empty()),
            model: std::env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            max_tokens: Some(DEFAULT_MAX_TOKENS),
        }
    }
}

/// Common interface for generation providers
#[async_trait]
pub trait LlmService: Send + Sync {
    /// Make a completion request
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, GenerationError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

#[async_trait]
impl LlmService for OpenAIService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, GenerationError> {
        OpenAIService::complete(self, request).await
    }

    fn model_id(&self) -> &str {
        OpenAIService::model_id(self)
    }
}

/// Logging wrapper for generation services
pub struct LoggingService {
    inner: Arc<dyn LlmService>,
    model_id: String,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn LlmService>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl LlmService for LoggingService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, GenerationError> {
        let start = std::time::Instant::now();
        let result = self.inner.complete(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(response) => {
                tracing::info!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    turns = request.messages.len(),
                    input_tokens = response.usage.input_tokens,
                    output_tokens = response.usage.output_tokens,
                    "Generation completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    kind = ?e.kind,
                    error = %e.message,
                    "Generation failed"
                );
            }
        }

        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
