//! `OpenAI`-compatible chat-completions client
//!
//! Any backend exposing `POST {base}/chat/completions` with bearer auth
//! works. Rate-limited requests are retried here with exponential backoff;
//! every other failure is returned to the caller on the first attempt.

use super::types::{LlmRequest, LlmResponse, MessageRole, Usage};
use super::{GenerationError, LlmConfig};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct OpenAIService {
    client: Client,
    api_key: Option<String>,
    url: String,
    model: String,
    backoff: Duration,
}

impl OpenAIService {
    pub fn new(config: &LlmConfig) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GenerationError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            url: format!("{}/chat/completions", config.api_url.trim_end_matches('/')),
            model: config.model.clone(),
            backoff: DEFAULT_BACKOFF,
        })
    }

    /// Base delay before the first retry; doubles on each further attempt
    #[cfg(test)]
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn model_id(&self) -> &str {
        &self.model
    }

    fn translate_request(&self, request: &LlmRequest) -> OpenAIRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);

        if !request.system.is_empty() {
            messages.push(OpenAIMessage {
                role: MessageRole::System,
                content: request.system.clone(),
            });
        }

        messages.extend(request.messages.iter().map(|m| OpenAIMessage {
            role: m.role,
            content: m.text.clone(),
        }));

        OpenAIRequest {
            model: self.model.clone(),
            messages,
            max_tokens: request.max_tokens,
        }
    }

    pub async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, GenerationError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| GenerationError::auth("LLM_API_KEY is not set"))?;
        let body = self.translate_request(request);

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.send_once(api_key, &body).await {
                Err(e) if e.kind.is_retryable() && attempt < MAX_ATTEMPTS => {
                    let delay = e
                        .retry_after
                        .unwrap_or_else(|| self.backoff_after(attempt));
                    tracing::warn!(
                        attempt,
                        delay_ms = %delay.as_millis(),
                        "Generation rate limited, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }

    /// Sleep after the given failed attempt: 1s, then 2s. The final attempt
    /// is not followed by a sleep.
    fn backoff_after(&self, attempt: u32) -> Duration {
        self.backoff * 2u32.pow(attempt.saturating_sub(1))
    }

    async fn send_once(
        &self,
        api_key: &str,
        body: &OpenAIRequest,
    ) -> Result<LlmResponse, GenerationError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::timeout(REQUEST_TIMEOUT)
                } else {
                    GenerationError::network(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs);
        let text = response
            .text()
            .await
            .map_err(|e| GenerationError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let err = GenerationError::from_status(status.as_u16(), &text);
            return Err(match retry_after {
                Some(after) => err.with_retry_after(after),
                None => err,
            });
        }

        parse_response(&text)
    }
}

fn parse_response(body: &str) -> Result<LlmResponse, GenerationError> {
    let resp: OpenAIResponse = serde_json::from_str(body)
        .map_err(|e| GenerationError::malformed(format!("Failed to parse response: {e}")))?;

    let text = resp
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| GenerationError::malformed("Response contained no reply text"))?;

    Ok(LlmResponse {
        text,
        usage: resp.usage.unwrap_or_default(),
    })
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: MessageRole,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}
