//! Telegram Bot API plumbing
//!
//! Only what the persona needs: the inbound webhook `Update` shape and
//! `sendMessage` for delivery.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const API_BASE: &str = "https://api.telegram.org";
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("messaging gateway not configured: {0}")]
    NotConfigured(String),
    #[error("messaging gateway unreachable: {0}")]
    Unreachable(String),
    #[error("messaging gateway rejected message: HTTP {status}: {description}")]
    Rejected { status: u16, description: String },
}

/// Incoming webhook payload (fields we don't use are ignored)
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

impl Update {
    /// `(chat id, text)` for plain text messages
    pub fn text_message(&self) -> Option<(String, &str)> {
        let message = self.message.as_ref()?;
        let text = message.text.as_deref()?;
        Some((message.chat.id.to_string(), text))
    }
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Delivers text through `sendMessage`
pub struct TelegramClient {
    client: reqwest::Client,
    base_url: String,
}

impl TelegramClient {
    pub fn new(token: &str) -> Result<Self, DeliveryError> {
        Self::with_base_url(token, API_BASE)
    }

    pub fn with_base_url(token: &str, base_url: &str) -> Result<Self, DeliveryError> {
        if token.is_empty() {
            return Err(DeliveryError::NotConfigured("BOT_TOKEN is empty".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .map_err(|e| DeliveryError::NotConfigured(e.to_string()))?;
        Ok(Self {
            client,
            base_url: format!("{}/bot{token}", base_url.trim_end_matches('/')),
        })
    }

    pub async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(format!("{}/sendMessage", self.base_url))
            .json(&SendMessage { chat_id, text })
            .send()
            .await
            .map_err(|e| DeliveryError::Unreachable(e.without_url().to_string()))?;

        let status = response.status();
        let body: ApiResponse = response
            .json()
            .await
            .map_err(|e| DeliveryError::Unreachable(format!("unreadable response: {e}")))?;

        if status.is_success() && body.ok {
            Ok(())
        } else {
            Err(DeliveryError::Rejected {
                status: status.as_u16(),
                description: body.description.unwrap_or_default(),
            })
        }
    }
}
