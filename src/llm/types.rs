//! Common types for generation requests

use crate::history::{Role, Turn};
use serde::{Deserialize, Serialize};

/// Generation request: persona instruction plus conversation turns
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub system: String,
    pub messages: Vec<LlmMessage>,
    pub max_tokens: Option<u32>,
}

impl LlmRequest {
    pub fn from_history(instruction: &str, history: &[Turn], max_tokens: Option<u32>) -> Self {
        Self {
            system: instruction.to_string(),
            messages: history.iter().map(LlmMessage::from).collect(),
            max_tokens,
        }
    }
}

/// Message in conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmMessage {
    pub role: MessageRole,
    pub text: String,
}

impl From<&Turn> for LlmMessage {
    fn from(turn: &Turn) -> Self {
        Self {
            role: match turn.role {
                Role::User => MessageRole::User,
                Role::Persona => MessageRole::Assistant,
            },
            text: turn.text.clone(),
        }
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// Generation response
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub text: String,
    pub usage: Usage,
}

/// Usage statistics
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Usage {
    #[serde(default, rename = "prompt_tokens")]
    pub input_tokens: u64,
    #[serde(default, rename = "completion_tokens")]
    pub output_tokens: u64,
}
