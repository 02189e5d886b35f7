//! API request and response types

use crate::state_machine::{ExternalSignal, Mode};
use serde::{Deserialize, Serialize};

/// Request to apply an operator signal
#[derive(Debug, Deserialize)]
pub struct SignalRequest {
    pub signal: ExternalSignal,
}

/// Result of an operator signal
#[derive(Debug, Serialize)]
pub struct SignalResponse {
    pub mode: Mode,
    pub message_count: u32,
    /// Line the persona said in response, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
}

/// Generic success response
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
