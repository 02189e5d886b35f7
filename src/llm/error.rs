//! Generation error types

use std::time::Duration;
use thiserror::Error;

/// Generation error with classification
#[derive(Debug, Clone, Error)]
#[error("{kind:?}: {message}")]
pub struct GenerationError {
    pub kind: GenerationErrorKind,
    pub message: String,
    pub retry_after: Option<Duration>,
}

impl GenerationError {
    pub fn new(kind: GenerationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn with_retry_after(mut self, duration: Duration) -> Self {
        self.retry_after = Some(duration);
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::Network, message)
    }

    pub fn timeout(after: Duration) -> Self {
        Self::new(
            GenerationErrorKind::Timeout,
            format!("no response after {}s", after.as_secs()),
        )
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::RateLimit, message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::ServerError, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::Auth, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::InvalidRequest, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::MalformedResponse, message)
    }

    /// Classify a non-success HTTP status
    pub fn from_status(status: u16, body: &str) -> Self {
        // Keep error bodies short in logs
        let snippet: String = body.chars().take(100).collect();
        let message = format!("HTTP {status}: {snippet}");
        match status {
            429 => Self::rate_limit(message),
            401 | 403 => Self::auth(message),
            400..=499 => Self::invalid_request(message),
            500..=599 => Self::server_error(message),
            _ => Self::network(message),
        }
    }
}

/// Error classification for retry logic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationErrorKind {
    /// Unreachable backend, connection reset
    Network,
    /// Backend did not answer in time
    Timeout,
    /// Rate limited (429) - retryable with backoff
    RateLimit,
    /// Server error (5xx)
    ServerError,
    /// Authentication failed (401, 403)
    Auth,
    /// Bad request (400)
    InvalidRequest,
    /// 2xx with a body we could not read a reply from
    MalformedResponse,
}

impl GenerationErrorKind {
    /// Only rate limiting is retried, and only by the HTTP client itself
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::RateLimit)
    }
}
