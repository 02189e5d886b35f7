//! HTTP request handlers

use super::types::{ErrorResponse, SignalRequest, SignalResponse, SuccessResponse};
use super::AppState;
use crate::runtime::{Generator, Messenger};
use crate::store::ConversationSummary;
use crate::telegram::Update;
use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

/// Create the API router
pub fn create_router<G, M>(state: AppState<G, M>) -> Router
where
    G: Generator + 'static,
    M: Messenger + 'static,
{
    Router::new()
        .route("/", get(index))
        // Telegram webhook
        .route("/webhook", post(webhook::<G, M>))
        // Operator surface
        .route("/api/conversations/:id", get(get_conversation::<G, M>))
        .route("/api/conversations/:id/signal", post(send_signal::<G, M>))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

async fn index() -> &'static str {
    "persona bot is running"
}

// ============================================================
// Webhook
// ============================================================

/// Acknowledges immediately and handles the message on its own task.
///
/// Telegram retries anything that is not a 2xx, so malformed or
/// uninteresting updates are still answered with success.
async fn webhook<G, M>(State(state): State<AppState<G, M>>, body: Bytes) -> Json<SuccessResponse>
where
    G: Generator + 'static,
    M: Messenger + 'static,
{
    match serde_json::from_slice::<Update>(&body) {
        Ok(update) => {
            if let Some((chat_id, text)) = update.text_message() {
                tracing::info!(update_id = update.update_id, conv_id = %chat_id, "Inbound message");
                let text = text.to_string();
                let runtime = Arc::clone(&state.runtime);
                tokio::spawn(async move {
                    runtime.handle_inbound_message(&chat_id, &text).await;
                });
            } else {
                tracing::debug!(update_id = update.update_id, "Ignoring non-text update");
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Malformed webhook payload");
        }
    }

    Json(SuccessResponse { success: true })
}

// ============================================================
// Operator surface
// ============================================================

async fn get_conversation<G, M>(
    State(state): State<AppState<G, M>>,
    Path(id): Path<String>,
) -> Result<Json<ConversationSummary>, AppError>
where
    G: Generator + 'static,
    M: Messenger + 'static,
{
    state
        .runtime
        .inspect(&id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Conversation not found: {id}")))
}

async fn send_signal<G, M>(
    State(state): State<AppState<G, M>>,
    Path(id): Path<String>,
    body: Result<Json<SignalRequest>, JsonRejection>,
) -> Result<Json<SignalResponse>, AppError>
where
    G: Generator + 'static,
    M: Messenger + 'static,
{
    let Json(req) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let handled = state.runtime.signal(&id, req.signal).await;

    Ok(Json(SignalResponse {
        mode: handled.state.mode,
        message_count: handled.state.message_count,
        reply: handled.reply.map(|r| r.text),
    }))
}

async fn get_version() -> &'static str {
    concat!("persona-bot ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

enum AppError {
    BadRequest(String),
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
