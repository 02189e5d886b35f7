//! Persona bot - a chat persona with moods
//!
//! A Rust service driving a per-conversation state machine (awake, drowsy,
//! napping, sleeping, waking up, pouting) behind a Telegram webhook, with
//! replies generated by an OpenAI-compatible backend.

mod api;
mod classify;
mod config;
mod history;
mod llm;
mod runtime;
mod state_machine;
mod store;
mod system_prompt;
mod telegram;

use api::{create_router, AppState};
use config::{PersonaConfig, ServerConfig};
use llm::{LlmConfig, LoggingService, OpenAIService};
use runtime::{LlmGenerator, ProductionRuntime, TelegramMessenger};
use std::net::SocketAddr;
use std::sync::Arc;
use telegram::TelegramClient;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "persona_bot=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let server_config = ServerConfig::from_env();
    let persona_config = PersonaConfig::from_env();
    let llm_config = LlmConfig::from_env();

    if llm_config.api_key.is_none() {
        tracing::warn!("LLM_API_KEY is not set; generated replies will fall back");
    }

    // Generation backend
    let service = OpenAIService::new(&llm_config)?;
    tracing::info!(model = %service.model_id(), url = %llm_config.api_url, "Generation backend configured");
    let service = Arc::new(LoggingService::new(Arc::new(service)));
    let generator = LlmGenerator::new(service, llm_config.max_tokens);

    // Delivery
    let client = match &server_config.bot_token {
        Some(token) => Some(TelegramClient::new(token)?),
        None => {
            tracing::warn!("BOT_TOKEN is not set; replies will not be delivered");
            None
        }
    };
    let messenger = TelegramMessenger::new(client);

    tracing::info!(
        persona = %persona_config.name,
        thresholds = ?persona_config.thresholds,
        history_capacity = persona_config.history_capacity,
        "Persona configured"
    );
    let runtime = ProductionRuntime::new(&persona_config, generator, messenger);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(AppState::new(runtime))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], server_config.port));
    tracing::info!("Persona bot listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
