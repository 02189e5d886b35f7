//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the orchestrator with mock implementations.

use crate::history::Turn;
use crate::llm::{GenerationError, LlmRequest, LlmService};
use crate::telegram::{DeliveryError, TelegramClient};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};

/// Turns persona instruction plus history into persona-voiced text
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, history: &[Turn], instruction: &str)
        -> Result<String, GenerationError>;
}

/// Delivers text to a conversation
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn deliver(&self, conversation_id: &str, text: &str) -> Result<(), DeliveryError>;
}

/// Source of the probabilistic greeting trigger
pub trait Dice: Send + Sync {
    /// `true` with the given probability
    fn roll(&self, probability: f64) -> bool;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: Generator + ?Sized> Generator for Arc<T> {
    async fn generate(
        &self,
        history: &[Turn],
        instruction: &str,
    ) -> Result<String, GenerationError> {
        (**self).generate(history, instruction).await
    }
}

#[async_trait]
impl<T: Messenger + ?Sized> Messenger for Arc<T> {
    async fn deliver(&self, conversation_id: &str, text: &str) -> Result<(), DeliveryError> {
        (**self).deliver(conversation_id, text).await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Adapter to use an `LlmService` as Generator
pub struct LlmGenerator {
    service: Arc<dyn LlmService>,
    max_tokens: Option<u32>,
}

impl LlmGenerator {
    pub fn new(service: Arc<dyn LlmService>, max_tokens: Option<u32>) -> Self {
        Self {
            service,
            max_tokens,
        }
    }
}

#[async_trait]
impl Generator for LlmGenerator {
    async fn generate(
        &self,
        history: &[Turn],
        instruction: &str,
    ) -> Result<String, GenerationError> {
        let request = LlmRequest::from_history(instruction, history, self.max_tokens);
        Ok(self.service.complete(&request).await?.text)
    }
}

/// Adapter to use the Telegram client as Messenger.
///
/// Without a bot token every delivery fails with `NotConfigured`, which the
/// runtime logs; the state machine keeps running either way.
pub struct TelegramMessenger {
    client: Option<TelegramClient>,
}

impl TelegramMessenger {
    pub fn new(client: Option<TelegramClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn deliver(&self, conversation_id: &str, text: &str) -> Result<(), DeliveryError> {
        match &self.client {
            Some(client) => client.send_message(conversation_id, text).await,
            None => Err(DeliveryError::NotConfigured(
                "BOT_TOKEN is not set".to_string(),
            )),
        }
    }
}

/// Random dice; seedable for reproducible runs
pub struct SeededDice {
    rng: Mutex<StdRng>,
}

impl SeededDice {
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Dice for SeededDice {
    fn roll(&self, probability: f64) -> bool {
        let probability = probability.clamp(0.0, 1.0);
        // A poisoned lock only means another roll panicked; the RNG is still usable
        let mut rng = self
            .rng
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        rng.gen_bool(probability)
    }
}
