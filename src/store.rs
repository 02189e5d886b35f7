//! In-memory conversation state store
//!
//! One record per conversation id, created lazily on first contact and kept
//! for the life of the process. Each record sits behind its own mutex, so
//! work on one conversation is serialized while different conversations
//! proceed in parallel. Nothing survives a restart.

use crate::history::{History, Role, Turn};
use crate::state_machine::{ConvState, Mode};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// Everything kept about one conversation
#[derive(Debug, Clone)]
pub struct Conversation {
    pub state: ConvState,
    pub history: History,
    /// Diagnostics only; transitions never look at it
    pub last_activity: DateTime<Utc>,
    pub total_messages: u64,
}

impl Conversation {
    fn new(history_capacity: usize) -> Self {
        Self {
            state: ConvState::default(),
            history: History::with_capacity(history_capacity),
            last_activity: Utc::now(),
            total_messages: 0,
        }
    }

    /// Mark that a message was handled
    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
        self.total_messages = self.total_messages.saturating_add(1);
    }

    pub fn summary(&self, conversation_id: &str) -> ConversationSummary {
        ConversationSummary {
            conversation_id: conversation_id.to_string(),
            mode: self.state.mode,
            message_count: self.state.message_count,
            day_turns: self.state.day_turns,
            history_len: self.history.len(),
            history_capacity: self.history.capacity(),
            total_messages: self.total_messages,
            last_activity: self.last_activity,
        }
    }
}

/// Diagnostics view of a conversation
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    pub conversation_id: String,
    pub mode: Mode,
    pub message_count: u32,
    pub day_turns: u32,
    pub history_len: usize,
    pub history_capacity: usize,
    pub total_messages: u64,
    pub last_activity: DateTime<Utc>,
}

type Slot = Arc<Mutex<Conversation>>;

/// Keyed store with one lock per conversation
pub struct ConversationStore {
    slots: RwLock<HashMap<String, Slot>>,
    history_capacity: usize,
}

impl ConversationStore {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            history_capacity,
        }
    }

    async fn slot(&self, conversation_id: &str) -> Slot {
        {
            let slots = self.slots.read().await;
            if let Some(slot) = slots.get(conversation_id) {
                return Arc::clone(slot);
            }
        }

        // Re-check under the write lock: another task may have created it
        let mut slots = self.slots.write().await;
        Arc::clone(
            slots
                .entry(conversation_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(Conversation::new(self.history_capacity)))),
        )
    }

    /// Exclusive access to a conversation, creating it on first contact.
    ///
    /// Holding the guard serializes every other access to the same id.
    pub async fn lock(&self, conversation_id: &str) -> OwnedMutexGuard<Conversation> {
        self.slot(conversation_id).await.lock_owned().await
    }

    /// Diagnostics snapshot without creating the conversation
    pub async fn summary(&self, conversation_id: &str) -> Option<ConversationSummary> {
        let slot = self.slots.read().await.get(conversation_id).cloned()?;
        let conversation = slot.lock().await;
        Some(conversation.summary(conversation_id))
    }
}

// Field-level helpers; the runtime itself works through `lock`
#[allow(dead_code)]
impl ConversationStore {
    /// Current state, creating the conversation if it does not exist yet
    pub async fn get_or_create(&self, conversation_id: &str) -> ConvState {
        self.lock(conversation_id).await.state
    }

    /// Apply a change atomically with respect to the same conversation
    pub async fn update<R>(
        &self,
        conversation_id: &str,
        patch: impl FnOnce(&mut Conversation) -> R,
    ) -> R {
        let mut conversation = self.lock(conversation_id).await;
        patch(&mut conversation)
    }

    pub async fn append_turn(&self, conversation_id: &str, role: Role, text: impl Into<String>) {
        let text = text.into();
        self.update(conversation_id, |c| c.history.append_turn(role, text))
            .await;
    }

    pub async fn history(&self, conversation_id: &str) -> Vec<Turn> {
        self.lock(conversation_id).await.history.snapshot()
    }

    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }
}
