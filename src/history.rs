//! Bounded per-conversation turn log used as generation context
//!
//! Turns are kept in insertion order. Once the log holds `capacity` turns,
//! appending evicts the oldest one.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;

/// Default number of turns kept per conversation
pub const DEFAULT_CAPACITY: usize = 40;

/// Who said a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Persona,
}

/// One exchanged unit of text. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    pub at: DateTime<Utc>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn persona(text: impl Into<String>) -> Self {
        Self::new(Role::Persona, text)
    }

    fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct History {
    turns: VecDeque<Turn>,
    capacity: usize,
}

impl History {
    /// A capacity of zero is raised to one so the latest turn is always kept
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            turns: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn append(&mut self, turn: Turn) {
        if self.turns.len() == self.capacity {
            self.turns.pop_front();
        }
        self.turns.push_back(turn);
    }

    pub fn append_turn(&mut self, role: Role, text: impl Into<String>) {
        self.append(Turn::new(role, text));
    }

    /// Ordered copy of the retained turns, oldest first
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[allow(dead_code)] // Pairs with len
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for History {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}
