//! HTTP API for the persona bot
//!
//! Telegram webhook intake plus a small operator surface for inspecting
//! conversations and sending external signals.

mod handlers;
mod types;

pub use handlers::create_router;

use crate::runtime::{Generator, Messenger, PersonaRuntime};
use std::sync::Arc;

/// Application state shared across handlers
pub struct AppState<G, M>
where
    G: Generator + 'static,
    M: Messenger + 'static,
{
    pub runtime: Arc<PersonaRuntime<G, M>>,
}

impl<G, M> AppState<G, M>
where
    G: Generator + 'static,
    M: Messenger + 'static,
{
    pub fn new(runtime: PersonaRuntime<G, M>) -> Self {
        Self {
            runtime: Arc::new(runtime),
        }
    }
}

// Manual impl: cloning shares the runtime and needs no `Clone` on G or M
impl<G, M> Clone for AppState<G, M>
where
    G: Generator + 'static,
    M: Messenger + 'static,
{
    fn clone(&self) -> Self {
        Self {
            runtime: Arc::clone(&self.runtime),
        }
    }
}
