//! Runtime for persona conversations
//!
//! Wires the pure state machine to the store, the generator and the
//! messenger. All collaborator I/O goes through the traits in `traits`.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

#[allow(unused_imports)] // Public API re-exports
pub use executor::{Handled, PersonaRuntime, Reply, ReplySource, FALLBACK_LINE};
pub use traits::*;

/// Type alias for production runtime with concrete implementations
pub type ProductionRuntime = PersonaRuntime<LlmGenerator, TelegramMessenger>;
