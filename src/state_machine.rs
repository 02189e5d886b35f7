//! Persona state machine
//!
//! Pure transitions over message counts: the runtime feeds events in and
//! executes the effects that come back.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;


pub use effect::{Effect, Tone, Utterance};
pub use event::{Event, ExternalSignal, Signals};
pub use state::{ConvContext, ConvState, Mode, Thresholds};
pub use transition::{transition, TransitionResult};
