//! Events that can occur in a conversation

use serde::{Deserialize, Serialize};

/// What the classifier could tell about an inbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Signals {
    /// Contains an apology trigger phrase
    pub apology: bool,
    /// Contains a phrase that makes the persona sulk
    pub provocation: bool,
}

/// Operator-issued signals that reach the machine outside the message path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExternalSignal {
    /// Start sulking
    Pout,
    /// Go to sleep for the night
    Bedtime,
}

/// Events that trigger state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A user message arrived
    Inbound {
        signals: Signals,
        /// Pre-sampled greeting coin; only consulted on greeting opportunities
        greeting_roll: bool,
    },
    External(ExternalSignal),
}

#[cfg(test)]
impl Event {
    /// A plain message with no trigger phrases and a losing greeting coin
    pub fn plain() -> Self {
        Event::Inbound {
            signals: Signals::default(),
            greeting_roll: false,
        }
    }

    pub fn apology() -> Self {
        Event::Inbound {
            signals: Signals {
                apology: true,
                provocation: false,
            },
            greeting_roll: false,
        }
    }
}
