//! Persona conversation state types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Behavioral mode of the persona within one conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Reachable, replies normally
    #[default]
    Active,
    /// Announced sleepiness, about to nap
    Drowsy,
    /// Silent; counts messages toward waking up
    Napping,
    /// Silent for the night; counts messages toward being woken
    Sleeping,
    /// Sulking until an apology arrives
    Pouting,
    /// Groggy after a nap, recovering over a few turns
    WakingFromNap,
    /// Irritated after being woken, recovering over a few turns
    WakingFromSleep,
}

impl Mode {
    /// Silent modes produce no reply until their wake threshold is met
    pub fn is_silent(self) -> bool {
        matches!(self, Mode::Napping | Mode::Sleeping)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Active => "active",
            Mode::Drowsy => "drowsy",
            Mode::Napping => "napping",
            Mode::Sleeping => "sleeping",
            Mode::Pouting => "pouting",
            Mode::WakingFromNap => "waking_from_nap",
            Mode::WakingFromSleep => "waking_from_sleep",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The machine-relevant part of a conversation.
///
/// `message_count` is interpreted per mode: messages since entering the
/// current phase. `day_turns` counts reachable turns since the persona last
/// woke for the day and only matters when a day length is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ConvState {
    pub mode: Mode,
    pub message_count: u32,
    pub day_turns: u32,
}

impl ConvState {
    pub fn new(mode: Mode, message_count: u32) -> Self {
        Self {
            mode,
            message_count,
            day_turns: 0,
        }
    }

    #[cfg(test)]
    pub fn with_day_turns(mut self, day_turns: u32) -> Self {
        self.day_turns = day_turns;
        self
    }

    /// Enter a new phase with a fresh counter, keeping the day tally
    pub fn enter(self, mode: Mode) -> Self {
        Self {
            mode,
            message_count: 0,
            day_turns: self.day_turns,
        }
    }

    /// Check that the counters are ones the machine can actually rest at.
    ///
    /// Every counting mode leaves its phase the moment the counter reaches
    /// its threshold, so a stored counter at or past the threshold means the
    /// state was corrupted (or thresholds changed under it).
    pub fn validate(&self, thresholds: &Thresholds) -> Result<(), StateCorruption> {
        let limit = match self.mode {
            Mode::Active => Some(thresholds.drowsy_after),
            Mode::Drowsy => Some(thresholds.drowsy_replies.saturating_add(1)),
            Mode::Napping => Some(thresholds.nap_wake_after),
            Mode::Sleeping => Some(thresholds.sleep_wake_after),
            Mode::WakingFromNap => Some(thresholds.nap_recovery_turns),
            Mode::WakingFromSleep => Some(thresholds.sleep_recovery_turns),
            Mode::Pouting => None,
        };

        if let Some(limit) = limit {
            if self.message_count >= limit {
                return Err(StateCorruption::CounterOutOfRange {
                    mode: self.mode,
                    count: self.message_count,
                    limit,
                });
            }
        }

        Ok(())
    }
}

/// A stored state the machine could never have produced
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateCorruption {
    #[error("{mode} counter {count} is at or beyond its limit {limit}")]
    CounterOutOfRange { mode: Mode, count: u32, limit: u32 },
}

/// Message-count thresholds driving the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    /// Active messages before getting drowsy
    pub drowsy_after: u32,
    /// Generated drowsy replies allowed before dozing off
    pub drowsy_replies: u32,
    /// Messages received while napping before waking up
    pub nap_wake_after: u32,
    /// Groggy turns after a nap before being fully active
    pub nap_recovery_turns: u32,
    /// Messages received while sleeping before being woken
    pub sleep_wake_after: u32,
    /// Irritated turns after being woken before being fully active
    pub sleep_recovery_turns: u32,
    /// Reachable turns per simulated day; `None` (the default) leaves bedtime
    /// to the operator signal
    pub day_length: Option<u32>,
    /// Every n-th turn of an active phase is a greeting opportunity
    pub greeting_every: u32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            drowsy_after: 30,
            drowsy_replies: 0,
            nap_wake_after: 5,
            nap_recovery_turns: 5,
            sleep_wake_after: 10,
            sleep_recovery_turns: 4,
            day_length: None,
            greeting_every: 10,
        }
    }
}

/// Static context for transitions (not part of the state)
#[derive(Debug, Clone, Default)]
pub struct ConvContext {
    pub thresholds: Thresholds,
}

impl ConvContext {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }
}
