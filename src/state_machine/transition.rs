//! Pure state transition function
//!
//! Given the same state, context and event this always produces the same
//! result: no clock, no randomness, no I/O. The greeting coin is sampled by
//! the caller and arrives inside the event.

use super::effect::{Tone, Utterance};
use super::state::{ConvContext, ConvState, Mode, Thresholds};
use super::{Effect, Event};
use crate::state_machine::event::{ExternalSignal, Signals};

/// Result of a state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionResult {
    pub new_state: ConvState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ConvState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    /// The reply-producing effect, if any
    #[cfg(test)]
    pub fn reply(&self) -> Option<&Effect> {
        self.effects.iter().find(|e| e.replies())
    }
}

/// Pure transition function
pub fn transition(state: &ConvState, context: &ConvContext, event: Event) -> TransitionResult {
    match event {
        Event::Inbound {
            signals,
            greeting_roll,
        } => match state.mode {
            Mode::Napping => count_toward_wake(
                state,
                context.thresholds.nap_wake_after,
                Mode::WakingFromNap,
                Utterance::NapWake,
            ),
            Mode::Sleeping => count_toward_wake(
                state,
                context.thresholds.sleep_wake_after,
                Mode::WakingFromSleep,
                Utterance::RudelyWoken,
            ),
            _ => reachable(state, &context.thresholds, signals, greeting_roll),
        },
        Event::External(signal) => external(state, signal),
    }
}

/// Silent modes: count the message, wake once the threshold is reached
fn count_toward_wake(
    state: &ConvState,
    wake_after: u32,
    waking_mode: Mode,
    line: Utterance,
) -> TransitionResult {
    let count = state.message_count.saturating_add(1);

    if count >= wake_after {
        TransitionResult::new(state.enter(waking_mode))
            .with_effect(Effect::RecordUserTurn)
            .with_effect(Effect::PersistState)
            .with_effect(Effect::Say(line))
    } else {
        TransitionResult::new(ConvState {
            message_count: count,
            ..*state
        })
        .with_effect(Effect::PersistState)
    }
}

/// Reachable modes: the persona hears the message and always answers
fn reachable(
    state: &ConvState,
    thresholds: &Thresholds,
    signals: Signals,
    greeting_roll: bool,
) -> TransitionResult {
    let state = ConvState {
        day_turns: state.day_turns.saturating_add(1),
        ..*state
    };
    let count = state.message_count.saturating_add(1);

    // These two hold whatever the message says and however late the day is
    match state.mode {
        Mode::Active if count >= thresholds.drowsy_after => {
            return reply(state.enter(Mode::Drowsy), Effect::Say(Utterance::GettingSleepy));
        }
        Mode::Pouting if signals.apology => {
            return reply(state.enter(Mode::Active), Effect::Say(Utterance::Reconciled));
        }
        _ => {}
    }

    if thresholds
        .day_length
        .is_some_and(|length| state.day_turns >= length)
    {
        return reply(go_to_sleep(), Effect::Say(Utterance::GoodNight));
    }

    if signals.provocation && state.mode != Mode::Pouting && !signals.apology {
        return reply(state.enter(Mode::Pouting), Effect::Say(Utterance::Sulk));
    }

    match state.mode {
        Mode::Active => {
            let opportunity = thresholds.greeting_every > 0
                && (count - 1) % thresholds.greeting_every == 0;
            reply(
                counted(state, count),
                Effect::Generate {
                    tone: Tone::Normal,
                    greet: opportunity && greeting_roll,
                },
            )
        }

        Mode::Drowsy if state.message_count < thresholds.drowsy_replies => {
            reply(counted(state, count), Effect::generate(Tone::Drowsy))
        }
        Mode::Drowsy => reply(state.enter(Mode::Napping), Effect::Say(Utterance::GoingToNap)),

        Mode::WakingFromNap if count >= thresholds.nap_recovery_turns => {
            reply(state.enter(Mode::Active), Effect::generate(Tone::Normal))
        }
        Mode::WakingFromNap => reply(
            counted(state, count),
            Effect::generate(Tone::Groggy {
                turns_left: thresholds.nap_recovery_turns - count,
                of: thresholds.nap_recovery_turns,
            }),
        ),

        Mode::WakingFromSleep if count >= thresholds.sleep_recovery_turns => {
            reply(state.enter(Mode::Active), Effect::generate(Tone::Normal))
        }
        Mode::WakingFromSleep => reply(
            counted(state, count),
            Effect::generate(Tone::Irritated {
                turns_left: thresholds.sleep_recovery_turns - count,
                of: thresholds.sleep_recovery_turns,
            }),
        ),

        Mode::Pouting => reply(counted(state, count), Effect::Say(Utterance::Sulk)),

        // Silent modes are routed to count_toward_wake before reaching here
        Mode::Napping | Mode::Sleeping => TransitionResult::new(state),
    }
}

fn external(state: &ConvState, signal: ExternalSignal) -> TransitionResult {
    match (state.mode, signal) {
        (Mode::Pouting, ExternalSignal::Pout) | (Mode::Sleeping, ExternalSignal::Bedtime) => {
            TransitionResult::new(*state)
        }
        // Asleep personas don't notice being provoked
        (mode, ExternalSignal::Pout) if mode.is_silent() => TransitionResult::new(*state),
        (_, ExternalSignal::Pout) => TransitionResult::new(state.enter(Mode::Pouting))
            .with_effect(Effect::PersistState)
            .with_effect(Effect::Say(Utterance::Sulk)),

        // A nap quietly turns into the night's sleep
        (Mode::Napping, ExternalSignal::Bedtime) => {
            TransitionResult::new(go_to_sleep()).with_effect(Effect::PersistState)
        }
        (_, ExternalSignal::Bedtime) => TransitionResult::new(go_to_sleep())
            .with_effect(Effect::PersistState)
            .with_effect(Effect::Say(Utterance::GoodNight)),
    }
}

fn counted(state: ConvState, count: u32) -> ConvState {
    ConvState {
        message_count: count,
        ..state
    }
}

/// Sleeping starts a new day: both counters reset
fn go_to_sleep() -> ConvState {
    ConvState::new(Mode::Sleeping, 0)
}

fn reply(state: ConvState, effect: Effect) -> TransitionResult {
    TransitionResult::new(state)
        .with_effect(Effect::RecordUserTurn)
        .with_effect(Effect::PersistState)
        .with_effect(effect)
}
