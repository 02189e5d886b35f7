//! Conversation runtime executor

use super::traits::{Dice, Generator, Messenger, SeededDice};
use crate::classify::{Classifier, PhraseClassifier};
use crate::config::PersonaConfig;
use crate::history::Turn;
use crate::llm::GenerationError;
use crate::state_machine::{
    transition, ConvContext, ConvState, Effect, Event, ExternalSignal, Tone, TransitionResult,
    Utterance,
};
use crate::store::{Conversation, ConversationStore, ConversationSummary};
use crate::system_prompt::Persona;
use std::sync::Arc;
use std::time::Duration;

/// Sent when the generator fails or times out
pub const FALLBACK_LINE: &str = "ugh, my brain just glitched 😵 say that again?";

/// Where a reply's text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplySource {
    Generated { tone: Tone, greet: bool },
    Fixed(Utterance),
    /// Generation failed; the fallback line was sent instead
    Fallback,
}

/// A reply produced for one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub source: ReplySource,
    /// Whether the messenger accepted it
    pub delivered: bool,
}

impl Reply {
    /// Reply carries post-sleep grogginess
    pub fn is_groggy(&self) -> bool {
        match self.source {
            ReplySource::Generated { tone, .. } => tone.is_groggy(),
            ReplySource::Fixed(line) => line.is_groggy(),
            ReplySource::Fallback => false,
        }
    }
}

/// Outcome of handling one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handled {
    pub state: ConvState,
    pub reply: Option<Reply>,
}

/// Runs the persona state machine against real (or mocked) collaborators
pub struct PersonaRuntime<G, M>
where
    G: Generator + 'static,
    M: Messenger + 'static,
{
    context: ConvContext,
    store: ConversationStore,
    generator: Arc<G>,
    messenger: Arc<M>,
    classifier: Arc<dyn Classifier>,
    dice: Arc<dyn Dice>,
    persona: Persona,
    greeting_probability: f64,
    generation_timeout: Duration,
}

impl<G, M> PersonaRuntime<G, M>
where
    G: Generator + 'static,
    M: Messenger + 'static,
{
    pub fn new(config: &PersonaConfig, generator: G, messenger: M) -> Self {
        let mut persona = Persona::new(&config.name);
        if let Some(path) = &config.prompt_file {
            persona = persona.with_description_file(path);
        }

        Self {
            context: ConvContext::new(config.thresholds),
            store: ConversationStore::new(config.history_capacity),
            generator: Arc::new(generator),
            messenger: Arc::new(messenger),
            classifier: Arc::new(PhraseClassifier::new(
                &config.apology_phrases,
                &config.provocation_phrases,
            )),
            dice: Arc::new(
                config
                    .greeting_seed
                    .map_or_else(SeededDice::from_entropy, SeededDice::seeded),
            ),
            persona,
            greeting_probability: config.greeting_probability,
            generation_timeout: config.generation_timeout,
        }
    }

    /// Replace the greeting dice
    #[cfg(test)]
    pub fn with_dice(mut self, dice: impl Dice + 'static) -> Self {
        self.dice = Arc::new(dice);
        self
    }

    #[cfg(test)]
    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Process one inbound user message.
    ///
    /// Never fails: generation and delivery problems are logged and reflected
    /// in the returned reply, and the state change is kept either way.
    pub async fn handle_inbound_message(&self, conversation_id: &str, text: &str) -> Handled {
        let event = Event::Inbound {
            signals: self.classifier.classify(text),
            greeting_roll: self.dice.roll(self.greeting_probability),
        };
        self.process(conversation_id, event, Some(text)).await
    }

    /// Apply an operator signal
    pub async fn signal(&self, conversation_id: &str, signal: ExternalSignal) -> Handled {
        tracing::info!(conv_id = %conversation_id, ?signal, "External signal");
        self.process(conversation_id, Event::External(signal), None)
            .await
    }

    /// Diagnostics view; `None` for conversations never seen
    pub async fn inspect(&self, conversation_id: &str) -> Option<ConversationSummary> {
        self.store.summary(conversation_id).await
    }

    async fn process(&self, conversation_id: &str, event: Event, text: Option<&str>) -> Handled {
        // Held until the reply is delivered, so one conversation's messages
        // are handled strictly one after another
        let mut conversation = self.store.lock(conversation_id).await;

        if let Err(e) = conversation.state.validate(&self.context.thresholds) {
            tracing::warn!(
                conv_id = %conversation_id,
                error = %e,
                "Corrupt conversation state, resetting to active"
            );
            conversation.state = ConvState::default();
        }
        if text.is_some() {
            conversation.touch();
        }

        let old_state = conversation.state;
        let TransitionResult { new_state, effects } =
            transition(&old_state, &self.context, event);

        if new_state.mode != old_state.mode {
            tracing::info!(
                conv_id = %conversation_id,
                from = %old_state.mode,
                to = %new_state.mode,
                "Mode changed"
            );
        }

        let mut reply = None;
        for effect in effects {
            match effect {
                Effect::PersistState => conversation.state = new_state,
                Effect::RecordUserTurn => {
                    if let Some(text) = text {
                        conversation.history.append(Turn::user(text));
                    }
                }
                Effect::Generate { tone, greet } => {
                    reply = Some(
                        self.generate(conversation_id, &mut conversation, tone, greet)
                            .await,
                    );
                }
                Effect::Say(line) => {
                    conversation.history.append(Turn::persona(line.text()));
                    reply = Some(Reply {
                        text: line.text().to_string(),
                        source: ReplySource::Fixed(line),
                        delivered: false,
                    });
                }
            }
        }

        if let Some(reply) = &mut reply {
            reply.delivered = self.deliver(conversation_id, &reply.text).await;
        }

        tracing::debug!(
            conv_id = %conversation_id,
            mode = %conversation.state.mode,
            count = conversation.state.message_count,
            day_turns = conversation.state.day_turns,
            replied = reply.is_some(),
            groggy = reply.as_ref().is_some_and(Reply::is_groggy),
            "Event handled"
        );

        Handled {
            state: conversation.state,
            reply,
        }
    }

    async fn generate(
        &self,
        conversation_id: &str,
        conversation: &mut Conversation,
        tone: Tone,
        greet: bool,
    ) -> Reply {
        let instruction = self.persona.instruction(tone, greet);
        let history = conversation.history.snapshot();

        let outcome = tokio::time::timeout(
            self.generation_timeout,
            self.generator.generate(&history, &instruction),
        )
        .await
        .unwrap_or_else(|_| Err(GenerationError::timeout(self.generation_timeout)));

        match outcome {
            Ok(text) => {
                conversation.history.append(Turn::persona(&text));
                Reply {
                    text,
                    source: ReplySource::Generated { tone, greet },
                    delivered: false,
                }
            }
            Err(e) => {
                tracing::error!(
                    conv_id = %conversation_id,
                    kind = ?e.kind,
                    error = %e.message,
                    "Generation failed, sending fallback"
                );
                Reply {
                    text: FALLBACK_LINE.to_string(),
                    source: ReplySource::Fallback,
                    delivered: false,
                }
            }
        }
    }

    /// Single attempt; failures are logged and dropped
    async fn deliver(&self, conversation_id: &str, text: &str) -> bool {
        match self.messenger.deliver(conversation_id, text).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(conv_id = %conversation_id, error = %e, "Reply delivery failed");
                false
            }
        }
    }
}
