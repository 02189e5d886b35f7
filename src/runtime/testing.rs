//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::traits::*;
use crate::history::Turn;
use crate::llm::GenerationError;
use crate::telegram::DeliveryError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// Mock Generator
// ============================================================================

/// One recorded call to the generator
#[derive(Debug, Clone)]
pub struct GenerateCall {
    pub history: Vec<Turn>,
    pub instruction: String,
}

/// Mock generator that returns queued responses, then a default reply if set
pub struct MockGenerator {
    responses: Mutex<VecDeque<Result<String, GenerationError>>>,
    default_reply: Option<String>,
    delay: Option<Duration>,
    calls: Mutex<Vec<GenerateCall>>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            default_reply: None,
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answer every call with the same text once the queue is empty
    pub fn replying(text: impl Into<String>) -> Self {
        Self {
            default_reply: Some(text.into()),
            ..Self::new()
        }
    }

    /// Sleep before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn queue_response(&self, text: impl Into<String>) {
        self.responses.lock().unwrap().push_back(Ok(text.into()));
    }

    pub fn queue_error(&self, error: GenerationError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_calls(&self) -> Vec<GenerateCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Generator for MockGenerator {
    async fn generate(
        &self,
        history: &[Turn],
        instruction: &str,
    ) -> Result<String, GenerationError> {
        self.calls.lock().unwrap().push(GenerateCall {
            history: history.to_vec(),
            instruction: instruction.to_string(),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let queued = self.responses.lock().unwrap().pop_front();
        match (queued, &self.default_reply) {
            (Some(result), _) => result,
            (None, Some(text)) => Ok(text.clone()),
            (None, None) => Err(GenerationError::network("No mock response queued")),
        }
    }
}

// ============================================================================
// Recording Messenger
// ============================================================================

/// Messenger that records every delivery attempt
pub struct RecordingMessenger {
    fail: bool,
    deliveries: Mutex<Vec<(String, String)>>,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self {
            fail: false,
            deliveries: Mutex::new(Vec::new()),
        }
    }

    /// Records attempts but rejects every one
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// `(conversation id, text)` in attempt order
    pub fn deliveries(&self) -> Vec<(String, String)> {
        self.deliveries.lock().unwrap().clone()
    }

    pub fn count_for(&self, conversation_id: &str) -> usize {
        self.deliveries
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == conversation_id)
            .count()
    }
}

impl Default for RecordingMessenger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn deliver(&self, conversation_id: &str, text: &str) -> Result<(), DeliveryError> {
        self.deliveries
            .lock()
            .unwrap()
            .push((conversation_id.to_string(), text.to_string()));
        if self.fail {
            Err(DeliveryError::Unreachable("mock outage".to_string()))
        } else {
            Ok(())
        }
    }
}

// ============================================================================
// Fixed Dice
// ============================================================================

/// Dice that always land the same way
pub struct FixedDice(pub bool);

impl Dice for FixedDice {
    fn roll(&self, _probability: f64) -> bool {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PersonaConfig;
    use crate::history::Role;
    use crate::runtime::{PersonaRuntime, ReplySource, FALLBACK_LINE};
    use crate::state_machine::{ConvState, ExternalSignal, Mode, Tone, Utterance};
    use std::sync::Arc;

    type TestRuntime = PersonaRuntime<Arc<MockGenerator>, Arc<RecordingMessenger>>;

    struct Harness {
        runtime: TestRuntime,
        generator: Arc<MockGenerator>,
        messenger: Arc<RecordingMessenger>,
    }

    fn harness_with(
        config: &PersonaConfig,
        generator: MockGenerator,
        messenger: RecordingMessenger,
        greet: bool,
    ) -> Harness {
        let generator = Arc::new(generator);
        let messenger = Arc::new(messenger);
        let runtime = PersonaRuntime::new(config, Arc::clone(&generator), Arc::clone(&messenger))
            .with_dice(FixedDice(greet));
        Harness {
            runtime,
            generator,
            messenger,
        }
    }

    fn harness() -> Harness {
        harness_with(
            &PersonaConfig::default(),
            MockGenerator::replying("sure thing"),
            RecordingMessenger::new(),
            false,
        )
    }

    async fn set_state(h: &Harness, id: &str, state: ConvState) {
        h.runtime.store().update(id, |c| c.state = state).await;
    }

    #[tokio::test]
    async fn test_mock_generator_queue_then_default() {
        let mock = MockGenerator::new();
        mock.queue_response("first");
        assert_eq!(mock.generate(&[], "x").await.unwrap(), "first");
        assert!(mock.generate(&[], "x").await.is_err());
        assert_eq!(mock.call_count(), 2);

        let mock = MockGenerator::replying("always");
        assert_eq!(mock.generate(&[], "x").await.unwrap(), "always");
    }

    #[tokio::test]
    async fn test_active_chat_then_drowsy_on_thirtieth() {
        let h = harness();

        for _ in 0..29 {
            let handled = h.runtime.handle_inbound_message("chat", "hey").await;
            let reply = handled.reply.unwrap();
            assert!(matches!(reply.source, ReplySource::Generated { .. }));
            assert!(reply.delivered);
        }
        assert_eq!(
            h.runtime.store().get_or_create("chat").await,
            ConvState {
                mode: Mode::Active,
                message_count: 29,
                day_turns: 29,
            }
        );
        assert_eq!(h.messenger.count_for("chat"), 29);

        let handled = h.runtime.handle_inbound_message("chat", "hey").await;
        assert_eq!(handled.state.mode, Mode::Drowsy);
        assert_eq!(handled.state.message_count, 0);
        let reply = handled.reply.unwrap();
        assert_eq!(reply.source, ReplySource::Fixed(Utterance::GettingSleepy));
        assert_eq!(h.messenger.count_for("chat"), 30);
        // The drowsy line is fixed, not generated
        assert_eq!(h.generator.call_count(), 29);
    }

    #[tokio::test]
    async fn test_long_chat_only_leaves_active_on_thirtieth() {
        let h = harness();

        let mut previous = ConvState::default();
        for i in 1..=400 {
            let handled = h.runtime.handle_inbound_message("chat", "hi").await;
            if previous.mode == Mode::Active && handled.state.mode != Mode::Active {
                assert_eq!(handled.state.mode, Mode::Drowsy, "message {i}");
                assert_eq!(previous.message_count, 29, "message {i}");
            }
            assert_ne!(handled.state.mode, Mode::Sleeping, "message {i}");
            previous = handled.state;
        }
    }

    #[tokio::test]
    async fn test_drowsy_reply_leads_to_nap() {
        let h = harness();
        set_state(&h, "chat", ConvState::new(Mode::Drowsy, 0)).await;

        let handled = h.runtime.handle_inbound_message("chat", "still there?").await;
        assert_eq!(handled.state, ConvState::new(Mode::Napping, 0).with_day_turns(1));
        assert_eq!(
            handled.reply.unwrap().source,
            ReplySource::Fixed(Utterance::GoingToNap)
        );

        // Napping: silence
        let handled = h.runtime.handle_inbound_message("chat", "hello?").await;
        assert!(handled.reply.is_none());
        assert_eq!(h.messenger.count_for("chat"), 1);
    }

    #[tokio::test]
    async fn test_sleeping_stays_silent_until_tenth_message() {
        let h = harness();
        set_state(&h, "chat", ConvState::new(Mode::Sleeping, 0)).await;

        for _ in 0..9 {
            let handled = h.runtime.handle_inbound_message("chat", "wake up").await;
            assert!(handled.reply.is_none());
        }
        assert_eq!(
            h.runtime.store().get_or_create("chat").await,
            ConvState::new(Mode::Sleeping, 9)
        );
        assert!(h.messenger.deliveries().is_empty());
        assert_eq!(h.generator.call_count(), 0);

        let handled = h.runtime.handle_inbound_message("chat", "WAKE UP").await;
        assert_eq!(handled.state, ConvState::new(Mode::WakingFromSleep, 0));
        let reply = handled.reply.unwrap();
        assert!(reply.is_groggy());
        assert_eq!(reply.source, ReplySource::Fixed(Utterance::RudelyWoken));
        assert_eq!(h.messenger.deliveries().len(), 1);

        // Ignored messages never reach history; the waking one does
        let history = h.runtime.store().history("chat").await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].text, "WAKE UP");
    }

    #[tokio::test]
    async fn test_nap_wakes_on_fifth_message() {
        let h = harness();
        set_state(&h, "chat", ConvState::new(Mode::Napping, 3)).await;

        let handled = h.runtime.handle_inbound_message("chat", "psst").await;
        assert_eq!(handled.state, ConvState::new(Mode::Napping, 4));
        assert!(handled.reply.is_none());

        let handled = h.runtime.handle_inbound_message("chat", "psst").await;
        assert_eq!(handled.state.mode, Mode::WakingFromNap);
        assert_eq!(
            handled.reply.unwrap().source,
            ReplySource::Fixed(Utterance::NapWake)
        );

        // Next reply is generated with grogginess
        let handled = h.runtime.handle_inbound_message("chat", "morning!").await;
        let reply = handled.reply.unwrap();
        assert!(reply.is_groggy());
        assert_eq!(
            reply.source,
            ReplySource::Generated {
                tone: Tone::Groggy { turns_left: 4, of: 5 },
                greet: false,
            }
        );
        let call = h.generator.recorded_calls().pop().unwrap();
        assert!(call.instruction.contains("groggy"));
    }

    #[tokio::test]
    async fn test_pouting_sulks_until_apology() {
        let h = harness();
        set_state(&h, "chat", ConvState::new(Mode::Pouting, 2)).await;

        let handled = h.runtime.handle_inbound_message("chat", "come on").await;
        assert_eq!(handled.state.mode, Mode::Pouting);
        assert_eq!(handled.state.message_count, 3);
        assert_eq!(handled.reply.unwrap().text, "😒");

        let handled = h
            .runtime
            .handle_inbound_message("chat", "ok I'm SORRY about that")
            .await;
        assert_eq!(handled.state.mode, Mode::Active);
        assert_eq!(handled.state.message_count, 0);
        assert_eq!(
            handled.reply.unwrap().source,
            ReplySource::Fixed(Utterance::Reconciled)
        );
        assert_eq!(h.generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_provocation_starts_pouting() {
        let config = PersonaConfig {
            provocation_phrases: vec!["shut up".to_string()],
            ..PersonaConfig::default()
        };
        let h = harness_with(
            &config,
            MockGenerator::replying("ok"),
            RecordingMessenger::new(),
            false,
        );

        let handled = h.runtime.handle_inbound_message("chat", "oh shut up").await;
        assert_eq!(handled.state.mode, Mode::Pouting);
        assert_eq!(handled.reply.unwrap().source, ReplySource::Fixed(Utterance::Sulk));
    }

    #[tokio::test]
    async fn test_generation_failure_keeps_state_and_sends_fallback() {
        let generator = MockGenerator::new();
        generator.queue_error(GenerationError::server_error("HTTP 502"));
        let h = harness_with(
            &PersonaConfig::default(),
            generator,
            RecordingMessenger::new(),
            false,
        );

        let handled = h.runtime.handle_inbound_message("chat", "hi").await;
        assert_eq!(handled.state, ConvState::new(Mode::Active, 1).with_day_turns(1));
        let reply = handled.reply.unwrap();
        assert_eq!(reply.source, ReplySource::Fallback);
        assert_eq!(reply.text, FALLBACK_LINE);
        assert_eq!(
            h.messenger.deliveries(),
            vec![("chat".to_string(), FALLBACK_LINE.to_string())]
        );

        // The fallback is not part of the dialogue
        let history = h.runtime.store().history("chat").await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, Role::User);
    }

    #[tokio::test]
    async fn test_slow_generation_times_out() {
        let config = PersonaConfig {
            generation_timeout: Duration::from_millis(50),
            ..PersonaConfig::default()
        };
        let h = harness_with(
            &config,
            MockGenerator::replying("too late").with_delay(Duration::from_secs(5)),
            RecordingMessenger::new(),
            false,
        );

        let handled = h.runtime.handle_inbound_message("chat", "hi").await;
        assert_eq!(handled.reply.unwrap().source, ReplySource::Fallback);
        assert_eq!(handled.state.message_count, 1);
    }

    #[tokio::test]
    async fn test_delivery_failure_is_not_fatal() {
        let h = harness_with(
            &PersonaConfig::default(),
            MockGenerator::replying("hello"),
            RecordingMessenger::failing(),
            false,
        );

        let handled = h.runtime.handle_inbound_message("chat", "hi").await;
        let reply = handled.reply.unwrap();
        assert!(!reply.delivered);
        assert_eq!(handled.state.message_count, 1);

        // Single attempt, no retry
        assert_eq!(h.messenger.deliveries().len(), 1);

        let handled = h.runtime.handle_inbound_message("chat", "hi again").await;
        assert_eq!(handled.state.message_count, 2);
    }

    #[tokio::test]
    async fn test_generator_sees_history_and_instruction() {
        let h = harness();
        h.runtime.handle_inbound_message("chat", "first").await;
        h.runtime.handle_inbound_message("chat", "second").await;

        let calls = h.generator.recorded_calls();
        assert_eq!(calls.len(), 2);
        let texts: Vec<_> = calls[1].history.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "sure thing", "second"]);
        assert!(calls[1].instruction.starts_with("You are Xeno,"));
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let config = PersonaConfig {
            history_capacity: 4,
            ..PersonaConfig::default()
        };
        let h = harness_with(
            &config,
            MockGenerator::replying("ok"),
            RecordingMessenger::new(),
            false,
        );

        for i in 0..10 {
            h.runtime.handle_inbound_message("chat", &format!("m{i}")).await;
        }
        let history = h.runtime.store().history("chat").await;
        assert_eq!(history.len(), 4);
        assert_eq!(history[2].text, "m9");
    }

    #[tokio::test]
    async fn test_greeting_only_on_opportunities() {
        let h = harness_with(
            &PersonaConfig::default(),
            MockGenerator::replying("ok"),
            RecordingMessenger::new(),
            true,
        );

        let mut greeted = Vec::new();
        for _ in 0..12 {
            let handled = h.runtime.handle_inbound_message("chat", "hi").await;
            if let Some(ReplySource::Generated { greet, .. }) = handled.reply.map(|r| r.source) {
                greeted.push(greet);
            }
        }
        let greeted_turns: Vec<usize> = greeted
            .iter()
            .enumerate()
            .filter(|(_, g)| **g)
            .map(|(i, _)| i + 1)
            .collect();
        assert_eq!(greeted_turns, vec![1, 11]);

        let calls = h.generator.recorded_calls();
        assert!(calls[0].instruction.contains("greeting"));
        assert!(!calls[1].instruction.contains("greeting"));
    }

    #[tokio::test]
    async fn test_corrupt_state_is_reset() {
        let h = harness();
        set_state(&h, "chat", ConvState::new(Mode::Active, 500)).await;

        let handled = h.runtime.handle_inbound_message("chat", "hi").await;
        assert_eq!(handled.state, ConvState::new(Mode::Active, 1).with_day_turns(1));
        assert!(handled.reply.is_some());
    }

    #[tokio::test]
    async fn test_external_signals() {
        let h = harness();

        let handled = h.runtime.signal("chat", ExternalSignal::Pout).await;
        assert_eq!(handled.state.mode, Mode::Pouting);
        assert_eq!(handled.reply.unwrap().source, ReplySource::Fixed(Utterance::Sulk));

        let handled = h.runtime.signal("chat", ExternalSignal::Bedtime).await;
        assert_eq!(handled.state, ConvState::new(Mode::Sleeping, 0));
        assert_eq!(
            handled.reply.unwrap().source,
            ReplySource::Fixed(Utterance::GoodNight)
        );

        // Already asleep: nothing happens
        let handled = h.runtime.signal("chat", ExternalSignal::Bedtime).await;
        assert!(handled.reply.is_none());
        assert_eq!(h.messenger.count_for("chat"), 2);

        // Signals are not user messages
        let summary = h.runtime.inspect("chat").await.unwrap();
        assert_eq!(summary.total_messages, 0);
    }

    #[tokio::test]
    async fn test_bedtime_while_napping_is_silent() {
        let h = harness();
        set_state(&h, "chat", ConvState::new(Mode::Napping, 2)).await;

        let handled = h.runtime.signal("chat", ExternalSignal::Bedtime).await;
        assert_eq!(handled.state, ConvState::new(Mode::Sleeping, 0));
        assert!(handled.reply.is_none());
        assert!(h.messenger.deliveries().is_empty());
    }

    #[tokio::test]
    async fn test_inspect_does_not_create() {
        let h = harness();
        assert!(h.runtime.inspect("nobody").await.is_none());

        h.runtime.handle_inbound_message("somebody", "hi").await;
        let summary = h.runtime.inspect("somebody").await.unwrap();
        assert_eq!(summary.mode, Mode::Active);
        assert_eq!(summary.message_count, 1);
        assert_eq!(summary.total_messages, 1);
        assert_eq!(summary.history_len, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_messages_are_serialized() {
        let generator = MockGenerator::replying("ok").with_delay(Duration::from_millis(2));
        let h = Arc::new(harness_with(
            &PersonaConfig::default(),
            generator,
            RecordingMessenger::new(),
            false,
        ));

        let mut tasks = Vec::new();
        for i in 0..40 {
            let h = Arc::clone(&h);
            let id = if i % 2 == 0 { "left" } else { "right" };
            tasks.push(tokio::spawn(async move {
                h.runtime.handle_inbound_message(id, "hi").await
            }));
        }
        for task in tasks {
            assert!(task.await.unwrap().reply.is_some());
        }

        for id in ["left", "right"] {
            let summary = h.runtime.inspect(id).await.unwrap();
            assert_eq!(summary.message_count, 20);
            assert_eq!(summary.total_messages, 20);
            assert_eq!(h.messenger.count_for(id), 20);
        }
    }

    #[tokio::test]
    async fn test_conversations_are_independent() {
        let h = harness();
        set_state(&h, "sleepy", ConvState::new(Mode::Sleeping, 0)).await;

        h.runtime.handle_inbound_message("sleepy", "hi").await;
        h.runtime.handle_inbound_message("awake", "hi").await;

        assert_eq!(h.messenger.count_for("sleepy"), 0);
        assert_eq!(h.messenger.count_for("awake"), 1);
        assert_eq!(
            h.runtime.inspect("sleepy").await.unwrap().mode,
            Mode::Sleeping
        );
    }
}
