//! Chat session handle.
//!
//! A [`ChatSession`] binds one conversation to one credential.  Dropping the
//! session discards both; nothing is written to disk.

use crate::conversation::ConversationState;
use crate::credential::Credential;
use crate::provider::CompletionProvider;
use crate::turn::{TurnController, TurnError, TurnOutcome};
use crate::types::{CompletionOptions, Message, Model, Usage};

/// Aggregated stats for a chat session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStats {
    /// The model requested for the next turn.
    pub model: Model,
    /// The number of messages in the conversation.
    pub message_count: usize,
    /// Turns that appended an assistant message.
    pub successful_turns: u64,
    /// Turns that reached the provider but produced no assistant message.
    pub failed_turns: u64,
    /// Total prompt tokens across successful turns.
    pub total_prompt_tokens: u64,
    /// Total completion tokens across successful turns.
    pub total_completion_tokens: u64,
    /// Usage of the most recent successful turn, if the provider reported it.
    pub last_turn_usage: Option<Usage>,
}

/// One user's conversation with a completion provider.
pub struct ChatSession<P> {
    controller: TurnController<P>,
    credential: Credential,
    conversation: ConversationState,
    successful_turns: u64,
    failed_turns: u64,
    usage_totals: Usage,
    last_turn_usage: Option<Usage>,
}

impl<P: CompletionProvider> ChatSession<P> {
    /// Creates a new, empty session.
    pub fn new(provider: P, credential: Credential, options: CompletionOptions) -> Self {
        Self {
            controller: TurnController::new(provider, options),
            credential,
            conversation: ConversationState::new(),
            successful_turns: 0,
            failed_turns: 0,
            usage_totals: Usage::default(),
            last_turn_usage: None,
        }
    }

    /// Submits a prompt and returns the assistant's reply.
    ///
    /// On failure the conversation keeps the user's message, unless the
    /// prompt itself was rejected.  The session stays usable either way.
    pub async fn submit(&mut self, text: &str) -> Result<Message, TurnError> {
        let outcome = self
            .controller
            .take_turn(&mut self.conversation, &self.credential, text)
            .await;
        match outcome {
            Ok(outcome) => Ok(self.record(outcome)),
            Err(err) => {
                if !err.is_invalid_input() {
                    self.failed_turns += 1;
                }
                Err(err)
            }
        }
    }

    fn record(&mut self, outcome: TurnOutcome) -> Message {
        self.successful_turns += 1;
        self.last_turn_usage = outcome.usage;
        if let Some(usage) = outcome.usage {
            self.usage_totals = self.usage_totals + usage;
        }
        outcome.message
    }

    /// Starts over with an empty conversation and zeroed counters.
    ///
    /// The credential and the completion options carry over.
    pub fn restart(&mut self) {
        tracing::debug!(
            discarded = self.conversation.len(),
            "restarting chat session"
        );
        self.conversation = ConversationState::new();
        self.successful_turns = 0;
        self.failed_turns = 0;
        self.usage_totals = Usage::default();
        self.last_turn_usage = None;
    }

    /// The conversation so far.
    pub fn conversation(&self) -> &ConversationState {
        &self.conversation
    }

    /// Returns the number of messages in the conversation.
    pub fn message_count(&self) -> usize {
        self.conversation.len()
    }

    pub fn options(&self) -> &CompletionOptions {
        self.controller.options()
    }

    pub fn provider(&self) -> &P {
        self.controller.provider()
    }

    /// Changes the model used for responses.
    pub fn set_model(&mut self, model: Model) {
        self.controller.options_mut().model = model;
    }

    /// Returns the current model.
    pub fn model(&self) -> &Model {
        &self.controller.options().model
    }

    /// Sets or clears the system prompt.  Blank prompts clear it.
    pub fn set_system_prompt(&mut self, prompt: Option<String>) {
        self.controller.options_mut().system_prompt = prompt.filter(|p| !p.trim().is_empty());
    }

    /// Returns the current system prompt, if any.
    pub fn system_prompt(&self) -> Option<&str> {
        self.controller.options().system_prompt.as_deref()
    }

    /// Sets or clears the maximum tokens per response.
    pub fn set_max_tokens(&mut self, max_tokens: Option<u32>) {
        self.controller.options_mut().max_tokens = max_tokens;
    }

    /// Sets the sampling temperature.
    pub fn set_temperature(&mut self, temperature: Option<f32>) {
        self.controller.options_mut().temperature = temperature;
    }

    /// Sets the top-p value.
    pub fn set_top_p(&mut self, top_p: Option<f32>) {
        self.controller.options_mut().top_p = top_p;
    }

    /// Chooses between streamed and single-shot transport.
    pub fn set_stream(&mut self, stream: bool) {
        self.controller.options_mut().stream = stream;
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            model: self.model().clone(),
            message_count: self.message_count(),
            successful_turns: self.successful_turns,
            failed_turns: self.failed_turns,
            total_prompt_tokens: self.usage_totals.prompt_tokens,
            total_completion_tokens: self.usage_totals.completion_tokens,
            last_turn_usage: self.last_turn_usage,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::types::{Candidate, Completion, KnownModel, Role};
    use crate::{Error, Result};

    #[derive(Default)]
    struct Echo {
        fail: Mutex<bool>,
        seen: Mutex<Vec<CompletionOptions>>,
    }

    #[async_trait::async_trait]
    impl CompletionProvider for Echo {
        async fn complete(
            &self,
            messages: &[Message],
            _: &Credential,
            options: &CompletionOptions,
        ) -> Result<Completion> {
            self.seen.lock().unwrap().push(options.clone());
            if *self.fail.lock().unwrap() {
                return Err(Error::authentication("Invalid API Key"));
            }
            let last = messages.last().map(Message::content).unwrap_or_default();
            Ok(Completion {
                model: options.model.to_string(),
                candidates: vec![Candidate {
                    index: 0,
                    content: format!("echo: {last}"),
                    finish_reason: Some("stop".to_string()),
                }],
                usage: Some(Usage::new(10, 4)),
            })
        }
    }

    fn session() -> ChatSession<Echo> {
        ChatSession::new(
            Echo::default(),
            Credential::new("gsk_test").unwrap(),
            CompletionOptions::new(),
        )
    }

    #[tokio::test]
    async fn stats_track_turns_and_tokens() {
        let mut session = session();
        session.submit("one").await.unwrap();
        session.submit("two").await.unwrap();
        *session.provider().fail.lock().unwrap() = true;
        assert!(session.submit("three").await.unwrap_err().is_provider());
        assert!(session.submit("   ").await.unwrap_err().is_invalid_input());

        let stats = session.stats();
        assert_eq!(stats.message_count, 5);
        assert_eq!(stats.successful_turns, 2);
        assert_eq!(stats.failed_turns, 1);
        assert_eq!(stats.total_prompt_tokens, 20);
        assert_eq!(stats.total_completion_tokens, 8);
        assert_eq!(stats.last_turn_usage, Some(Usage::new(10, 4)));
    }

    #[tokio::test]
    async fn options_apply_to_the_next_turn() {
        let mut session = session();
        session.set_model(KnownModel::Llama318bInstant.into());
        session.set_system_prompt(Some("Be brief.".to_string()));
        session.set_max_tokens(Some(64));
        session.set_temperature(Some(0.2));
        session.set_top_p(Some(0.9));
        session.set_stream(false);
        let reply = session.submit("hi").await.unwrap();
        assert_eq!(reply.role(), Role::Assistant);
        assert_eq!(reply.content(), "echo: hi");

        let seen = session.provider().seen.lock().unwrap();
        let options = &seen[0];
        assert_eq!(options.model.as_str(), "llama-3.1-8b-instant");
        assert_eq!(options.system_prompt.as_deref(), Some("Be brief."));
        assert_eq!(options.max_tokens, Some(64));
        assert_eq!(options.temperature, Some(0.2));
        assert_eq!(options.top_p, Some(0.9));
        assert!(!options.stream);
    }

    #[test]
    fn blank_system_prompt_clears() {
        let mut session = session();
        session.set_system_prompt(Some("x".to_string()));
        session.set_system_prompt(Some("  ".to_string()));
        assert_eq!(session.system_prompt(), None);
    }

    #[tokio::test]
    async fn restart_discards_history() {
        let mut session = session();
        session.set_max_tokens(Some(32));
        session.submit("hello").await.unwrap();
        session.restart();
        assert_eq!(session.message_count(), 0);
        assert_eq!(session.stats().successful_turns, 0);
        assert_eq!(session.stats().last_turn_usage, None);
        assert_eq!(session.options().max_tokens, Some(32));
    }
}
