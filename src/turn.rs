//! One user-turn, provider-call, assistant-turn cycle.
//!
//! The controller is the only code that mutates a [`ConversationState`] on
//! behalf of the user.  Every failure leaves the conversation holding the
//! user's own message and nothing else from that turn.

use std::fmt;
use std::time::Instant;

use crate::conversation::ConversationState;
use crate::credential::Credential;
use crate::error::{Error, ProviderErrorKind};
use crate::observability::{
    TURN_DURATION, TURN_EMPTY_RESPONSES, TURN_INVALID_INPUT, TURN_PROVIDER_ERRORS, TURNS,
};
use crate::provider::CompletionProvider;
use crate::types::{CompletionOptions, Message, Role, Usage};

/////////////////////////////////////////////// TurnError //////////////////////////////////////////////

/// Why a turn produced no assistant message.
#[derive(Debug)]
pub enum TurnError {
    /// The prompt was empty or only whitespace.  Nothing was appended.
    InvalidInput,
    /// The provider answered without a usable candidate.
    EmptyResponse,
    /// The provider call failed; carries the provider's error.
    Provider(Error),
}

impl TurnError {
    /// The provider-level category, for provider failures.
    pub fn provider_kind(&self) -> Option<ProviderErrorKind> {
        match self {
            TurnError::Provider(err) => Some(err.kind()),
            _ => None,
        }
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, TurnError::InvalidInput)
    }

    pub fn is_empty_response(&self) -> bool {
        matches!(self, TurnError::EmptyResponse)
    }

    pub fn is_provider(&self) -> bool {
        matches!(self, TurnError::Provider(_))
    }
}

impl fmt::Display for TurnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnError::InvalidInput => write!(f, "Please enter a message"),
            TurnError::EmptyResponse => {
                write!(f, "No response received from the completion provider")
            }
            TurnError::Provider(err) => write!(f, "Error: {err}"),
        }
    }
}

impl std::error::Error for TurnError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TurnError::Provider(err) => Some(err),
            _ => None,
        }
    }
}

impl From<Error> for TurnError {
    fn from(err: Error) -> Self {
        TurnError::Provider(err)
    }
}

////////////////////////////////////////////// TurnOutcome /////////////////////////////////////////////

/// A successful turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    /// The assistant message that was appended.
    pub message: Message,
    /// Token accounting for the call, when the provider reported it.
    pub usage: Option<Usage>,
    /// The model that actually answered.
    pub model: String,
}

//////////////////////////////////////////// TurnController ////////////////////////////////////////////

/// Drives turns against a [`CompletionProvider`].
#[derive(Debug)]
pub struct TurnController<P> {
    provider: P,
    options: CompletionOptions,
}

impl<P: CompletionProvider> TurnController<P> {
    pub fn new(provider: P, options: CompletionOptions) -> Self {
        Self { provider, options }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn options(&self) -> &CompletionOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut CompletionOptions {
        &mut self.options
    }

    /// Run one turn and return the assistant message that was appended.
    pub async fn submit_turn(
        &self,
        conversation: &mut ConversationState,
        credential: &Credential,
        user_text: &str,
    ) -> Result<Message, TurnError> {
        self.take_turn(conversation, credential, user_text)
            .await
            .map(|outcome| outcome.message)
    }

    /// Run one turn, keeping the usage and model the provider reported.
    ///
    /// A blank `user_text` fails with [`TurnError::InvalidInput`] and leaves
    /// `conversation` untouched.  Otherwise the user message is appended
    /// before the provider is called, and the assistant message is appended
    /// only if the first candidate carries text.
    pub async fn take_turn(
        &self,
        conversation: &mut ConversationState,
        credential: &Credential,
        user_text: &str,
    ) -> Result<TurnOutcome, TurnError> {
        TURNS.click();
        let user = match Message::new(Role::User, user_text) {
            Ok(user) => user,
            Err(_) => {
                TURN_INVALID_INPUT.click();
                tracing::debug!("rejected blank prompt");
                return Err(TurnError::InvalidInput);
            }
        };
        if conversation.append(user).is_err() {
            TURN_INVALID_INPUT.click();
            return Err(TurnError::InvalidInput);
        }

        let start = Instant::now();
        let result = self
            .provider
            .complete(conversation.as_slice(), credential, &self.options)
            .await;
        TURN_DURATION.add(start.elapsed().as_secs_f64());

        let completion = match result {
            Ok(completion) => completion,
            Err(err) => {
                TURN_PROVIDER_ERRORS.click();
                tracing::info!(
                    kind = ?err.kind(),
                    messages = conversation.len(),
                    "turn failed at the provider"
                );
                return Err(TurnError::Provider(err));
            }
        };

        let text = match completion.first_text() {
            Some(text) if !text.trim().is_empty() => text.to_string(),
            _ => {
                TURN_EMPTY_RESPONSES.click();
                tracing::info!(
                    candidates = completion.candidates.len(),
                    messages = conversation.len(),
                    "provider returned no usable candidate"
                );
                return Err(TurnError::EmptyResponse);
            }
        };

        let message = Message::assistant(text);
        conversation
            .append(message.clone())
            .map_err(|_| TurnError::EmptyResponse)?;
        tracing::info!(
            model = %completion.model,
            messages = conversation.len(),
            "turn complete"
        );
        Ok(TurnOutcome {
            message,
            usage: completion.usage,
            model: completion.model,
        })
    }
}
