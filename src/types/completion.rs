use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::{Message, Model, Role, Usage};

/// Per-call configuration for a completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionOptions {
    /// The model to ask.
    pub model: Model,

    /// Ask the provider to deliver the reply incrementally.
    ///
    /// The reply is always assembled into one text before it reaches the
    /// turn controller.
    pub stream: bool,

    /// Upper bound on generated tokens.
    pub max_tokens: Option<u32>,

    /// Sampling temperature.
    pub temperature: Option<f32>,

    /// Nucleus sampling value.
    pub top_p: Option<f32>,

    /// Instructions sent ahead of the conversation on every request.
    ///
    /// This is never stored in the conversation itself.
    pub system_prompt: Option<String>,
}

impl CompletionOptions {
    /// Streaming completions against the default model.
    pub fn new() -> Self {
        Self {
            model: Model::default(),
            stream: true,
            max_tokens: None,
            temperature: None,
            top_p: None,
            system_prompt: None,
        }
    }

    /// Sets the model.
    pub fn with_model(mut self, model: impl Into<Model>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the stream flag.
    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Sets the maximum tokens per response.
    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the top-p value.
    pub fn with_top_p(mut self, top_p: Option<f32>) -> Self {
        self.top_p = top_p;
        self
    }

    /// Sets the system prompt.
    pub fn with_system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt;
        self
    }
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Roles understood by the chat-completions endpoint.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Instructions that frame the conversation.
    System,

    /// The person typing prompts.
    User,

    /// The language model.
    Assistant,
}

impl From<Role> for ChatRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => ChatRole::User,
            Role::Assistant => ChatRole::Assistant,
        }
    }
}

/// A message as it travels on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// The author.
    pub role: ChatRole,

    /// The text; the provider may send `null` for an assistant turn.
    #[serde(default)]
    pub content: Option<String>,
}

impl From<&Message> for ChatMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role().into(),
            content: Some(message.content().to_string()),
        }
    }
}

/// Body of a `POST chat/completions` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    /// The model to ask.
    pub model: Model,

    /// The system prompt, if any, followed by the conversation in order.
    pub messages: Vec<ChatMessage>,

    /// Whether to stream the reply as server-sent events.
    pub stream: bool,

    /// Upper bound on generated tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Nucleus sampling value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

impl ChatCompletionRequest {
    /// Build a request carrying the full conversation.
    pub fn new(messages: &[Message], options: &CompletionOptions) -> Self {
        let system = options
            .system_prompt
            .as_ref()
            .filter(|prompt| !prompt.trim().is_empty())
            .map(|prompt| ChatMessage {
                role: ChatRole::System,
                content: Some(prompt.clone()),
            });
        Self {
            model: options.model.clone(),
            messages: system
                .into_iter()
                .chain(messages.iter().map(ChatMessage::from))
                .collect(),
            stream: options.stream,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            top_p: options.top_p,
        }
    }
}

/// One choice in a complete (non-streamed) response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    /// Position of this choice in the response.
    pub index: u32,

    /// The generated message.
    pub message: ChatMessage,

    /// Why generation stopped.
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// A complete chat-completions response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletion {
    /// Provider-assigned identifier.
    pub id: String,

    /// Creation time.
    #[serde(with = "time::serde::timestamp")]
    pub created: OffsetDateTime,

    /// The model that answered.
    pub model: String,

    /// Completion candidates, possibly none.
    #[serde(default)]
    pub choices: Vec<Choice>,

    /// Token accounting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// One alternative reply, reduced to what the core needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Position of this candidate in the response.
    pub index: u32,

    /// The assembled reply text; empty when the provider sent none.
    pub content: String,

    /// Why generation stopped.
    pub finish_reason: Option<String>,
}

/// Provider-neutral result of a completion call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Completion {
    /// The model that answered.
    pub model: String,

    /// Candidates ordered by index.
    pub candidates: Vec<Candidate>,

    /// Token accounting, when the provider reported it.
    pub usage: Option<Usage>,
}

impl Completion {
    /// The text of the first candidate, if there is one.
    pub fn first_text(&self) -> Option<&str> {
        self.candidates.first().map(|c| c.content.as_str())
    }
}

impl From<ChatCompletion> for Completion {
    fn from(completion: ChatCompletion) -> Self {
        let mut candidates: Vec<Candidate> = completion
            .choices
            .into_iter()
            .map(|choice| Candidate {
                index: choice.index,
                content: choice.message.content.unwrap_or_default(),
                finish_reason: choice.finish_reason,
            })
            .collect();
        candidates.sort_by_key(|c| c.index);
        Self {
            model: completion.model,
            candidates,
            usage: completion.usage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn request_carries_conversation_in_order() {
        let messages = vec![
            Message::user("Hello"),
            Message::assistant("Hi there!"),
            Message::user("How are you?"),
        ];
        let options = CompletionOptions::new().with_max_tokens(Some(256));
        let request = ChatCompletionRequest::new(&messages, &options);
        assert_eq!(
            to_value(&request).unwrap(),
            json!({
                "model": "llama-3.3-70b-versatile",
                "messages": [
                    {"role": "user", "content": "Hello"},
                    {"role": "assistant", "content": "Hi there!"},
                    {"role": "user", "content": "How are you?"}
                ],
                "stream": true,
                "max_tokens": 256
            })
        );
    }

    #[test]
    fn request_prepends_system_prompt() {
        let messages = vec![Message::user("Hello")];
        let options = CompletionOptions::new()
            .with_stream(false)
            .with_system_prompt(Some("Be brief.".to_string()))
            .with_temperature(Some(0.5));
        let request = ChatCompletionRequest::new(&messages, &options);
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, ChatRole::System);
        assert_eq!(request.messages[0].content.as_deref(), Some("Be brief."));
        assert_eq!(request.messages[1].role, ChatRole::User);
        assert!(!request.stream);
        assert_eq!(request.temperature, Some(0.5));
    }

    #[test]
    fn blank_system_prompt_is_dropped() {
        let options = CompletionOptions::new().with_system_prompt(Some("  ".to_string()));
        let request = ChatCompletionRequest::new(&[Message::user("Hello")], &options);
        assert_eq!(request.messages.len(), 1);
    }

    #[test]
    fn completion_from_response() {
        let response: ChatCompletion = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1_700_000_000,
            "model": "llama-3.3-70b-versatile",
            "choices": [
                {
                    "index": 1,
                    "message": {"role": "assistant", "content": "second"},
                    "finish_reason": "stop"
                },
                {
                    "index": 0,
                    "message": {"role": "assistant", "content": "Hi there!"},
                    "finish_reason": "stop"
                }
            ],
            "usage": {"prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16}
        }))
        .unwrap();
        assert_eq!(response.created.unix_timestamp(), 1_700_000_000);

        let completion = Completion::from(response);
        assert_eq!(completion.first_text(), Some("Hi there!"));
        assert_eq!(completion.candidates.len(), 2);
        assert_eq!(completion.usage, Some(Usage::new(12, 4)));
    }

    #[test]
    fn completion_without_choices() {
        let response: ChatCompletion = serde_json::from_value(json!({
            "id": "chatcmpl-2",
            "created": 1_700_000_000,
            "model": "llama-3.3-70b-versatile",
            "choices": []
        }))
        .unwrap();
        let completion = Completion::from(response);
        assert_eq!(completion.first_text(), None);
    }

    #[test]
    fn null_content_becomes_empty_text() {
        let response: ChatCompletion = serde_json::from_value(json!({
            "id": "chatcmpl-3",
            "created": 1_700_000_000,
            "model": "llama-3.3-70b-versatile",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": null}}
            ]
        }))
        .unwrap();
        let completion = Completion::from(response);
        assert_eq!(completion.first_text(), Some(""));
    }
}
