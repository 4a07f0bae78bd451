//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and configuration
//! structures for controlling chat behavior.

use arrrg_derive::CommandLine;

use crate::types::{CompletionOptions, Model};

/// Command-line arguments for the groqchat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Model to use for chat.
    #[arrrg(optional, "Model to use (default: llama-3.3-70b-versatile)", "MODEL")]
    pub model: Option<String>,

    /// System prompt sent ahead of the conversation.
    #[arrrg(optional, "System prompt for the conversation", "PROMPT")]
    pub system: Option<String>,

    /// Maximum tokens per response.
    #[arrrg(optional, "Max tokens per response (default: provider decides)", "TOKENS")]
    pub max_tokens: Option<u32>,

    /// Endpoint root to send requests to.
    #[arrrg(optional, "API base URL (default: https://api.groq.com/openai/v1/)", "URL")]
    pub base_url: Option<String>,

    /// Ask for the whole reply at once instead of a stream.
    #[arrrg(flag, "Disable streamed responses")]
    pub no_stream: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments with appropriate defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// The model to use for generating responses.
    pub model: Model,

    /// Optional system prompt; never stored in the conversation.
    pub system_prompt: Option<String>,

    /// Maximum tokens per response; `None` leaves it to the provider.
    pub max_tokens: Option<u32>,

    /// Optional sampling temperature.
    pub temperature: Option<f32>,

    /// Optional top-p nucleus sampling value.
    pub top_p: Option<f32>,

    /// Whether responses are streamed.
    pub stream: bool,

    /// Endpoint override; `None` uses the public endpoint.
    pub base_url: Option<String>,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Model: llama-3.3-70b-versatile
    /// - Streaming: enabled
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            model: Model::default(),
            system_prompt: None,
            max_tokens: None,
            temperature: None,
            top_p: None,
            stream: true,
            base_url: None,
            use_color: true,
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }

    /// Sets the system prompt.
    pub fn with_system_prompt(mut self, prompt: String) -> Self {
        self.system_prompt = Some(prompt);
        self
    }

    /// Sets the maximum tokens per response.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
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

    /// Disables streamed responses.
    pub fn without_stream(mut self) -> Self {
        self.stream = false;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// The completion options a new session starts with.
    pub fn completion_options(&self) -> CompletionOptions {
        CompletionOptions::new()
            .with_model(self.model.clone())
            .with_stream(self.stream)
            .with_max_tokens(self.max_tokens)
            .with_temperature(self.temperature)
            .with_top_p(self.top_p)
            .with_system_prompt(self.system_prompt.clone())
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        let model = args.model.map(Model::from).unwrap_or_default();

        ChatConfig {
            model,
            system_prompt: args.system.filter(|s| !s.trim().is_empty()),
            max_tokens: args.max_tokens.filter(|n| *n > 0),
            stream: !args.no_stream,
            base_url: args.base_url,
            use_color: !args.no_color,
            ..ChatConfig::new()
        }
    }
}
