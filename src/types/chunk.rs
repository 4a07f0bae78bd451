use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::{ChatRole, Usage};

/// The incremental part of a streamed choice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkDelta {
    /// Present on the first frame of a choice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<ChatRole>,

    /// Text to append to the choice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// One choice inside a streamed frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkChoice {
    /// Which choice this delta belongs to.
    pub index: u32,

    /// The new text.
    #[serde(default)]
    pub delta: ChunkDelta,

    /// Set on the last frame of a choice.
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Groq's extension object, which carries usage on the final frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroqExtension {
    /// Provider request identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Token accounting for the whole request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// One `chat.completion.chunk` frame of a streamed response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    /// Provider-assigned identifier, shared by every frame of a response.
    pub id: String,

    /// Creation time.
    #[serde(with = "time::serde::timestamp")]
    pub created: OffsetDateTime,

    /// The model that answered.
    pub model: String,

    /// Deltas carried by this frame.
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,

    /// Token accounting in the OpenAI placement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,

    /// Token accounting in the Groq placement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_groq: Option<GroqExtension>,
}

impl ChatCompletionChunk {
    /// Usage from whichever placement the provider used.
    pub fn usage(&self) -> Option<Usage> {
        self.usage
            .or_else(|| self.x_groq.as_ref().and_then(|ext| ext.usage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_groq_final_frame() {
        let chunk: ChatCompletionChunk = serde_json::from_value(json!({
            "id": "chatcmpl-9",
            "object": "chat.completion.chunk",
            "created": 1_700_000_000,
            "model": "llama-3.1-8b-instant",
            "system_fingerprint": "fp_1",
            "choices": [{"index": 0, "delta": {}, "logprobs": null, "finish_reason": "stop"}],
            "x_groq": {"id": "req_01", "usage": {"prompt_tokens": 9, "completion_tokens": 3, "total_tokens": 12}}
        }))
        .unwrap();
        assert_eq!(chunk.choices[0].finish_reason.as_deref(), Some("stop"));
        assert_eq!(chunk.choices[0].delta, ChunkDelta::default());
        assert_eq!(chunk.usage(), Some(Usage::new(9, 3)));
    }

    #[test]
    fn top_level_usage_wins() {
        let chunk: ChatCompletionChunk = serde_json::from_value(json!({
            "id": "chatcmpl-9",
            "created": 1_700_000_000,
            "model": "llama-3.1-8b-instant",
            "choices": [],
            "usage": {"prompt_tokens": 1, "completion_tokens": 1, "total_tokens": 2},
            "x_groq": {"usage": {"prompt_tokens": 9, "completion_tokens": 3, "total_tokens": 12}}
        }))
        .unwrap();
        assert_eq!(chunk.usage(), Some(Usage::new(1, 1)));
    }

    #[test]
    fn parse_content_delta() {
        let chunk: ChatCompletionChunk = serde_json::from_value(json!({
            "id": "chatcmpl-9",
            "created": 1_700_000_000,
            "model": "llama-3.1-8b-instant",
            "choices": [{"index": 0, "delta": {"role": "assistant", "content": "Hi"}}]
        }))
        .unwrap();
        assert_eq!(chunk.choices[0].delta.role, Some(ChatRole::Assistant));
        assert_eq!(chunk.choices[0].delta.content.as_deref(), Some("Hi"));
        assert_eq!(chunk.usage(), None);
    }
}
