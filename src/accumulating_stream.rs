//! Accumulates streamed chunks into a complete response.

use futures::{Stream, StreamExt};
use time::OffsetDateTime;

use crate::{
    ChatCompletion, ChatCompletionChunk, ChatMessage, ChatRole, Choice, ClientLogger, Result,
    Usage,
};

/// Merges [`ChatCompletionChunk`]s into a single [`ChatCompletion`].
///
/// Deltas are grouped by choice index and concatenated in arrival order.  The
/// last non-empty finish reason of a choice wins, as does the last usage
/// report of the stream.
#[derive(Debug, Default)]
pub struct ChunkAccumulator {
    header: Option<(String, OffsetDateTime, String)>,
    choices: Vec<ChoiceBuilder>,
    usage: Option<Usage>,
    chunks: usize,
}

#[derive(Debug)]
struct ChoiceBuilder {
    index: u32,
    role: ChatRole,
    content: String,
    saw_content: bool,
    finish_reason: Option<String>,
}

impl ChoiceBuilder {
    fn new(index: u32) -> Self {
        Self {
            index,
            role: ChatRole::Assistant,
            content: String::new(),
            saw_content: false,
            finish_reason: None,
        }
    }

    fn build(self) -> Choice {
        Choice {
            index: self.index,
            message: ChatMessage {
                role: self.role,
                content: self.saw_content.then_some(self.content),
            },
            finish_reason: self.finish_reason,
        }
    }
}

impl ChunkAccumulator {
    /// An accumulator that has seen nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one chunk into the response.
    pub fn push(&mut self, chunk: &ChatCompletionChunk) {
        self.chunks += 1;
        if self.header.is_none() {
            self.header = Some((chunk.id.clone(), chunk.created, chunk.model.clone()));
        }
        for choice in &chunk.choices {
            let builder = match self.choices.iter().position(|c| c.index == choice.index) {
                Some(pos) => &mut self.choices[pos],
                None => {
                    self.choices.push(ChoiceBuilder::new(choice.index));
                    let last = self.choices.len() - 1;
                    &mut self.choices[last]
                }
            };
            if let Some(role) = choice.delta.role {
                builder.role = role;
            }
            if let Some(content) = &choice.delta.content {
                builder.content.push_str(content);
                builder.saw_content = true;
            }
            if let Some(reason) = choice.finish_reason.as_ref().filter(|r| !r.is_empty()) {
                builder.finish_reason = Some(reason.clone());
            }
        }
        if let Some(usage) = chunk.usage() {
            self.usage = Some(usage);
        }
    }

    /// Number of chunks folded in so far.
    pub fn chunk_count(&self) -> usize {
        self.chunks
    }

    /// Produce the assembled response.
    ///
    /// A stream that ended before any chunk arrived yields a response with no
    /// choices, the same as a single-shot reply with an empty `choices` list.
    pub fn finish(self) -> ChatCompletion {
        let (id, created, model) = self
            .header
            .unwrap_or_else(|| (String::new(), OffsetDateTime::UNIX_EPOCH, String::new()));
        let mut choices: Vec<Choice> = self.choices.into_iter().map(ChoiceBuilder::build).collect();
        choices.sort_by_key(|c| c.index);
        ChatCompletion {
            id,
            created,
            model,
            choices,
            usage: self.usage,
        }
    }
}

/// Drain a chunk stream into a complete response.
///
/// Stops at the first error and returns it; partial text is discarded.  Each
/// chunk, and the final response, is passed to `logger` when one is given.
pub async fn collect_stream<S>(
    stream: S,
    logger: Option<&dyn ClientLogger>,
) -> Result<ChatCompletion>
where
    S: Stream<Item = Result<ChatCompletionChunk>>,
{
    futures::pin_mut!(stream);
    let mut accumulator = ChunkAccumulator::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if let Some(logger) = logger {
            logger.log_stream_chunk(&chunk);
        }
        accumulator.push(&chunk);
    }
    if accumulator.chunk_count() == 0 {
        tracing::debug!("stream ended without any completion chunk");
    }
    let completion = accumulator.finish();
    if let Some(logger) = logger {
        logger.log_stream_completion(&completion);
    }
    Ok(completion)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChunkChoice, ChunkDelta, Error, GroqExtension};
    use futures::stream;

    fn chunk(index: u32, content: Option<&str>, finish: Option<&str>) -> ChatCompletionChunk {
        ChatCompletionChunk {
            id: "chatcmpl-1".to_string(),
            created: OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap(),
            model: "llama-3.3-70b-versatile".to_string(),
            choices: vec![ChunkChoice {
                index,
                delta: ChunkDelta {
                    role: None,
                    content: content.map(str::to_string),
                },
                finish_reason: finish.map(str::to_string),
            }],
            usage: None,
            x_groq: None,
        }
    }

    #[test]
    fn concatenates_deltas() {
        let mut acc = ChunkAccumulator::new();
        acc.push(&chunk(0, Some("Hi"), None));
        acc.push(&chunk(0, Some(" there"), None));
        acc.push(&chunk(0, Some("!"), Some("stop")));
        assert_eq!(acc.chunk_count(), 3);

        let completion = acc.finish();
        assert_eq!(completion.id, "chatcmpl-1");
        assert_eq!(completion.choices.len(), 1);
        assert_eq!(
            completion.choices[0].message.content.as_deref(),
            Some("Hi there!")
        );
        assert_eq!(completion.choices[0].finish_reason.as_deref(), Some("stop"));
    }

    #[test]
    fn keeps_choices_apart() {
        let mut acc = ChunkAccumulator::new();
        acc.push(&chunk(1, Some("b"), None));
        acc.push(&chunk(0, Some("a"), None));
        acc.push(&chunk(1, Some("b"), None));
        let completion = acc.finish();
        assert_eq!(completion.choices[0].index, 0);
        assert_eq!(completion.choices[0].message.content.as_deref(), Some("a"));
        assert_eq!(completion.choices[1].message.content.as_deref(), Some("bb"));
    }

    #[test]
    fn takes_usage_from_final_frame() {
        let mut acc = ChunkAccumulator::new();
        acc.push(&chunk(0, Some("Hi"), None));
        let mut last = chunk(0, None, Some("stop"));
        last.x_groq = Some(GroqExtension {
            id: Some("req_1".to_string()),
            usage: Some(Usage::new(10, 2)),
        });
        acc.push(&last);
        let completion = acc.finish();
        assert_eq!(completion.usage, Some(Usage::new(10, 2)));
    }

    #[test]
    fn frame_without_choices_yields_no_candidates() {
        let mut acc = ChunkAccumulator::new();
        let mut empty = chunk(0, None, None);
        empty.choices.clear();
        acc.push(&empty);
        let completion = acc.finish();
        assert!(completion.choices.is_empty());
    }

    #[test]
    fn empty_stream_has_no_choices() {
        let completion = ChunkAccumulator::new().finish();
        assert!(completion.choices.is_empty());
        assert!(completion.usage.is_none());
    }

    #[tokio::test]
    async fn collect_of_nothing_is_an_empty_completion() {
        let items: Vec<Result<ChatCompletionChunk>> = Vec::new();
        let completion = collect_stream(stream::iter(items), None).await.unwrap();
        assert!(completion.choices.is_empty());
    }

    #[tokio::test]
    async fn collect_stops_on_error() {
        let items = vec![
            Ok(chunk(0, Some("Hi"), None)),
            Err(Error::connection("reset by peer", None)),
            Ok(chunk(0, Some("!"), Some("stop"))),
        ];
        let result = collect_stream(stream::iter(items), None).await;
        assert!(result.unwrap_err().is_connection());
    }

    #[tokio::test]
    async fn collect_assembles_text() {
        let items = vec![
            Ok(chunk(0, Some("Hi"), None)),
            Ok(chunk(0, Some(" there!"), Some("stop"))),
        ];
        let completion = collect_stream(stream::iter(items), None).await.unwrap();
        assert_eq!(
            completion.choices[0].message.content.as_deref(),
            Some("Hi there!")
        );
    }
}
