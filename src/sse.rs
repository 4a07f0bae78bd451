//! Server-Sent Events (SSE) processing for streaming responses.
//!
//! This module turns the raw byte stream of a streamed chat-completions
//! response into [`ChatCompletionChunk`] frames.  The stream ends at
//! `data: [DONE]` or when the connection closes.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;

use crate::observability::{STREAM_BYTES, STREAM_ERRORS, STREAM_EVENTS};
use crate::{ChatCompletionChunk, Error, Result};

/// Marker the provider sends after the last frame.
const DONE_MARKER: &str = "[DONE]";

/// What a single SSE frame turned out to be.
#[derive(Debug)]
enum Frame {
    /// Comments, keep-alives, and frames without data.
    Skip,
    /// The end-of-stream marker.
    Done,
    /// A parsed chunk or an error reported in-band.
    Chunk(Result<ChatCompletionChunk>),
}

struct SseState<S> {
    stream: S,
    buffer: String,
    pending: Vec<u8>,
    done: bool,
}

/// Process a stream of bytes into a stream of completion chunks.
///
/// Frames may be split across network reads, and multi-byte characters may
/// be split across reads as well.  Errors are yielded in place; the caller
/// decides whether to keep reading.
pub fn process_sse<S, E>(byte_stream: S) -> impl Stream<Item = Result<ChatCompletionChunk>>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: std::error::Error + Send + Sync + 'static,
{
    let state = SseState {
        stream: byte_stream,
        buffer: String::new(),
        pending: Vec::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        if state.done {
            return None;
        }
        loop {
            // First drain complete frames already in the buffer.
            while let Some((frame, rest)) = split_frame(&state.buffer) {
                state.buffer = rest;
                match parse_frame(&frame) {
                    Frame::Skip => continue,
                    Frame::Done => return None,
                    Frame::Chunk(chunk) => return Some((count(chunk), state)),
                }
            }

            match state.stream.next().await {
                Some(Ok(bytes)) => {
                    STREAM_BYTES.count(bytes.len() as u64);
                    if let Err(err) = push_bytes(&mut state, &bytes) {
                        state.done = true;
                        return Some((count(Err(err)), state));
                    }
                }
                Some(Err(err)) => {
                    state.done = true;
                    let err =
                        Error::streaming(format!("Error in HTTP stream: {err}"), Some(Box::new(err)));
                    return Some((count(Err(err)), state));
                }
                None => {
                    // The connection closed; a trailing frame may lack its blank line.
                    state.done = true;
                    let trailing = std::mem::take(&mut state.buffer).replace('\r', "\n");
                    return match parse_frame(&trailing) {
                        Frame::Chunk(chunk) => Some((count(chunk), state)),
                        Frame::Skip | Frame::Done => None,
                    };
                }
            }
        }
    })
}

fn count(chunk: Result<ChatCompletionChunk>) -> Result<ChatCompletionChunk> {
    match &chunk {
        Ok(_) => STREAM_EVENTS.click(),
        Err(_) => STREAM_ERRORS.click(),
    }
    chunk
}

/// Append raw bytes to the text buffer, holding back an incomplete trailing
/// UTF-8 sequence until the rest of it arrives.
fn push_bytes<S>(state: &mut SseState<S>, bytes: &[u8]) -> Result<()> {
    state.pending.extend_from_slice(bytes);
    let valid_up_to = match std::str::from_utf8(&state.pending) {
        Ok(text) => {
            state.buffer.push_str(text);
            state.pending.clear();
            normalize_newlines(&mut state.buffer);
            return Ok(());
        }
        Err(err) if err.error_len().is_none() => err.valid_up_to(),
        Err(err) => {
            return Err(Error::encoding(
                format!("Invalid UTF-8 in stream: {err}"),
                Some(Box::new(err)),
            ));
        }
    };
    let tail = state.pending.split_off(valid_up_to);
    // The prefix was validated just above.
    let text = String::from_utf8(std::mem::replace(&mut state.pending, tail))
        .map_err(|err| Error::encoding(format!("Invalid UTF-8 in stream: {err}"), Some(Box::new(err))))?;
    state.buffer.push_str(&text);
    normalize_newlines(&mut state.buffer);
    Ok(())
}

/// Rewrite CRLF and lone CR line endings as LF. A trailing CR stays put
/// because its LF may still be in flight.
fn normalize_newlines(buffer: &mut String) {
    if !buffer.contains('\r') {
        return;
    }
    let held = buffer.ends_with('\r');
    if held {
        buffer.pop();
    }
    let mut normalized = buffer.replace("\r\n", "\n").replace('\r', "\n");
    if held {
        normalized.push('\r');
    }
    *buffer = normalized;
}

/// Split the first complete frame off the buffer.
fn split_frame(buffer: &str) -> Option<(String, String)> {
    let (frame, rest) = buffer.split_once("\n\n")?;
    Some((frame.to_string(), rest.to_string()))
}

#[derive(Deserialize)]
struct StreamErrorBody {
    error: StreamErrorDetail,
}

#[derive(Deserialize)]
struct StreamErrorDetail {
    #[serde(rename = "type", default)]
    error_type: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Interpret one frame.
fn parse_frame(frame: &str) -> Frame {
    let mut event = None;
    let mut data: Vec<&str> = Vec::new();
    for line in frame.lines() {
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = line.split_once(':').unwrap_or((line, ""));
        let value = value.strip_prefix(' ').unwrap_or(value);
        match field {
            "event" => event = Some(value.trim()),
            "data" => data.push(value),
            // id and retry carry nothing this client uses.
            _ => {}
        }
    }
    if data.is_empty() {
        return Frame::Skip;
    }
    let data = data.join("\n");
    let data = data.trim();
    if data == DONE_MARKER {
        return Frame::Done;
    }

    let value: serde_json::Value = match serde_json::from_str(data) {
        Ok(value) => value,
        Err(e) => {
            if event == Some("error") {
                return Frame::Chunk(Err(Error::api(
                    500,
                    Some("stream_error".to_string()),
                    data.to_string(),
                    None,
                )));
            }
            return Frame::Chunk(Err(Error::serialization(
                format!("Failed to parse event JSON: {e}"),
                Some(Box::new(e)),
            )));
        }
    };

    if event == Some("error") || value.get("error").is_some() {
        return Frame::Chunk(Err(stream_error(data, value)));
    }

    Frame::Chunk(serde_json::from_value::<ChatCompletionChunk>(value).map_err(|e| {
        Error::serialization(format!("Failed to parse chunk: {e}"), Some(Box::new(e)))
    }))
}

fn stream_error(raw: &str, value: serde_json::Value) -> Error {
    match serde_json::from_value::<StreamErrorBody>(value) {
        Ok(body) => Error::api(
            500,
            body.error.error_type.or_else(|| Some("stream_error".to_string())),
            body.error.message.unwrap_or_else(|| raw.to_string()),
            None,
        ),
        Err(_) => Error::api(500, Some("stream_error".to_string()), raw.to_string(), None),
    }
}
