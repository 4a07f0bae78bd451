//! Logging trait for provider client operations.
//!
//! This module provides the [`ClientLogger`] trait that allows users to capture
//! the responses passing through the [`crate::Groq`] client.  Requests are not
//! offered to the logger because they travel alongside the credential.

use crate::{ChatCompletion, ChatCompletionChunk};

/// A trait for logging provider responses.
///
/// Implement this trait to capture and record API interactions, including
/// both non-streaming responses and individual streamed chunks.
///
/// # Example
///
/// ```rust,ignore
/// use groqchat::{ChatCompletion, ChatCompletionChunk, ClientLogger};
/// use std::sync::Mutex;
///
/// struct FileLogger {
///     file: Mutex<std::fs::File>,
/// }
///
/// impl ClientLogger for FileLogger {
///     fn log_response(&self, completion: &ChatCompletion) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "Response: {}", serde_json::to_string(completion).unwrap()).unwrap();
///     }
///
///     fn log_stream_chunk(&self, chunk: &ChatCompletionChunk) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "Chunk: {}", serde_json::to_string(chunk).unwrap()).unwrap();
///     }
///
///     fn log_stream_completion(&self, completion: &ChatCompletion) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "Stream complete: {}", serde_json::to_string(completion).unwrap()).unwrap();
///     }
/// }
/// ```
pub trait ClientLogger: Send + Sync {
    /// Log a complete response from a non-streaming call.
    fn log_response(&self, completion: &ChatCompletion);

    /// Log an individual streamed chunk.
    fn log_stream_chunk(&self, chunk: &ChatCompletionChunk);

    /// Log the response reassembled from a completed stream.
    fn log_stream_completion(&self, completion: &ChatCompletion);
}
