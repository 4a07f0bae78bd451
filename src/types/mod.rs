// Public modules
pub mod chunk;
pub mod completion;
pub mod message;
pub mod model;
pub mod usage;

// Re-exports
pub use chunk::{ChatCompletionChunk, ChunkChoice, ChunkDelta, GroqExtension};
pub use completion::{
    Candidate, ChatCompletion, ChatCompletionRequest, ChatMessage, ChatRole, Choice, Completion,
    CompletionOptions,
};
pub use message::{Message, Role};
pub use model::{KnownModel, Model};
pub use usage::Usage;
