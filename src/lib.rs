// Public modules
pub mod accumulating_stream;
pub mod chat;
pub mod client;
pub mod client_logger;
pub mod conversation;
pub mod credential;
pub mod error;
pub mod provider;
pub mod session;
pub mod sse;
pub mod turn;
pub mod types;

mod observability;

// Re-exports
pub use accumulating_stream::{ChunkAccumulator, collect_stream};
pub use client::Groq;
pub use client_logger::ClientLogger;
pub use conversation::ConversationState;
pub use credential::Credential;
pub use error::{Error, ProviderErrorKind, Result};
pub use observability::register_biometrics;
pub use provider::CompletionProvider;
pub use session::{ChatSession, SessionStats};
pub use turn::{TurnController, TurnError, TurnOutcome};
pub use types::*;
