//! The boundary between the turn controller and a hosted completion API.

use std::sync::Arc;

use crate::credential::Credential;
use crate::error::Result;
use crate::types::{Completion, CompletionOptions, Message};

/// Something that can turn a conversation into completion candidates.
///
/// Implementations resolve any streaming internally: the returned
/// [`Completion`] always holds fully assembled text.  Every failure, whether
/// authentication, transport, quota, or a malformed reply, is reported as an
/// [`crate::Error`].
#[async_trait::async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Ask for completions of `messages`, authenticating with `credential`.
    async fn complete(
        &self,
        messages: &[Message],
        credential: &Credential,
        options: &CompletionOptions,
    ) -> Result<Completion>;
}

#[async_trait::async_trait]
impl<P: CompletionProvider + ?Sized> CompletionProvider for Arc<P> {
    async fn complete(
        &self,
        messages: &[Message],
        credential: &Credential,
        options: &CompletionOptions,
    ) -> Result<Completion> {
        (**self).complete(messages, credential, options).await
    }
}

#[async_trait::async_trait]
impl<P: CompletionProvider + ?Sized> CompletionProvider for Box<P> {
    async fn complete(
        &self,
        messages: &[Message],
        credential: &Credential,
        options: &CompletionOptions,
    ) -> Result<Completion> {
        (**self).complete(messages, credential, options).await
    }
}
