//! The user-supplied API key.

use std::fmt;

use crate::error::{Error, Result};

/// An opaque secret used to authenticate to the completion provider.
///
/// The value lives only in memory.  `Debug` is redacted and there is no
/// `Display`, so the key cannot end up in a log line or an error message by
/// accident.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    secret: String,
}

impl Credential {
    /// Wrap a secret, rejecting blank input.
    ///
    /// Surrounding whitespace is stripped, since keys are usually pasted.
    pub fn new(secret: impl Into<String>) -> Result<Self> {
        let secret = secret.into();
        let trimmed = secret.trim();
        if trimmed.is_empty() {
            return Err(Error::validation(
                "credential must not be blank",
                Some("credential".to_string()),
            ));
        }
        Ok(Self {
            secret: trimmed.to_string(),
        })
    }

    /// The raw secret, for building the authorization header.
    pub fn expose(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}
