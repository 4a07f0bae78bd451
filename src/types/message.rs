use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Who authored a message in the conversation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person typing prompts.
    User,

    /// The language model.
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One entry of a conversation.
///
/// Messages are immutable once built: the fields are private and there are no
/// setters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message {
    role: Role,
    content: String,
}

impl Message {
    /// Create a message, rejecting content that is empty or only whitespace.
    pub fn new(role: Role, content: impl Into<String>) -> Result<Self> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(Error::validation(
                format!("{role} message content must not be blank"),
                Some("content".to_string()),
            ));
        }
        Ok(Self { role, content })
    }

    /// Create a user message without validating the content.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message without validating the content.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// The author of this message.
    pub fn role(&self) -> Role {
        self.role
    }

    /// The text of this message.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// True when the content is empty or only whitespace.
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn message_serializes_as_role_and_content() {
        let message = Message::user("Hello");
        assert_eq!(
            to_value(&message).unwrap(),
            json!({"role": "user", "content": "Hello"})
        );

        let message = Message::assistant("Hi there!");
        assert_eq!(
            to_value(&message).unwrap(),
            json!({"role": "assistant", "content": "Hi there!"})
        );
    }

    #[test]
    fn new_rejects_blank_content() {
        assert!(Message::new(Role::User, "").unwrap_err().is_validation());
        assert!(Message::new(Role::User, " \n\t").unwrap_err().is_validation());
        let message = Message::new(Role::Assistant, "ok").unwrap();
        assert_eq!(message.role(), Role::Assistant);
        assert_eq!(message.content(), "ok");
    }

    #[test]
    fn role_display() {
        assert_eq!(Role::User.to_string(), "user");
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }
}
