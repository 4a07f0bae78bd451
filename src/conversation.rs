//! Append-only conversation history.

use std::slice;

use crate::error::{Error, Result};
use crate::types::{Message, Role};

/// The ordered messages of one session.
///
/// Messages are only ever appended.  There is no removal and no in-place
/// edit; a session that wants a fresh history makes a new state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationState {
    messages: Vec<Message>,
}

impl ConversationState {
    /// An empty conversation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message at the tail.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the content is blank; the state is left
    /// untouched in that case.
    pub fn append(&mut self, message: Message) -> Result<()> {
        if message.is_blank() {
            return Err(Error::validation(
                format!("cannot append a blank {} message", message.role()),
                Some("content".to_string()),
            ));
        }
        self.messages.push(message);
        Ok(())
    }

    /// Every message in insertion order.
    ///
    /// The iterator is finite and can be cloned to restart it; calling this
    /// twice without an append in between yields the same sequence.
    pub fn all(&self) -> slice::Iter<'_, Message> {
        self.messages.iter()
    }

    /// The messages as a slice, for handing to a provider.
    pub fn as_slice(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True if nothing has been appended yet.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The most recent message.
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Number of messages authored by `role`.
    pub fn count_role(&self, role: Role) -> usize {
        self.messages.iter().filter(|m| m.role() == role).count()
    }
}

impl<'a> IntoIterator for &'a ConversationState {
    type Item = &'a Message;
    type IntoIter = slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_is_empty() {
        let state = ConversationState::new();
        assert!(state.is_empty());
        assert_eq!(state.len(), 0);
        assert_eq!(state.all().count(), 0);
        assert!(state.last().is_none());
    }

    #[test]
    fn append_preserves_order() {
        let mut state = ConversationState::new();
        state.append(Message::user("one")).unwrap();
        state.append(Message::assistant("two")).unwrap();
        state.append(Message::user("three")).unwrap();

        let contents: Vec<&str> = state.all().map(Message::content).collect();
        assert_eq!(contents, vec!["one", "two", "three"]);
        assert_eq!(state.last(), Some(&Message::user("three")));
        assert_eq!(state.count_role(Role::User), 2);
        assert_eq!(state.count_role(Role::Assistant), 1);
    }

    #[test]
    fn blank_append_is_rejected() {
        let mut state = ConversationState::new();
        state.append(Message::user("hello")).unwrap();
        let err = state.append(Message::assistant("  ")).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn reading_twice_is_identical() {
        let mut state = ConversationState::new();
        state.append(Message::user("Hello")).unwrap();
        state.append(Message::assistant("Hi there!")).unwrap();

        let first: Vec<Message> = state.all().cloned().collect();
        let second: Vec<Message> = state.all().cloned().collect();
        assert_eq!(first, second);

        let iter = state.all();
        let restarted = iter.clone();
        assert!(iter.eq(restarted));
    }

    #[test]
    fn iterates_by_reference() {
        let mut state = ConversationState::new();
        state.append(Message::user("Hello")).unwrap();
        let mut seen = 0;
        for message in &state {
            assert_eq!(message.role(), Role::User);
            seen += 1;
        }
        assert_eq!(seen, 1);
        assert_eq!(state.as_slice().len(), 1);
    }
}
