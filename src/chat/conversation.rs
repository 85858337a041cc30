//! The append-only record of a conversation.

use crate::types::{ChatMessage, MessageRole};

/// Ordered, append-only list of user and assistant turns.
///
/// Entries are never edited or removed.  System messages are rejected; they
/// belong to requests, not to the conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationLog {
    messages: Vec<ChatMessage>,
}

impl ConversationLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message and returns a reference to the stored entry.
    ///
    /// Returns `None`, leaving the log untouched, for system messages.
    pub fn push(&mut self, message: ChatMessage) -> Option<&ChatMessage> {
        if message.role == MessageRole::System {
            return None;
        }
        self.messages.push(message);
        self.messages.last()
    }

    /// All messages, oldest first.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True when nothing has been said yet.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of messages with the given role.
    pub fn count(&self, role: MessageRole) -> usize {
        self.messages.iter().filter(|m| m.role == role).count()
    }

    /// The most recent message.
    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }
}
