//! Conversation transcript for the current session

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who said it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person speaking to the assistant
    User,
    /// The assistant's reply
    Assistant,
}

/// One line of the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    /// Speaker
    pub role: Role,
    /// Text as dispatched or spoken
    pub content: String,
    /// When it was recorded
    pub timestamp: DateTime<Utc>,
}

/// Append-only session log, cleared when the assistant closes
#[derive(Debug, Default, Clone)]
pub struct ConversationHistory {
    messages: Vec<ConversationMessage>,
}

impl ConversationHistory {
    /// Empty history
    #[must_use]
    pub const fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    /// Record what the user said
    pub fn push_user(&mut self, content: impl Into<String>) -> &ConversationMessage {
        self.push(Role::User, content.into())
    }

    /// Record the assistant's reply
    pub fn push_assistant(&mut self, content: impl Into<String>) -> &ConversationMessage {
        self.push(Role::Assistant, content.into())
    }

    fn push(&mut self, role: Role, content: String) -> &ConversationMessage {
        self.messages.push(ConversationMessage {
            role,
            content,
            timestamp: Utc::now(),
        });
        &self.messages[self.messages.len() - 1]
    }

    /// All messages, oldest first
    #[must_use]
    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    /// Most recent message
    #[must_use]
    pub fn last(&self) -> Option<&ConversationMessage> {
        self.messages.last()
    }

    /// Number of messages
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether nothing has been said
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Forget the whole conversation
    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
