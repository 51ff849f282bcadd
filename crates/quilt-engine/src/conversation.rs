//! Conversation and message types.
//!
//! A conversation is one chat transcript; a pane displays at most one
//! conversation. Messages are created exclusively through the bridge's
//! send operation and ordered by their timestamp of arrival.

use crate::config::ConfigId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identity of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    /// Allocate a fresh identity.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ConversationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identity of a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Role of a message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Message typed by the user.
    User,
    /// Response from the remote side of the conversation.
    Assistant,
    /// Status or instruction text.
    System,
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Message identity.
    pub id: MessageId,
    /// Conversation this message belongs to.
    pub conversation_id: ConversationId,
    /// Role of the author.
    pub role: Role,
    /// Message body, verbatim as submitted.
    pub content: String,
    /// Ordering timestamp.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a new user message.
    pub fn user(conversation_id: ConversationId, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::generate(),
            conversation_id,
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a new assistant message.
    pub fn assistant(conversation_id: ConversationId, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::generate(),
            conversation_id,
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Label used when a conversation has no title yet.
const UNTITLED: &str = "New conversation";

/// A conversation record: title and configuration binding.
///
/// The title and configuration are mutated by collaborators through the
/// store; the orchestrator only ever reads them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Conversation identity.
    pub id: ConversationId,
    /// Display title; empty until set.
    #[serde(default)]
    pub title: String,
    /// Named configuration this conversation uses; `None` means default.
    #[serde(default)]
    pub config_id: Option<ConfigId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last updated timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a new conversation with an empty title.
    pub fn new(config_id: Option<ConfigId>) -> Self {
        let now = Utc::now();
        Self {
            id: ConversationId::generate(),
            title: String::new(),
            config_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Title to display, substituting a placeholder when empty.
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            UNTITLED
        } else {
            &self.title
        }
    }
}
