//! The conversation lifecycle seam between the orchestrator and storage.
//!
//! The orchestrator never talks to storage directly; it goes through this
//! trait so the flows stay testable against an in-memory store. Live
//! reads are watch channels: consumers register interest once and observe
//! updates instead of polling.

use crate::config::{ChatConfig, ConfigId};
use crate::conversation::{Conversation, ConversationId, Message};
use crate::store::StoreError;
use async_trait::async_trait;
use tokio::sync::watch;

/// Errors surfaced across the bridge.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The conversation does not exist (or no longer exists).
    #[error("unknown conversation {0}")]
    UnknownConversation(ConversationId),

    /// The underlying store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Asynchronous conversation lifecycle and delivery operations.
///
/// `create_conversation` resolves only once the conversation is durably
/// created and its record channel is observable: callers may deliver the
/// first message the moment it returns. There is no timer-based deferral
/// anywhere in this contract.
#[async_trait]
pub trait ConversationBridge: Send + Sync {
    /// Create a conversation, optionally inheriting a configuration.
    ///
    /// Suspends until the record is committed and observation-ready.
    async fn create_conversation(
        &self,
        inherited_config: Option<ConfigId>,
    ) -> Result<ConversationId, BridgeError>;

    /// Append a user message to a conversation.
    ///
    /// Suspends until the message is enqueued; may fail.
    async fn send_message(
        &self,
        conversation: &ConversationId,
        text: &str,
    ) -> Result<(), BridgeError>;

    /// Point a conversation at a named configuration; `None` means default.
    async fn set_conversation_config(
        &self,
        conversation: &ConversationId,
        config: Option<ConfigId>,
    ) -> Result<(), BridgeError>;

    /// Live view of one conversation's record (title, configuration).
    fn watch_conversation(
        &self,
        conversation: &ConversationId,
    ) -> Result<watch::Receiver<Conversation>, BridgeError>;

    /// Live view of the named-configuration list.
    fn watch_configs(&self) -> watch::Receiver<Vec<ChatConfig>>;

    /// Snapshot of a conversation's messages in delivery order.
    fn messages(&self, conversation: &ConversationId) -> Vec<Message>;
}
