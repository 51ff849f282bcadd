//! quilt-engine: Headless core for the quilt multi-pane chat client
//!
//! This crate provides the conversation-side logic for quilt, including:
//! - Slash-command parsing for draft submissions
//! - The ordered pane registry and activation rules
//! - The pane orchestrator driving create-then-deliver flows
//! - Draft input sizing
//! - The conversation lifecycle bridge and its durable store

pub mod bridge;
pub mod command;
pub mod config;
pub mod conversation;
pub mod orchestrator;
pub mod pane;
pub mod sizing;
pub mod store;

// Re-export commonly used types
pub use bridge::{BridgeError, ConversationBridge};
pub use command::{parse_submission, CommandInfo, Submission, COMMANDS};
pub use config::{ChatConfig, ConfigError, ConfigId, ConfigSet};
pub use conversation::{Conversation, ConversationId, Message, MessageId, Role};
pub use orchestrator::{Orchestrator, PaneNotice, SubmitOutcome};
pub use pane::{Pane, PaneId, PaneRegistry};
pub use sizing::{compute_input_size, InputSize, ViewportMetrics, MIN_HEIGHT};
pub use store::{ChatStore, StoreError};

/// Returns the engine version.
pub fn engine_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
