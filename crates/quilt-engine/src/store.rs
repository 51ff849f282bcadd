//! Durable conversation store backing the bridge.
//!
//! Conversations are kept in memory and, when a data directory is
//! configured, mirrored to one JSONL file each: a metadata line followed
//! by one line per message. The configuration list lives next to them as
//! a single JSON document. Record updates fan out over watch channels so
//! dependents re-observe instead of re-fetching.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::bridge::{BridgeError, ConversationBridge};
use crate::config::{ChatConfig, ConfigError, ConfigId, ConfigSet};
use crate::conversation::{Conversation, ConversationId, Message};

const CONVERSATIONS_DIR: &str = "conversations";
const CONFIGS_FILE: &str = "configs.json";

/// Errors that can occur in store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialize(#[source] serde_json::Error),

    /// JSON parse error.
    #[error("Parse error: {0}")]
    Parse(#[source] serde_json::Error),

    /// Conversation file with no metadata line.
    #[error("Conversation file is empty: {0}")]
    EmptyFile(PathBuf),

    /// Configuration list error.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

struct Entry {
    record_tx: watch::Sender<Conversation>,
    messages: Vec<Message>,
}

#[derive(Default)]
struct Inner {
    conversations: HashMap<ConversationId, Entry>,
    /// Creation order, oldest first.
    order: Vec<ConversationId>,
}

/// In-memory conversation store with optional JSONL persistence.
pub struct ChatStore {
    inner: Mutex<Inner>,
    configs_tx: watch::Sender<Vec<ChatConfig>>,
    data_dir: Option<PathBuf>,
}

impl ChatStore {
    /// A store with no persistence, for tests and ephemeral sessions.
    pub fn in_memory() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            configs_tx: watch::channel(Vec::new()).0,
            data_dir: None,
        }
    }

    /// Open a store rooted at `data_dir`, loading whatever is there.
    ///
    /// Unreadable conversation files are skipped with a warning rather
    /// than failing the whole open.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let data_dir = data_dir.into();

        let configs = match ConfigSet::load(&data_dir.join(CONFIGS_FILE)) {
            Ok(set) => set.configs,
            Err(ConfigError::Io(_)) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "unreadable configuration list, starting empty");
                Vec::new()
            }
        };

        let mut loaded: Vec<(Conversation, Vec<Message>)> = Vec::new();
        let conversations_dir = data_dir.join(CONVERSATIONS_DIR);
        if conversations_dir.exists() {
            for dir_entry in std::fs::read_dir(&conversations_dir)? {
                let path = dir_entry?.path();
                if path.extension().is_some_and(|ext| ext == "jsonl") {
                    match load_conversation_file(&path) {
                        Ok(pair) => loaded.push(pair),
                        Err(e) => {
                            warn!(path = %path.display(), error = %e, "skipping conversation file");
                        }
                    }
                }
            }
        }
        loaded.sort_by(|a, b| a.0.created_at.cmp(&b.0.created_at));

        let mut inner = Inner::default();
        for (record, messages) in loaded {
            let id = record.id.clone();
            inner.conversations.insert(
                id.clone(),
                Entry {
                    record_tx: watch::channel(record).0,
                    messages,
                },
            );
            inner.order.push(id);
        }

        Ok(Self {
            inner: Mutex::new(inner),
            configs_tx: watch::channel(configs).0,
            data_dir: Some(data_dir),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// All conversation records in creation order.
    pub fn conversations(&self) -> Vec<Conversation> {
        let inner = self.lock();
        inner
            .order
            .iter()
            .filter_map(|id| inner.conversations.get(id))
            .map(|entry| entry.record_tx.borrow().clone())
            .collect()
    }

    /// Current configuration list snapshot.
    pub fn configs(&self) -> Vec<ChatConfig> {
        self.configs_tx.borrow().clone()
    }

    /// Replace the configuration list (collaborator-facing mutation).
    pub fn set_configs(&self, configs: Vec<ChatConfig>) -> Result<(), StoreError> {
        if let Some(dir) = &self.data_dir {
            ConfigSet {
                configs: configs.clone(),
            }
            .save(&dir.join(CONFIGS_FILE))?;
        }
        self.configs_tx.send_replace(configs);
        Ok(())
    }

    /// Retitle a conversation (collaborator-facing mutation).
    pub fn set_conversation_title(
        &self,
        conversation: &ConversationId,
        title: impl Into<String>,
    ) -> Result<(), BridgeError> {
        let mut inner = self.lock();
        let entry = inner
            .conversations
            .get_mut(conversation)
            .ok_or_else(|| BridgeError::UnknownConversation(conversation.clone()))?;
        entry.record_tx.send_modify(|record| {
            record.title = title.into();
            record.updated_at = Utc::now();
        });
        let record = entry.record_tx.borrow().clone();
        let messages = entry.messages.clone();
        drop(inner);

        self.persist(&record, &messages).map_err(BridgeError::from)
    }

    /// Write one conversation out; a no-op without a data directory.
    fn persist(&self, record: &Conversation, messages: &[Message]) -> Result<(), StoreError> {
        let Some(data_dir) = &self.data_dir else {
            return Ok(());
        };
        let dir = data_dir.join(CONVERSATIONS_DIR);
        std::fs::create_dir_all(&dir)?;

        let path = dir.join(format!("{}.jsonl", record.id));
        let mut file = std::fs::File::create(&path)?;

        // Metadata as first line, then each message
        let meta = serde_json::to_string(record).map_err(StoreError::Serialize)?;
        writeln!(file, "{meta}")?;
        for message in messages {
            let line = serde_json::to_string(message).map_err(StoreError::Serialize)?;
            writeln!(file, "{line}")?;
        }

        Ok(())
    }
}

/// Load a conversation from a JSONL file.
fn load_conversation_file(path: &Path) -> Result<(Conversation, Vec<Message>), StoreError> {
    let content = std::fs::read_to_string(path)?;
    let mut lines = content.lines();

    let meta_line = lines
        .next()
        .ok_or_else(|| StoreError::EmptyFile(path.to_path_buf()))?;
    let record: Conversation = serde_json::from_str(meta_line).map_err(StoreError::Parse)?;

    let mut messages = Vec::new();
    for line in lines {
        if !line.trim().is_empty() {
            let message: Message = serde_json::from_str(line).map_err(StoreError::Parse)?;
            messages.push(message);
        }
    }

    Ok((record, messages))
}

#[async_trait]
impl ConversationBridge for ChatStore {
    async fn create_conversation(
        &self,
        inherited_config: Option<ConfigId>,
    ) -> Result<ConversationId, BridgeError> {
        let record = Conversation::new(inherited_config);
        let id = record.id.clone();

        // Commit durably before the record channel goes live; once this
        // returns, a subscriber established here observes every message.
        self.persist(&record, &[])?;

        let mut inner = self.lock();
        inner.conversations.insert(
            id.clone(),
            Entry {
                record_tx: watch::channel(record).0,
                messages: Vec::new(),
            },
        );
        inner.order.push(id.clone());
        drop(inner);

        debug!(conversation = %id, "conversation created");
        Ok(id)
    }

    async fn send_message(
        &self,
        conversation: &ConversationId,
        text: &str,
    ) -> Result<(), BridgeError> {
        let mut inner = self.lock();
        let entry = inner
            .conversations
            .get_mut(conversation)
            .ok_or_else(|| BridgeError::UnknownConversation(conversation.clone()))?;
        entry.messages.push(Message::user(conversation.clone(), text));
        entry
            .record_tx
            .send_modify(|record| record.updated_at = Utc::now());
        let record = entry.record_tx.borrow().clone();
        let messages = entry.messages.clone();
        drop(inner);

        if let Err(e) = self.persist(&record, &messages) {
            warn!(conversation = %conversation, error = %e, "failed to persist message");
            return Err(e.into());
        }
        Ok(())
    }

    async fn set_conversation_config(
        &self,
        conversation: &ConversationId,
        config: Option<ConfigId>,
    ) -> Result<(), BridgeError> {
        let mut inner = self.lock();
        let entry = inner
            .conversations
            .get_mut(conversation)
            .ok_or_else(|| BridgeError::UnknownConversation(conversation.clone()))?;
        entry.record_tx.send_modify(|record| {
            record.config_id = config;
            record.updated_at = Utc::now();
        });
        let record = entry.record_tx.borrow().clone();
        let messages = entry.messages.clone();
        drop(inner);

        self.persist(&record, &messages).map_err(BridgeError::from)
    }

    fn watch_conversation(
        &self,
        conversation: &ConversationId,
    ) -> Result<watch::Receiver<Conversation>, BridgeError> {
        let inner = self.lock();
        inner
            .conversations
            .get(conversation)
            .map(|entry| entry.record_tx.subscribe())
            .ok_or_else(|| BridgeError::UnknownConversation(conversation.clone()))
    }

    fn watch_configs(&self) -> watch::Receiver<Vec<ChatConfig>> {
        self.configs_tx.subscribe()
    }

    fn messages(&self, conversation: &ConversationId) -> Vec<Message> {
        let inner = self.lock();
        inner
            .conversations
            .get(conversation)
            .map(|entry| entry.messages.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Role;

    #[tokio::test]
    async fn test_create_then_send_is_observable() {
        let store = ChatStore::in_memory();
        let id = store.create_conversation(None).await.unwrap();

        // A subscription taken right after creation sees the record
        let rx = store.watch_conversation(&id).unwrap();
        assert_eq!(rx.borrow().id, id);

        store.send_message(&id, "first").await.unwrap();
        let messages = store.messages(&id);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "first");
        assert_eq!(messages[0].role, Role::User);
    }

    #[tokio::test]
    async fn test_send_to_unknown_conversation_fails() {
        let store = ChatStore::in_memory();
        let ghost = ConversationId::generate();
        let result = store.send_message(&ghost, "hello").await;
        assert!(matches!(result, Err(BridgeError::UnknownConversation(_))));
    }

    #[tokio::test]
    async fn test_config_change_reaches_subscribers() {
        let store = ChatStore::in_memory();
        let id = store.create_conversation(None).await.unwrap();
        let mut rx = store.watch_conversation(&id).unwrap();

        let config = ConfigId::generate();
        store
            .set_conversation_config(&id, Some(config.clone()))
            .await
            .unwrap();

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().config_id, Some(config));
    }

    #[tokio::test]
    async fn test_title_change_reaches_subscribers() {
        let store = ChatStore::in_memory();
        let id = store.create_conversation(None).await.unwrap();
        let mut rx = store.watch_conversation(&id).unwrap();

        store.set_conversation_title(&id, "Groceries").unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().title, "Groceries");
    }

    #[tokio::test]
    async fn test_inherited_config_lands_on_record() {
        let store = ChatStore::in_memory();
        let config = ConfigId::generate();
        let id = store
            .create_conversation(Some(config.clone()))
            .await
            .unwrap();
        let rx = store.watch_conversation(&id).unwrap();
        assert_eq!(rx.borrow().config_id, Some(config));
    }

    #[tokio::test]
    async fn test_persistence_roundtrip() {
        let dir = tempfile::tempdir().unwrap();

        let first;
        let second;
        {
            let store = ChatStore::open(dir.path()).unwrap();
            first = store.create_conversation(None).await.unwrap();
            store.send_message(&first, "one").await.unwrap();
            store.send_message(&first, "two").await.unwrap();
            store.set_conversation_title(&first, "First").unwrap();

            second = store.create_conversation(None).await.unwrap();
            store.send_message(&second, "hello").await.unwrap();
        }

        let reopened = ChatStore::open(dir.path()).unwrap();
        let records = reopened.conversations();
        assert_eq!(records.len(), 2);
        // Creation order survives the reload
        assert_eq!(records[0].id, first);
        assert_eq!(records[0].title, "First");
        assert_eq!(records[1].id, second);

        let messages = reopened.messages(&first);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "one");
        assert_eq!(messages[1].content, "two");
    }

    #[tokio::test]
    async fn test_corrupt_conversation_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = ChatStore::open(dir.path()).unwrap();
            let id = store.create_conversation(None).await.unwrap();
            store.send_message(&id, "keep me").await.unwrap();
        }
        std::fs::write(
            dir.path().join(CONVERSATIONS_DIR).join("broken.jsonl"),
            "not json\n",
        )
        .unwrap();

        let reopened = ChatStore::open(dir.path()).unwrap();
        assert_eq!(reopened.conversations().len(), 1);
    }

    #[test]
    fn test_set_configs_notifies_watchers() {
        let store = ChatStore::in_memory();
        let rx = store.watch_configs();
        assert!(rx.borrow().is_empty());

        store
            .set_configs(vec![ChatConfig::titled("Research")])
            .unwrap();
        assert_eq!(rx.borrow().len(), 1);
        assert_eq!(store.configs()[0].title, "Research");
    }
}
