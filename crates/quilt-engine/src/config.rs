//! Named chat configurations.
//!
//! A configuration is a preset a conversation can reference by id. The
//! list itself is maintained by collaborators; the engine only needs to
//! read it, persist it, and hand out live views of it.

use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// Opaque identity of a named configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigId(String);

impl ConfigId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ConfigId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for ConfigId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One named configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Configuration identity.
    pub id: ConfigId,
    /// Human-readable name shown in selection chrome.
    pub title: String,
}

impl ChatConfig {
    /// Create a configuration with a fresh id.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            id: ConfigId::generate(),
            title: title.into(),
        }
    }
}

/// The ordered list of named configurations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigSet {
    #[serde(default)]
    pub configs: Vec<ChatConfig>,
}

impl ConfigSet {
    /// A starter set with one general-purpose entry.
    pub fn seeded() -> Self {
        Self {
            configs: vec![ChatConfig::titled("General")],
        }
    }

    /// Look up a configuration by id.
    pub fn get(&self, id: &ConfigId) -> Option<&ChatConfig> {
        self.configs.iter().find(|c| &c.id == id)
    }

    /// Load the configuration list from a file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Parse)
    }

    /// Save the configuration list to a file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::Io)?;
        }
        std::fs::write(path, content).map_err(ConfigError::Io)
    }
}

/// Errors that can occur loading or saving configurations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[source] std::io::Error),

    /// JSON parse error.
    #[error("Parse error: {0}")]
    Parse(#[source] serde_json::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialize(#[source] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_set_has_general() {
        let set = ConfigSet::seeded();
        assert_eq!(set.configs.len(), 1);
        assert_eq!(set.configs[0].title, "General");
    }

    #[test]
    fn test_get_by_id() {
        let set = ConfigSet::seeded();
        let id = set.configs[0].id.clone();
        assert!(set.get(&id).is_some());
        assert!(set.get(&ConfigId::generate()).is_none());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("configs.json");

        let set = ConfigSet::seeded();
        set.save(&path).unwrap();

        let loaded = ConfigSet::load(&path).unwrap();
        assert_eq!(loaded.configs, set.configs);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = ConfigSet::load(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
