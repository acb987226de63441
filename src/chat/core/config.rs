//! Configuration for the chat subsystem.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::chat::core::errors::{ChatError, ChatResult};

/// Top-level configuration for the chat store.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Storage settings.
    pub storage: StorageConfig,
    /// `tracing` filter directive used by the binary.
    pub log_filter: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            log_filter: "info".to_string(),
        }
    }
}

impl ChatConfig {
    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> ChatResult<()> {
        if self.storage.messages_key.trim().is_empty() {
            return Err(ChatError::InvalidConfig(
                "storage.messages_key must not be empty".to_string(),
            ));
        }

        if self.storage.read_markers_key.trim().is_empty() {
            return Err(ChatError::InvalidConfig(
                "storage.read_markers_key must not be empty".to_string(),
            ));
        }

        if self.storage.messages_key == self.storage.read_markers_key {
            return Err(ChatError::InvalidConfig(
                "storage.messages_key and storage.read_markers_key must differ".to_string(),
            ));
        }

        if !is_valid_table_name(&self.storage.table) {
            return Err(ChatError::InvalidConfig(format!(
                "storage.table {:?} is not a valid table name",
                self.storage.table
            )));
        }

        match &self.storage.backend {
            StorageBackend::Memory {
                quota_bytes: Some(0),
            } => {
                return Err(ChatError::InvalidConfig(
                    "storage.backend.quota_bytes must be > 0".to_string(),
                ));
            }
            StorageBackend::Sqlite { path } if path.as_os_str().is_empty() => {
                return Err(ChatError::InvalidConfig(
                    "storage.backend.path must not be empty".to_string(),
                ));
            }
            _ => {}
        }

        Ok(())
    }
}

/// Table names are interpolated into SQL, so only plain identifiers pass.
fn is_valid_table_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Where the key/value storage lives.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StorageBackend {
    /// Process memory only; lost when the process exits.
    Memory {
        /// Optional cap on the total size of stored values, in bytes.
        quota_bytes: Option<usize>,
    },
    /// `SQLite` database on disk.
    Sqlite {
        /// Database file path.
        path: PathBuf,
    },
}

/// Storage configuration for chat data.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend selection.
    pub backend: StorageBackend,
    /// Key/value table name for the `SQLite` backend.
    pub table: String,
    /// Key holding the message log.
    pub messages_key: String,
    /// Key holding read markers.
    pub read_markers_key: String,
}

impl StorageConfig {
    /// Default key of the message log.
    pub const DEFAULT_MESSAGES_KEY: &'static str = "ems_chat_messages";
    /// Default key of the read markers.
    pub const DEFAULT_READ_MARKERS_KEY: &'static str = "ems_chat_read_markers";
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite {
                path: PathBuf::from("ems_chat.sqlite"),
            },
            table: "local_storage".to_string(),
            messages_key: Self::DEFAULT_MESSAGES_KEY.to_string(),
            read_markers_key: Self::DEFAULT_READ_MARKERS_KEY.to_string(),
        }
    }
}
