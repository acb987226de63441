//! Key/value storage backends for persisted chat state.

pub mod local_storage;
pub mod sqlite_storage;

pub use local_storage::{LocalStorage, MemoryStorage};
pub use sqlite_storage::SqliteStorage;

use crate::chat::core::config::{StorageBackend, StorageConfig};
use crate::chat::core::errors::StorageResult;

/// Open the backend selected by `config`.
///
/// # Errors
/// Returns an error if the `SQLite` database cannot be opened.
pub fn open_storage(config: &StorageConfig) -> StorageResult<Box<dyn LocalStorage>> {
    let storage: Box<dyn LocalStorage> = match &config.backend {
        StorageBackend::Memory { quota_bytes } => Box::new(
            quota_bytes.map_or_else(MemoryStorage::new, MemoryStorage::with_quota),
        ),
        StorageBackend::Sqlite { path } => Box::new(SqliteStorage::open(path, &config.table)?),
    };
    Ok(storage)
}
