//! Chat subsystem for the employee management console.
//!
//! This module is organized into:
//! - `core`: Configuration, errors, identifiers, messages and clocks
//! - `storage`: Key/value storage backends (in-memory, `SQLite`)
//! - `store`: The conversation store, read markers and JSON persistence
//! - `state`: Application context holding the store and the logged-in user

pub mod core;
pub mod state;
pub mod storage;
pub mod store;

pub use self::core::{
    ChatConfig, ChatError, ChatResult, Clock, EmploymentCode, ManualClock, Message, MessageId,
    OtherToken, Participant, ParticipantError, StorageBackend, StorageConfig, StorageError,
    StorageResult, SystemClock,
};
pub use state::ChatContext;
pub use storage::{LocalStorage, MemoryStorage, SqliteStorage, open_storage};
pub use store::{ConversationStore, ConversationSummary, ReadMarker, ReadMarkers};
