//! Error types for the chat subsystem.

use thiserror::Error;

/// Errors raised by a [`LocalStorage`](crate::chat::storage::LocalStorage) backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// `SQLite` storage error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// The value does not fit in the remaining storage quota.
    #[error("storage quota exceeded writing {key}: need {needed} bytes, quota is {quota}")]
    QuotaExceeded {
        /// Key being written.
        key: String,
        /// Bytes the store would hold after the write.
        needed: usize,
        /// Configured quota in bytes.
        quota: usize,
    },
}

/// Convenience result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors returned when parsing a participant identifier or employment code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParticipantError {
    /// Empty (or whitespace-only) identifier.
    #[error("participant identifier must not be empty")]
    Empty,
    /// Exceeds the maximum accepted length.
    #[error("identifier too long: got {got}, max {max}")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
        /// Actual length received.
        got: usize,
    },
    /// Contains a disallowed character.
    #[error("identifier contains invalid character {ch:?} at index {index}")]
    InvalidChar {
        /// The invalid character.
        ch: char,
        /// The index where it was found.
        index: usize,
    },
}

/// Chat subsystem error type.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Invalid configuration or unsupported values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    /// Invalid participant identifier.
    #[error("invalid participant: {0}")]
    Participant(#[from] ParticipantError),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// An operation needed a logged-in participant.
    #[error("no participant is logged in")]
    NoActiveUser,
}

/// Convenience result alias for chat operations.
pub type ChatResult<T> = Result<T, ChatError>;
