//! Core chat types and identifiers.

pub mod clock;
pub mod config;
pub mod errors;
pub mod ids;
pub mod message;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ChatConfig, StorageBackend, StorageConfig};
pub use errors::{ChatError, ChatResult, ParticipantError, StorageError, StorageResult};
pub use ids::{EmploymentCode, MessageId, OtherToken, Participant};
pub use message::Message;
