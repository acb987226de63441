//! Conversation store, read markers and their persistence.

pub mod conversation_store;
pub mod persistence;
pub mod read_markers;

pub use conversation_store::{ConversationStore, ConversationSummary};
pub use read_markers::{ReadMarker, ReadMarkers};
