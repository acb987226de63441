//! Chat message model.

use serde::{Deserialize, Serialize};

use crate::chat::core::ids::{MessageId, Participant};

/// A single chat message.
///
/// The serialized form has exactly the fields `id`, `sender`, `receiver`,
/// `text` and `timestamp` (epoch milliseconds).
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier, immutable once assigned.
    pub id: MessageId,
    /// Originating participant.
    pub sender: Participant,
    /// Intended recipient.
    pub receiver: Participant,
    /// Content, replaced by edits.
    pub text: String,
    /// Creation time in milliseconds since Unix epoch. Edits leave it untouched.
    pub timestamp: i64,
}

impl Message {
    /// Whether this message belongs to the conversation between `a` and `b`,
    /// in either direction.
    #[must_use]
    pub fn is_between(&self, a: &Participant, b: &Participant) -> bool {
        (self.sender == *a && self.receiver == *b) || (self.sender == *b && self.receiver == *a)
    }

    /// Whether this message was sent by `from` to `to`.
    #[must_use]
    pub fn is_from_to(&self, from: &Participant, to: &Participant) -> bool {
        self.sender == *from && self.receiver == *to
    }

    /// The other side of the conversation as seen by `me`, if `me` takes part.
    #[must_use]
    pub fn counterpart(&self, me: &Participant) -> Option<&Participant> {
        if self.sender == *me {
            Some(&self.receiver)
        } else if self.receiver == *me {
            Some(&self.sender)
        } else {
            None
        }
    }
}
