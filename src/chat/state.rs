//! Application context: the conversation store plus the logged-in participant.

use tracing::{debug, info};

use crate::chat::core::errors::{ChatError, ChatResult};
use crate::chat::core::ids::{MessageId, Participant};
use crate::chat::core::message::Message;
use crate::chat::storage::LocalStorage;
use crate::chat::store::ConversationStore;

/// Handle passed to chat panels instead of a process-wide store.
pub struct ChatContext<S: LocalStorage> {
    store: ConversationStore<S>,
    current_user: Option<Participant>,
}

impl<S: LocalStorage> ChatContext<S> {
    /// Wrap a loaded store with nobody logged in.
    #[must_use]
    pub const fn new(store: ConversationStore<S>) -> Self {
        Self {
            store,
            current_user: None,
        }
    }

    /// Set the local participant.
    pub fn login(&mut self, participant: Participant) {
        info!("{participant} logged in to chat");
        self.current_user = Some(participant);
    }

    /// Set the local participant from its string form (`admin-1`,
    /// `user-emp-{code}`, ...).
    ///
    /// # Errors
    /// Returns `ChatError::Participant` if `raw` is blank or too long; the
    /// previous participant stays logged in.
    pub fn login_as(&mut self, raw: &str) -> ChatResult<()> {
        let participant = Participant::parse(raw)?;
        self.login(participant);
        Ok(())
    }

    /// Clear the local participant.
    pub fn logout(&mut self) {
        if let Some(user) = self.current_user.take() {
            info!("{user} logged out of chat");
        }
    }

    /// The local participant.
    ///
    /// # Errors
    /// Returns `ChatError::NoActiveUser` if nobody is logged in.
    pub fn current_user(&self) -> ChatResult<&Participant> {
        self.current_user.as_ref().ok_or(ChatError::NoActiveUser)
    }

    /// Send `text` from the local participant to `to`.
    ///
    /// # Errors
    /// Returns `ChatError::NoActiveUser` if nobody is logged in.
    pub fn send(&mut self, to: Participant, text: impl Into<String>) -> ChatResult<Message> {
        let from = self.current_user()?.clone();
        Ok(self.store.append(from, to, text))
    }

    /// Conversation with `peer`, marking what `peer` sent as read.
    ///
    /// # Errors
    /// Returns `ChatError::NoActiveUser` if nobody is logged in.
    pub fn open_conversation(&mut self, peer: &Participant) -> ChatResult<Vec<Message>> {
        let me = self.current_user()?.clone();
        self.store.mark_read(&me, peer);
        Ok(self.store.conversation(&me, peer))
    }

    /// Edit a message the local participant sent.
    ///
    /// Returns `false` for unknown ids and for messages sent by someone else.
    ///
    /// # Errors
    /// Returns `ChatError::NoActiveUser` if nobody is logged in.
    pub fn edit_own(&mut self, id: &MessageId, text: impl Into<String>) -> ChatResult<bool> {
        if !self.owns(id)? {
            return Ok(false);
        }
        Ok(self.store.edit(id, text))
    }

    /// Delete a message the local participant sent.
    ///
    /// Returns `false` for unknown ids and for messages sent by someone else.
    ///
    /// # Errors
    /// Returns `ChatError::NoActiveUser` if nobody is logged in.
    pub fn delete_own(&mut self, id: &MessageId) -> ChatResult<bool> {
        if !self.owns(id)? {
            return Ok(false);
        }
        Ok(self.store.delete(id))
    }

    /// Coarse unread count of the local participant.
    ///
    /// # Errors
    /// Returns `ChatError::NoActiveUser` if nobody is logged in.
    pub fn inbox_count(&self) -> ChatResult<usize> {
        Ok(self.store.unread_count(self.current_user()?))
    }

    /// Borrow the store.
    #[must_use]
    pub const fn store(&self) -> &ConversationStore<S> {
        &self.store
    }

    /// Mutably borrow the store.
    pub const fn store_mut(&mut self) -> &mut ConversationStore<S> {
        &mut self.store
    }

    fn owns(&self, id: &MessageId) -> ChatResult<bool> {
        let me = self.current_user()?;
        let owned = self.store.get(id).is_some_and(|m| m.sender == *me);
        if !owned {
            debug!("{me} may not change message {id}");
        }
        Ok(owned)
    }
}
