//! Write-through conversation store.
//!
//! The store owns the ordered message log. Insertion order is chronological
//! order: timestamps are assigned at append time and never go backwards, so
//! filtering the log preserves ordering without sorting. Every mutation
//! rewrites the full log to [`LocalStorage`]; a failed write is logged and
//! counted but never undoes the in-memory change.

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::chat::core::clock::{Clock, SystemClock};
use crate::chat::core::config::StorageConfig;
use crate::chat::core::ids::{MessageId, Participant};
use crate::chat::core::message::Message;
use crate::chat::storage::LocalStorage;
use crate::chat::store::persistence;
use crate::chat::store::read_markers::{ReadMarker, ReadMarkers};

/// Overview of one conversation as seen by a participant.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConversationSummary {
    /// The other side of the conversation.
    pub peer: Participant,
    /// Newest message in either direction.
    pub last_message: Message,
    /// Messages exchanged in either direction.
    pub message_count: usize,
    /// Messages from `peer` not yet covered by a read marker.
    pub unread: usize,
}

/// Authoritative ordered chat log with write-through persistence.
pub struct ConversationStore<S: LocalStorage> {
    storage: S,
    clock: Box<dyn Clock>,
    messages_key: String,
    read_markers_key: String,
    messages: Vec<Message>,
    read_markers: ReadMarkers,
    last_timestamp: Option<i64>,
    persistence_failures: u64,
}

impl<S: LocalStorage> ConversationStore<S> {
    /// Load the store from `storage` using the system clock.
    ///
    /// Absent or corrupt persisted data yields an empty log.
    #[must_use]
    pub fn load(storage: S, config: &StorageConfig) -> Self {
        Self::load_with_clock(storage, config, SystemClock)
    }

    /// Load the store from `storage`, stamping new messages with `clock`.
    #[must_use]
    pub fn load_with_clock(storage: S, config: &StorageConfig, clock: impl Clock + 'static) -> Self {
        let mut store = Self {
            storage,
            clock: Box::new(clock),
            messages_key: config.messages_key.clone(),
            read_markers_key: config.read_markers_key.clone(),
            messages: Vec::new(),
            read_markers: ReadMarkers::default(),
            last_timestamp: None,
            persistence_failures: 0,
        };
        store.reload();
        store
    }

    /// Replace in-memory state with what storage currently holds.
    ///
    /// Array elements that do not parse as a message are skipped; the rest of
    /// the log still loads.
    pub fn reload(&mut self) {
        let raw: Vec<Value> = persistence::load_or_default(&self.storage, &self.messages_key);
        self.messages = dedupe_ids(parse_messages(raw));
        self.read_markers = persistence::load_or_default(&self.storage, &self.read_markers_key);

        let newest = self.messages.iter().map(|m| m.timestamp).max();
        self.last_timestamp = self.last_timestamp.max(newest);

        info!(
            "Loaded {} chat messages and {} read markers",
            self.messages.len(),
            self.read_markers.len()
        );
    }

    // ----- mutations ---------------------------------------------------------

    /// Append a message from `sender` to `receiver` and persist the log.
    ///
    /// `text` is stored as given, including empty strings.
    pub fn append(
        &mut self,
        sender: Participant,
        receiver: Participant,
        text: impl Into<String>,
    ) -> Message {
        let timestamp = self.next_timestamp();
        let id = self.fresh_id(timestamp);
        let message = Message {
            id,
            sender,
            receiver,
            text: text.into(),
            timestamp,
        };

        debug!(
            "Appending message {} from {} to {}",
            message.id, message.sender, message.receiver
        );
        self.messages.push(message.clone());
        self.persist_messages();
        message
    }

    /// Replace the text of message `id`, keeping its timestamp and position.
    ///
    /// Returns `false` and leaves the log untouched if no message has that id.
    pub fn edit(&mut self, id: &MessageId, new_text: impl Into<String>) -> bool {
        let Some(message) = self.messages.iter_mut().find(|m| m.id == *id) else {
            debug!("Edit ignored, message {id} not found");
            return false;
        };
        message.text = new_text.into();
        debug!("Edited message {id}");
        self.persist_messages();
        true
    }

    /// Remove message `id` from the log.
    ///
    /// Read markers pointing at the message move back to the previous message
    /// in the same direction, or are dropped if there is none.
    ///
    /// Returns `false` and leaves the log untouched if no message has that id.
    pub fn delete(&mut self, id: &MessageId) -> bool {
        let Some(index) = self.messages.iter().position(|m| m.id == *id) else {
            debug!("Delete ignored, message {id} not found");
            return false;
        };
        self.messages.remove(index);
        debug!("Deleted message {id}");
        self.persist_messages();
        if self.retarget_read_markers(id, index) {
            self.persist_read_markers();
        }
        true
    }

    /// Drop every message and read marker, returning how many messages were removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.messages.len();
        self.messages.clear();
        self.read_markers.clear();
        info!("Cleared {removed} chat messages");
        self.persist_messages();
        if let Err(err) = self.storage.remove_item(&self.read_markers_key) {
            self.persistence_failures += 1;
            warn!(
                "Failed to remove read markers under {}: {err}",
                self.read_markers_key
            );
        }
        removed
    }

    /// Mark everything `peer` has sent to `reader` so far as read.
    ///
    /// Returns `false` if `peer` never sent `reader` anything.
    pub fn mark_read(&mut self, reader: &Participant, peer: &Participant) -> bool {
        let Some(newest) = self
            .messages
            .iter()
            .rev()
            .find(|m| m.is_from_to(peer, reader))
        else {
            return false;
        };

        let marker = ReadMarker {
            last_read_id: newest.id.clone(),
            last_read_at: newest.timestamp,
        };
        if self
            .read_markers
            .set(reader.clone(), peer.clone(), marker)
        {
            debug!("{reader} read conversation with {peer}");
            self.persist_read_markers();
        }
        true
    }

    // ----- queries -----------------------------------------------------------

    /// Messages between `a` and `b` in either direction, oldest first.
    #[must_use]
    pub fn conversation(&self, a: &Participant, b: &Participant) -> Vec<Message> {
        self.messages
            .iter()
            .filter(|m| m.is_between(a, b))
            .cloned()
            .collect()
    }

    /// Number of messages in the whole log addressed to `participant`.
    ///
    /// This ignores read markers; see [`Self::unread_from`] for the
    /// per-conversation count that does not.
    #[must_use]
    pub fn unread_count(&self, participant: &Participant) -> usize {
        self.messages
            .iter()
            .filter(|m| m.receiver == *participant)
            .count()
    }

    /// Messages from `peer` to `reader` that arrived after `reader` last read
    /// the conversation.
    #[must_use]
    pub fn unread_from(&self, reader: &Participant, peer: &Participant) -> usize {
        let incoming = self.messages.iter().filter(|m| m.is_from_to(peer, reader));

        let Some(marker) = self.read_markers.get(reader, peer) else {
            return incoming.count();
        };

        // A marker whose message is gone was left behind by another writer.
        let Some(marked_index) = self
            .messages
            .iter()
            .position(|m| m.id == marker.last_read_id)
        else {
            return incoming
                .filter(|m| m.timestamp > marker.last_read_at)
                .count();
        };

        self.messages[marked_index + 1..]
            .iter()
            .filter(|m| m.is_from_to(peer, reader))
            .count()
    }

    /// One summary per peer `participant` exchanged messages with, most
    /// recently active first.
    #[must_use]
    pub fn conversation_summaries(&self, participant: &Participant) -> Vec<ConversationSummary> {
        let mut by_peer: HashMap<&Participant, (usize, usize)> = HashMap::new();
        for (index, message) in self.messages.iter().enumerate() {
            if let Some(peer) = message.counterpart(participant) {
                let entry = by_peer.entry(peer).or_insert((index, 0));
                entry.0 = index;
                entry.1 += 1;
            }
        }

        let mut rows: Vec<(usize, ConversationSummary)> = by_peer
            .into_iter()
            .map(|(peer, (last_index, message_count))| {
                (
                    last_index,
                    ConversationSummary {
                        peer: peer.clone(),
                        last_message: self.messages[last_index].clone(),
                        message_count,
                        unread: self.unread_from(participant, peer),
                    },
                )
            })
            .collect();
        rows.sort_unstable_by_key(|(last_index, _)| Reverse(*last_index));
        rows.into_iter().map(|(_, summary)| summary).collect()
    }

    /// Look up a message by id.
    #[must_use]
    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == *id)
    }

    /// The full log, oldest first.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages in the log.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the log is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of write-throughs that failed since the store was created.
    #[must_use]
    pub const fn persistence_failures(&self) -> u64 {
        self.persistence_failures
    }

    /// Borrow the underlying storage.
    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Consume the store and return its storage.
    #[must_use]
    pub fn into_storage(self) -> S {
        self.storage
    }

    // ----- internals ---------------------------------------------------------

    /// Wall-clock time, clamped so it never precedes an earlier message.
    fn next_timestamp(&mut self) -> i64 {
        let now = self.clock.now_ms();
        let timestamp = self.last_timestamp.map_or(now, |last| now.max(last));
        self.last_timestamp = Some(timestamp);
        timestamp
    }

    fn fresh_id(&self, timestamp: i64) -> MessageId {
        loop {
            let id = MessageId::generate(timestamp);
            if self.get(&id).is_none() {
                return id;
            }
        }
    }

    /// Point markers that referenced the message removed at `index` at the
    /// previous message in their direction. Returns `true` if any changed.
    fn retarget_read_markers(&mut self, deleted: &MessageId, index: usize) -> bool {
        let pairs = self.read_markers.pointing_at(deleted);
        for (reader, peer) in &pairs {
            let previous = self.messages[..index]
                .iter()
                .rev()
                .find(|m| m.is_from_to(peer, reader))
                .map(|m| ReadMarker {
                    last_read_id: m.id.clone(),
                    last_read_at: m.timestamp,
                });
            let Some(marker) = previous else {
                self.read_markers.remove(reader, peer);
                continue;
            };
            self.read_markers.set(reader.clone(), peer.clone(), marker);
        }
        !pairs.is_empty()
    }

    fn persist_messages(&mut self) {
        if let Err(err) = persistence::save(&mut self.storage, &self.messages_key, &self.messages) {
            self.persistence_failures += 1;
            warn!(
                "Failed to persist {} chat messages under {}, keeping in-memory log: {err}",
                self.messages.len(),
                self.messages_key
            );
        }
    }

    fn persist_read_markers(&mut self) {
        if let Err(err) =
            persistence::save(&mut self.storage, &self.read_markers_key, &self.read_markers)
        {
            self.persistence_failures += 1;
            warn!(
                "Failed to persist read markers under {}: {err}",
                self.read_markers_key
            );
        }
    }
}

/// Decode persisted array elements one by one, skipping the unreadable ones.
fn parse_messages(raw: Vec<Value>) -> Vec<Message> {
    let total = raw.len();
    let messages: Vec<Message> = raw
        .into_iter()
        .filter_map(|value| {
            serde_json::from_value(value)
                .inspect_err(|err| warn!("Skipping unreadable persisted chat message: {err}"))
                .ok()
        })
        .collect();
    if messages.len() != total {
        warn!(
            "Loaded {} of {total} persisted chat messages",
            messages.len()
        );
    }
    messages
}

/// Keep the first message for each id; later duplicates are dropped.
fn dedupe_ids(messages: Vec<Message>) -> Vec<Message> {
    let mut seen = HashSet::with_capacity(messages.len());
    let before = messages.len();
    let kept: Vec<Message> = messages
        .into_iter()
        .filter(|m| seen.insert(m.id.clone()))
        .collect();
    if kept.len() != before {
        warn!(
            "Dropped {} persisted messages with duplicate ids",
            before - kept.len()
        );
    }
    kept
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::chat::core::clock::ManualClock;
    use crate::chat::core::errors::{StorageError, StorageResult};
    use crate::chat::storage::{MemoryStorage, SqliteStorage};

    const T0: i64 = 1_700_000_000_000;

    fn emp(code: &str) -> Participant {
        Participant::employee(code).unwrap()
    }

    fn new_store() -> (ConversationStore<MemoryStorage>, ManualClock) {
        let clock = ManualClock::new(T0);
        let store = ConversationStore::load_with_clock(
            MemoryStorage::new(),
            &StorageConfig::default(),
            clock.clone(),
        );
        (store, clock)
    }

    fn ids(messages: &[Message]) -> Vec<MessageId> {
        messages.iter().map(|m| m.id.clone()).collect()
    }

    /// Storage whose writes always fail, reads return whatever was seeded.
    struct BrokenStorage {
        inner: MemoryStorage,
    }

    impl LocalStorage for BrokenStorage {
        fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
            self.inner.get_item(key)
        }

        fn set_item(&mut self, key: &str, _value: &str) -> StorageResult<()> {
            Err(StorageError::QuotaExceeded {
                key: key.to_string(),
                needed: 1,
                quota: 0,
            })
        }

        fn remove_item(&mut self, key: &str) -> StorageResult<()> {
            self.inner.remove_item(key)
        }
    }

    #[test]
    fn test_walkthrough_scenario() {
        let (mut store, clock) = new_store();
        let e1 = emp("EMP001");

        // 1. admin greets the employee
        let first = store.append(Participant::Admin, e1.clone(), "Welcome aboard");
        assert_eq!(first.timestamp, T0);
        assert_eq!(store.conversation(&Participant::Admin, &e1), vec![first.clone()]);
        assert_eq!(store.unread_count(&e1), 1);

        // 2. reply
        clock.advance(250);
        let second = store.append(e1.clone(), Participant::Admin, "Thanks!");
        assert!(second.timestamp >= first.timestamp);
        assert_eq!(
            ids(&store.conversation(&Participant::Admin, &e1)),
            vec![first.id.clone(), second.id.clone()]
        );
        assert_eq!(store.unread_count(&e1), 1);
        assert_eq!(store.unread_count(&Participant::Admin), 1);

        // 3. edit keeps position and timestamp
        assert!(store.edit(&first.id, "Welcome aboard, EMP001!"));
        let convo = store.conversation(&Participant::Admin, &e1);
        assert_eq!(convo[0].id, first.id);
        assert_eq!(convo[0].text, "Welcome aboard, EMP001!");
        assert_eq!(convo[0].timestamp, first.timestamp);

        // 4. delete the reply
        assert!(store.delete(&second.id));
        let convo = store.conversation(&Participant::Admin, &e1);
        assert_eq!(ids(&convo), vec![first.id.clone()]);
        assert_eq!(store.unread_count(&Participant::Admin), 0);
    }

    #[test]
    fn test_ids_are_unique() {
        let (mut store, _clock) = new_store();
        let e1 = emp("EMP001");
        // Same millisecond for every append.
        let created: Vec<Message> = (0..200)
            .map(|i| store.append(Participant::Admin, e1.clone(), format!("m{i}")))
            .collect();
        let distinct: HashSet<_> = created.iter().map(|m| m.id.clone()).collect();
        assert_eq!(distinct.len(), created.len());
    }

    #[test]
    fn test_timestamps_never_go_backwards() {
        let (mut store, clock) = new_store();
        let e1 = emp("EMP001");

        let a = store.append(Participant::Admin, e1.clone(), "a");
        clock.set(T0 - 60_000);
        let b = store.append(e1.clone(), Participant::Admin, "b");
        let c = store.append(Participant::Admin, e1.clone(), "c");

        assert!(a.timestamp <= b.timestamp && b.timestamp <= c.timestamp);
        assert_eq!(
            ids(&store.conversation(&e1, &Participant::Admin)),
            vec![a.id, b.id, c.id]
        );
    }

    #[test]
    fn test_conversation_is_symmetric_and_isolated() {
        let (mut store, clock) = new_store();
        let (e1, e2) = (emp("EMP001"), emp("EMP002"));

        store.append(Participant::Admin, e1.clone(), "to e1");
        clock.advance(1);
        store.append(Participant::Admin, e2.clone(), "to e2");
        clock.advance(1);
        store.append(e1.clone(), Participant::Admin, "from e1");
        clock.advance(1);
        store.append(e1.clone(), e2.clone(), "e1 to e2");

        let forward = store.conversation(&Participant::Admin, &e1);
        let backward = store.conversation(&e1, &Participant::Admin);
        assert_eq!(forward, backward);
        assert_eq!(forward.len(), 2);
        assert!(forward.iter().all(|m| m.is_between(&Participant::Admin, &e1)));
        assert_eq!(store.conversation(&e1, &e2).len(), 1);
        assert!(store.conversation(&e2, &emp("EMP003")).is_empty());
    }

    #[test]
    fn test_edit_idempotent_and_missing_ids() {
        let (mut store, _clock) = new_store();
        let m = store.append(Participant::Admin, emp("EMP001"), "hi");

        assert!(store.edit(&m.id, "hello"));
        let once = store.messages().to_vec();
        assert!(store.edit(&m.id, "hello"));
        assert_eq!(store.messages(), once.as_slice());

        let before = store.messages().to_vec();
        let missing = MessageId::from("msg_0_missing");
        assert!(!store.edit(&missing, "x"));
        assert!(!store.delete(&missing));
        assert_eq!(store.messages(), before.as_slice());
    }

    #[test]
    fn test_delete_removes_exactly_one() {
        let (mut store, _clock) = new_store();
        let e1 = emp("EMP001");
        let keep = store.append(Participant::Admin, e1.clone(), "keep");
        let gone = store.append(Participant::Admin, e1.clone(), "gone");

        assert!(store.delete(&gone.id));
        assert_eq!(store.len(), 1);
        assert!(store.get(&gone.id).is_none());
        assert_eq!(store.get(&keep.id).map(|m| m.text.as_str()), Some("keep"));
        assert!(!store.delete(&gone.id));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_empty_text_is_accepted() {
        let (mut store, _clock) = new_store();
        let m = store.append(Participant::Admin, emp("EMP001"), "");
        assert_eq!(store.get(&m.id).map(|m| m.text.as_str()), Some(""));
    }

    #[test]
    fn test_every_mutation_writes_through() {
        let (mut store, _clock) = new_store();
        let key = StorageConfig::DEFAULT_MESSAGES_KEY;
        let persisted = |store: &ConversationStore<MemoryStorage>| -> Vec<Message> {
            serde_json::from_str(&store.storage().get_item(key).unwrap().unwrap()).unwrap()
        };

        let m = store.append(Participant::Admin, emp("EMP001"), "one");
        assert_eq!(persisted(&store), store.messages());
        store.edit(&m.id, "two");
        assert_eq!(persisted(&store)[0].text, "two");
        store.delete(&m.id);
        assert!(persisted(&store).is_empty());
    }

    #[test]
    fn test_persistence_roundtrip_through_sqlite() {
        let clock = ManualClock::new(T0);
        let config = StorageConfig::default();
        let mut store = ConversationStore::load_with_clock(
            SqliteStorage::open_in_memory().unwrap(),
            &config,
            clock.clone(),
        );
        let e1 = emp("EMP001");
        store.append(Participant::Admin, e1.clone(), "Welcome aboard");
        clock.advance(5);
        store.append(e1.clone(), Participant::Admin, "Thanks!");
        store.append(Participant::parse("guest").unwrap(), Participant::Admin, "hey");
        let expected = store.messages().to_vec();

        let reloaded = ConversationStore::load(store.into_storage(), &config);
        assert_eq!(reloaded.messages(), expected.as_slice());
    }

    #[test]
    fn test_corrupt_state_loads_empty() {
        let config = StorageConfig::default();
        let mut storage = MemoryStorage::new();
        storage
            .set_item(&config.messages_key, "<<definitely not json>>")
            .unwrap();
        storage.set_item(&config.read_markers_key, "{").unwrap();

        let store = ConversationStore::load(storage, &config);
        assert!(store.is_empty());
        assert_eq!(store.unread_count(&Participant::Admin), 0);
    }

    #[test]
    fn test_unreadable_element_does_not_discard_log() {
        let config = StorageConfig::default();
        let mut storage = MemoryStorage::new();
        storage
            .set_item(
                &config.messages_key,
                r#"[
                    {"id":"msg_1_a","sender":"admin-1","receiver":"user-emp-EMP001","text":"a","timestamp":1},
                    {"id":"msg_2_b","sender":" ","receiver":"admin-1","text":"blank","timestamp":2},
                    {"id":"msg_3_c","sender":"user-emp-EMP001","receiver":"admin-1","text":"c"},
                    {"id":"msg_4_d","sender":"user-emp-EMP001","receiver":"admin-1","text":"d","timestamp":4}
                ]"#,
            )
            .unwrap();

        let store = ConversationStore::load(storage, &config);
        let texts: Vec<&str> = store.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "d"]);
    }

    #[test]
    fn test_unrecognized_participant_survives_reload() {
        let config = StorageConfig::default();
        let (mut store, _clock) = new_store();
        let visitor = Participant::parse("visitor-42").unwrap();
        assert!(matches!(visitor, Participant::Other(_)));
        store.append(visitor.clone(), Participant::Admin, "hello?");
        store.append(Participant::Admin, emp("EMP001"), "unrelated");
        let expected = store.messages().to_vec();

        let reloaded = ConversationStore::load(store.into_storage(), &config);
        assert_eq!(reloaded.messages(), expected.as_slice());
        assert_eq!(reloaded.conversation(&visitor, &Participant::Admin).len(), 1);
    }

    #[test]
    fn test_legacy_ids_and_duplicates_on_load() {
        let config = StorageConfig::default();
        let mut storage = MemoryStorage::new();
        storage
            .set_item(
                &config.messages_key,
                r#"[
                    {"id":"msg_1_abc","sender":"admin-1","receiver":"user-emp-EMP001","text":"a","timestamp":1},
                    {"id":"msg_1_abc","sender":"admin-1","receiver":"user-emp-EMP001","text":"dup","timestamp":2},
                    {"id":"msg_3_def","sender":"user-emp-EMP001","receiver":"admin-1","text":"b","timestamp":3}
                ]"#,
            )
            .unwrap();

        let clock = ManualClock::new(0);
        let mut store = ConversationStore::load_with_clock(storage, &config, clock);
        assert_eq!(store.len(), 2);
        assert_eq!(store.messages()[0].text, "a");

        // Clock behind the newest persisted message: order still holds.
        let next = store.append(Participant::Admin, emp("EMP001"), "c");
        assert_eq!(next.timestamp, 3);
    }

    #[test]
    fn test_write_failure_keeps_memory_state() {
        let config = StorageConfig::default();
        let mut store = ConversationStore::load(
            BrokenStorage {
                inner: MemoryStorage::new(),
            },
            &config,
        );
        let e1 = emp("EMP001");

        let m = store.append(Participant::Admin, e1.clone(), "still here");
        assert!(store.edit(&m.id, "edited"));
        assert_eq!(store.persistence_failures(), 2);
        assert_eq!(store.conversation(&Participant::Admin, &e1)[0].text, "edited");
        assert_eq!(store.unread_count(&e1), 1);
    }

    #[test]
    fn test_quota_failure_is_not_surfaced() {
        let mut store =
            ConversationStore::load(MemoryStorage::with_quota(64), &StorageConfig::default());
        for i in 0..5 {
            store.append(Participant::Admin, emp("EMP001"), format!("message {i}"));
        }
        assert_eq!(store.len(), 5);
        assert!(store.persistence_failures() > 0);
    }

    #[test]
    fn test_unread_count_by_receiver_only() {
        let (mut store, _clock) = new_store();
        let (e1, e2) = (emp("EMP001"), emp("EMP002"));
        store.append(Participant::Admin, e1.clone(), "1");
        store.append(e2.clone(), e1.clone(), "2");
        store.append(e1.clone(), Participant::Admin, "3");

        assert_eq!(store.unread_count(&e1), 2);
        assert_eq!(store.unread_count(&Participant::Admin), 1);
        assert_eq!(store.unread_count(&e2), 0);

        // Reading does not change the coarse count.
        assert!(store.mark_read(&e1, &Participant::Admin));
        assert_eq!(store.unread_count(&e1), 2);
    }

    #[test]
    fn test_read_markers_track_new_messages() {
        let (mut store, clock) = new_store();
        let e1 = emp("EMP001");

        assert!(!store.mark_read(&Participant::Admin, &e1));
        store.append(e1.clone(), Participant::Admin, "q1");
        store.append(e1.clone(), Participant::Admin, "q2");
        assert_eq!(store.unread_from(&Participant::Admin, &e1), 2);

        assert!(store.mark_read(&Participant::Admin, &e1));
        assert_eq!(store.unread_from(&Participant::Admin, &e1), 0);

        // Same millisecond as the marker, still unread.
        store.append(e1.clone(), Participant::Admin, "q3");
        clock.advance(10);
        store.append(Participant::Admin, e1.clone(), "answer");
        assert_eq!(store.unread_from(&Participant::Admin, &e1), 1);
        assert_eq!(store.unread_from(&e1, &Participant::Admin), 1);
    }

    #[test]
    fn test_read_marker_survives_deleting_marked_message() {
        let (mut store, clock) = new_store();
        let e1 = emp("EMP001");
        store.append(e1.clone(), Participant::Admin, "old");
        let marked = store.append(e1.clone(), Participant::Admin, "marked");
        store.mark_read(&Participant::Admin, &e1);

        clock.advance(1);
        store.append(e1.clone(), Participant::Admin, "new");
        assert!(store.delete(&marked.id));
        assert_eq!(store.unread_from(&Participant::Admin, &e1), 1);
    }

    #[test]
    fn test_deleting_read_message_keeps_same_millisecond_reply_unread() {
        let (mut store, _clock) = new_store();
        let e1 = emp("EMP001");
        let seen = store.append(e1.clone(), Participant::Admin, "seen");
        assert!(store.mark_read(&Participant::Admin, &e1));
        // Same millisecond as `seen`.
        let fresh = store.append(e1.clone(), Participant::Admin, "new");
        assert_eq!(fresh.timestamp, seen.timestamp);

        assert!(store.delete(&seen.id));
        assert_eq!(store.unread_from(&Participant::Admin, &e1), 1);
    }

    #[test]
    fn test_deleting_read_message_retargets_marker() {
        let config = StorageConfig::default();
        let (mut store, _clock) = new_store();
        let e1 = emp("EMP001");
        let earlier = store.append(e1.clone(), Participant::Admin, "earlier");
        store.append(Participant::Admin, e1.clone(), "reply");
        let seen = store.append(e1.clone(), Participant::Admin, "seen");
        store.mark_read(&Participant::Admin, &e1);
        store.append(e1.clone(), Participant::Admin, "new");

        assert!(store.delete(&seen.id));
        assert_eq!(store.unread_from(&Participant::Admin, &e1), 1);

        // The retargeted marker is persisted.
        let mut reloaded = ConversationStore::load(store.into_storage(), &config);
        assert_eq!(reloaded.unread_from(&Participant::Admin, &e1), 1);

        // Nothing older to fall back to: everything left is unread again.
        assert!(reloaded.delete(&earlier.id));
        assert_eq!(reloaded.unread_from(&Participant::Admin, &e1), 1);
        assert!(reloaded.mark_read(&Participant::Admin, &e1));
        let last = reloaded.messages().last().cloned().unwrap();
        assert!(reloaded.delete(&last.id));
        reloaded.append(e1.clone(), Participant::Admin, "after");
        assert_eq!(reloaded.unread_from(&Participant::Admin, &e1), 1);
    }

    #[test]
    fn test_stale_marker_from_another_writer_uses_timestamp() {
        let config = StorageConfig::default();
        let mut storage = MemoryStorage::new();
        storage
            .set_item(
                &config.messages_key,
                r#"[
                    {"id":"msg_1_a","sender":"user-emp-EMP001","receiver":"admin-1","text":"a","timestamp":1},
                    {"id":"msg_3_c","sender":"user-emp-EMP001","receiver":"admin-1","text":"c","timestamp":3}
                ]"#,
            )
            .unwrap();
        storage
            .set_item(
                &config.read_markers_key,
                r#"[{"reader":"admin-1","peer":"user-emp-EMP001","lastReadId":"msg_2_gone","lastReadAt":2}]"#,
            )
            .unwrap();

        let store = ConversationStore::load(storage, &config);
        assert_eq!(store.unread_from(&Participant::Admin, &emp("EMP001")), 1);
    }

    #[test]
    fn test_read_markers_persist_and_clear() {
        let config = StorageConfig::default();
        let (mut store, _clock) = new_store();
        let e1 = emp("EMP001");
        store.append(e1.clone(), Participant::Admin, "q");
        store.mark_read(&Participant::Admin, &e1);

        let mut reloaded = ConversationStore::load(store.into_storage(), &config);
        assert_eq!(reloaded.unread_from(&Participant::Admin, &e1), 0);

        assert_eq!(reloaded.clear(), 1);
        assert!(reloaded.is_empty());
        assert_eq!(
            reloaded.storage().get_item(&config.read_markers_key).unwrap(),
            None
        );
        assert_eq!(
            reloaded
                .storage()
                .get_item(&config.messages_key)
                .unwrap()
                .as_deref(),
            Some("[]")
        );
        let after = ConversationStore::load(reloaded.into_storage(), &config);
        assert!(after.is_empty());
        assert_eq!(after.unread_from(&Participant::Admin, &e1), 0);
    }

    #[test]
    fn test_conversation_summaries_order_and_counts() {
        let (mut store, clock) = new_store();
        let (e1, e2) = (emp("EMP001"), emp("EMP002"));

        store.append(e1.clone(), Participant::Admin, "from e1");
        clock.advance(1);
        store.append(e2.clone(), Participant::Admin, "from e2");
        clock.advance(1);
        store.append(Participant::Admin, e2.clone(), "to e2");
        clock.advance(1);
        let latest = store.append(Participant::Admin, e1.clone(), "to e1");
        store.mark_read(&Participant::Admin, &e2);

        let summaries = store.conversation_summaries(&Participant::Admin);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].peer, e1);
        assert_eq!(summaries[0].last_message, latest);
        assert_eq!(summaries[0].message_count, 2);
        assert_eq!(summaries[0].unread, 1);
        assert_eq!(summaries[1].peer, e2);
        assert_eq!(summaries[1].unread, 0);

        assert_eq!(store.conversation_summaries(&e2).len(), 1);
        assert!(store.conversation_summaries(&emp("EMP009")).is_empty());
    }

    #[test]
    fn test_reload_picks_up_external_writes() {
        let config = StorageConfig::default();
        let path = std::env::temp_dir().join(format!("ems_chat_{}.sqlite", uuid::Uuid::new_v4()));
        let open = || SqliteStorage::open(&path, &config.table).unwrap();

        let mut writer = ConversationStore::load(open(), &config);
        let mut reader = ConversationStore::load(open(), &config);
        let m = writer.append(Participant::Admin, emp("EMP001"), "from another tab");
        assert!(reader.is_empty());

        reader.reload();
        assert_eq!(reader.messages(), std::slice::from_ref(&m));

        drop(writer);
        drop(reader);
        let _ = std::fs::remove_file(&path);
    }
}
