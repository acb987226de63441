//! Per-conversation read markers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::chat::core::ids::{MessageId, Participant};

/// How far `reader` has read the messages `peer` sent them.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReadMarker {
    /// Newest message from the peer that was visible when the conversation was read.
    pub last_read_id: MessageId,
    /// Timestamp of that message, used if another writer deleted it.
    pub last_read_at: i64,
}

/// Persisted form of one marker.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerRecord {
    /// Participant who read the conversation.
    pub reader: Participant,
    /// Participant whose messages were read.
    pub peer: Participant,
    /// See [`ReadMarker::last_read_id`].
    pub last_read_id: MessageId,
    /// See [`ReadMarker::last_read_at`].
    pub last_read_at: i64,
}

/// Read markers keyed by `(reader, peer)`.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<MarkerRecord>", into = "Vec<MarkerRecord>")]
pub struct ReadMarkers {
    by_pair: BTreeMap<(Participant, Participant), ReadMarker>,
}

impl ReadMarkers {
    /// Marker of `reader` for messages from `peer`.
    #[must_use]
    pub fn get(&self, reader: &Participant, peer: &Participant) -> Option<&ReadMarker> {
        self.by_pair.get(&(reader.clone(), peer.clone()))
    }

    /// Set the marker, returning `true` if it changed.
    pub fn set(&mut self, reader: Participant, peer: Participant, marker: ReadMarker) -> bool {
        let previous = self.by_pair.insert((reader, peer), marker.clone());
        previous.as_ref() != Some(&marker)
    }

    /// Remove the marker of `reader` for `peer`, returning `true` if one was set.
    pub fn remove(&mut self, reader: &Participant, peer: &Participant) -> bool {
        self.by_pair
            .remove(&(reader.clone(), peer.clone()))
            .is_some()
    }

    /// `(reader, peer)` pairs whose marker points at message `id`.
    #[must_use]
    pub fn pointing_at(&self, id: &MessageId) -> Vec<(Participant, Participant)> {
        self.by_pair
            .iter()
            .filter(|(_, marker)| marker.last_read_id == *id)
            .map(|(pair, _)| pair.clone())
            .collect()
    }

    /// Drop every marker.
    pub fn clear(&mut self) {
        self.by_pair.clear();
    }

    /// Number of markers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_pair.len()
    }

    /// Whether no marker is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_pair.is_empty()
    }
}

impl From<Vec<MarkerRecord>> for ReadMarkers {
    fn from(records: Vec<MarkerRecord>) -> Self {
        let by_pair = records
            .into_iter()
            .map(|r| {
                (
                    (r.reader, r.peer),
                    ReadMarker {
                        last_read_id: r.last_read_id,
                        last_read_at: r.last_read_at,
                    },
                )
            })
            .collect();
        Self { by_pair }
    }
}

impl From<ReadMarkers> for Vec<MarkerRecord> {
    fn from(markers: ReadMarkers) -> Self {
        markers
            .by_pair
            .into_iter()
            .map(|((reader, peer), marker)| MarkerRecord {
                reader,
                peer,
                last_read_id: marker.last_read_id,
                last_read_at: marker.last_read_at,
            })
            .collect()
    }
}
