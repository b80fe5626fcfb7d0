//! Remote video track registry.
//!
//! Tracks currently published by remote participants, keyed by track
//! id. Insertion order is preserved so the "first available track wins"
//! display policy is deterministic rather than an accident of hashing.

use tracing::debug;

/// A single published remote video track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantTrack {
    /// Identity of the participant that published the track.
    pub participant_id: String,
    /// Track identifier; unique within the registry.
    pub track_id: String,
}

/// Registry of currently visible remote video tracks.
#[derive(Debug, Default)]
pub struct ParticipantTrackRegistry {
    /// Tracks in arrival order. Small (a handful of participants), so
    /// linear scans beat a map here.
    tracks: Vec<ParticipantTrack>,
}

impl ParticipantTrackRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the entry for `track_id`. A participant
    /// re-publishing a track is expected; last write wins and the
    /// track keeps its original position.
    pub fn add(&mut self, track_id: String, participant_id: String) {
        if let Some(existing) = self.tracks.iter_mut().find(|t| t.track_id == track_id) {
            debug!(
                target: "call.session.registry",
                track_id = %track_id,
                "Track re-published, overwriting"
            );
            existing.participant_id = participant_id;
            return;
        }

        self.tracks.push(ParticipantTrack {
            participant_id,
            track_id,
        });
    }

    /// Delete the entry for `track_id` if present. A removal for an
    /// unknown key is a no-op, not an error.
    pub fn remove(&mut self, track_id: &str) {
        self.tracks.retain(|t| t.track_id != track_id);
    }

    /// Empty the registry. Called on every disconnect so no stale
    /// participant from a prior session is ever rendered.
    pub fn clear(&mut self) {
        self.tracks.clear();
    }

    /// Current tracks in arrival order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ParticipantTrack> {
        self.tracks.clone()
    }

    /// The track the presentation layer should render: first available
    /// wins, even when several are held.
    #[must_use]
    pub fn displayed_track(&self) -> Option<&ParticipantTrack> {
        self.tracks.first()
    }

    /// Number of tracks currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Whether the registry holds no tracks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}
