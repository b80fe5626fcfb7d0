//! Session state and message types.
//!
//! The controller is driven by exactly two inbound channels — user
//! commands ([`SessionCommand`]) and transport events
//! ([`crate::transport::TransportEvent`]) — and reports outward through
//! a status watch channel plus presentation notices
//! ([`SessionNotice`]).

use crate::session::registry::ParticipantTrack;
use tokio::sync::oneshot;

/// Connection status of a call session. Closed set; the controller is
/// the only writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    /// A connection attempt (token fetch + room connect) is in flight.
    Connecting,
    /// The room connection is established.
    Connected,
    /// A qualifying failure occurred and a retry is scheduled.
    Reconnecting,
    /// The session ended. Terminal.
    Disconnected,
    /// The session gave up after exhausting retries. Terminal.
    Failed,
}

impl CallStatus {
    /// Whether no further automatic transition will occur.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, CallStatus::Disconnected | CallStatus::Failed)
    }
}

/// Local media toggle state. Mutated only by explicit user commands,
/// and only after the transport primitive succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaState {
    pub audio_enabled: bool,
    pub video_enabled: bool,
    pub speaker_enabled: bool,
}

impl Default for MediaState {
    fn default() -> Self {
        Self {
            audio_enabled: true,
            video_enabled: true,
            speaker_enabled: true,
        }
    }
}

/// User commands accepted by the session mailbox.
#[derive(Debug)]
pub enum SessionCommand {
    /// Enable/disable the local audio track.
    SetAudioEnabled { enabled: bool },

    /// Enable/disable the local video track.
    SetVideoEnabled { enabled: bool },

    /// Route audio to speaker/earpiece.
    SetSpeakerEnabled { enabled: bool },

    /// Switch between front and back camera.
    FlipCamera,

    /// End the call and tear the session down. Idempotent.
    EndCall,

    /// Request a consistent snapshot of the session state.
    Snapshot {
        respond_to: oneshot::Sender<CallSnapshot>,
    },
}

/// Notices the session emits for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    /// The call is over (graceful hangup, user end, or unrecoverable
    /// drop). The call screen should be exited.
    CallEnded,

    /// Connecting failed after exhausting retries. The message is
    /// user-facing; the screen should show it with an acknowledgement
    /// action that exits.
    ConnectionFailed { message: String },
}

/// Point-in-time view of the session state, for rendering and tests.
#[derive(Debug, Clone)]
pub struct CallSnapshot {
    /// Current connection status.
    pub status: CallStatus,
    /// Reconnect attempts consumed so far (reset on every Connected).
    pub reconnect_attempts: u32,
    /// Local media toggles.
    pub media: MediaState,
    /// Seconds spent connected.
    pub elapsed_seconds: u64,
    /// Currently visible remote video tracks, in arrival order.
    pub tracks: Vec<ParticipantTrack>,
}

impl CallSnapshot {
    /// The track the presentation layer should render: first available
    /// wins, even when several are held. Explicit product policy.
    #[must_use]
    pub fn displayed_track(&self) -> Option<&ParticipantTrack> {
        self.tracks.first()
    }
}
