//! Transport engine seam.
//!
//! The media transport (room connect/disconnect, local media toggles)
//! is an external capability the session controller calls into, not
//! something this crate implements. Engine adapters implement
//! [`TransportEngine`] for the command surface and deliver their
//! asynchronous callbacks as [`TransportEvent`]s on the channel handed
//! to the session at spawn time, so all state mutation happens on one
//! serialized timeline.

use crate::errors::CallError;

/// Commands the session controller issues to the transport engine.
///
/// Implementations must be cheap to call from the session task; long
/// operations complete asynchronously and report through
/// [`TransportEvent`]s.
#[async_trait::async_trait]
pub trait TransportEngine: Send + Sync {
    /// Begin connecting to a room with a fetched access token.
    ///
    /// A successful return only means the attempt was started; the
    /// outcome arrives as [`TransportEvent::Connected`] or
    /// [`TransportEvent::FailedToConnect`].
    async fn connect(
        &self,
        token: &str,
        room_name: &str,
        quality_reporting: bool,
    ) -> Result<(), CallError>;

    /// Disconnect from the room. Safe to call when not connected.
    async fn disconnect(&self) -> Result<(), CallError>;

    /// Enable or disable the local audio track.
    async fn set_local_audio_enabled(&self, enabled: bool) -> Result<(), CallError>;

    /// Enable or disable the local video track.
    async fn set_local_video_enabled(&self, enabled: bool) -> Result<(), CallError>;

    /// Route audio to the speaker (true) or the earpiece (false).
    async fn toggle_speaker(&self, enabled: bool) -> Result<(), CallError>;

    /// Switch between front and back camera.
    async fn flip_camera(&self) -> Result<(), CallError>;
}

/// Asynchronous events the transport engine delivers to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The room connection was established.
    Connected,

    /// The room connection ended. `error` is `None` for a graceful
    /// hangup and carries the cause for unexpected drops.
    Disconnected { error: Option<String> },

    /// A connection attempt failed before ever reaching the room.
    FailedToConnect { error: String },

    /// A remote participant published a video track.
    TrackAdded {
        participant_id: String,
        track_id: String,
    },

    /// A remote participant unpublished a video track.
    TrackRemoved { track_id: String },
}
