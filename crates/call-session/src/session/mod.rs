//! Call session actor and its supporting state.

pub mod clock;
pub mod controller;
pub mod messages;
pub mod policy;
pub mod registry;

pub use clock::CallClock;
pub use controller::{CallSessionActor, CallSessionHandle, CallSessionParams};
pub use messages::{CallSnapshot, CallStatus, MediaState, SessionCommand, SessionNotice};
pub use policy::{ReconnectDecision, ReconnectPolicy};
pub use registry::{ParticipantTrack, ParticipantTrackRegistry};
