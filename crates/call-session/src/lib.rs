//! Call Session Library
//!
//! This library provides the lifecycle controller for a single video
//! call session:
//!
//! - Connection state machine (connecting, connected, reconnecting,
//!   disconnected, failed) with bounded automatic reconnection
//! - Access token fetch from the call backend (cancellable, bounded by
//!   a timeout)
//! - Remote participant video track bookkeeping with a deterministic
//!   "first available track wins" display policy
//! - Call duration clock that ticks only while connected
//! - Local media controls (audio, video, speaker, camera flip) gated on
//!   the connected state
//!
//! # Architecture
//!
//! One actor per call attempt:
//!
//! ```text
//! CallSessionActor (one per call attempt)
//! ├── owns status, reconnect budget, media state, track registry, clock
//! ├── consumes SessionCommand (user) and TransportEvent (engine)
//! └── emits CallStatus (watch) and SessionNotice (presentation)
//! ```
//!
//! The actor is the only writer of session state; everything inbound is
//! serialized through its mailbox. The transport engine itself sits
//! behind the [`transport::TransportEngine`] trait so sessions can be
//! driven end to end in tests without real media.
//!
//! # Key Design Decisions
//!
//! - **Bounded retries, fixed delay**: at most 2 automatic reconnect
//!   attempts, 3 seconds apart; the budget resets on every successful
//!   connect
//! - **Recognized server defects fail fast**: the known token-endpoint
//!   decode bug is surfaced as a distinct error and never retried
//! - **Non-optimistic media state**: a toggle is recorded only after
//!   the transport primitive succeeded
//!
//! # Modules
//!
//! - [`backend`] - HTTP clients for the token and room-status endpoints
//! - [`config`] - Configuration from environment
//! - [`errors`] - Error types with user-facing messages
//! - [`session`] - The session actor and its supporting state
//! - [`transport`] - Transport engine trait and event types

pub mod backend;
pub mod config;
pub mod errors;
pub mod session;
pub mod transport;

pub use config::CallConfig;
pub use errors::CallError;
pub use session::{
    CallSessionActor, CallSessionHandle, CallSessionParams, CallSnapshot, CallStatus, MediaState,
    SessionNotice,
};
pub use transport::{TransportEngine, TransportEvent};
