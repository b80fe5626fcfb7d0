//! HTTP clients for the call backend.
//!
//! Two endpoints are consumed: the token endpoint (hot call path,
//! bounded by a timeout and cancellable) and the room-status endpoint
//! (pre-join checks only).

pub mod room_status;
pub mod token_client;

pub use room_status::{RoomStatus, RoomStatusClient};
pub use token_client::{TokenClient, TokenFetcher};
