//! Call-session error types.
//!
//! Every connection-path failure (token fetch, transport connect, an
//! established session dropping) routes through the same reconnect
//! decision; only recognized server defects bypass it. Internal details
//! are logged, while `user_message()` returns text safe to put on
//! screen.

use thiserror::Error;

/// Call-session error type.
#[derive(Debug, Error)]
pub enum CallError {
    /// Token fetch failed or timed out.
    #[error("Auth token error: {0}")]
    AuthToken(String),

    /// The transport engine could not establish the room connection.
    #[error("Transport connect error: {0}")]
    TransportConnect(String),

    /// An established session dropped unexpectedly.
    #[error("Transport disconnect error: {0}")]
    TransportDisconnect(String),

    /// Recognized backend defect signature. Deterministic server bug,
    /// never retried.
    #[error("Server configuration error: {0}")]
    ServerConfig(String),

    /// A media toggle/flip primitive failed. Reported locally, does not
    /// terminate the session.
    #[error("Media control error: {0}")]
    MediaControl(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The session actor has already shut down.
    #[error("Session closed")]
    SessionClosed,

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CallError {
    /// Whether this failure qualifies for the automatic reconnect
    /// decision. Server defects are deterministic and never retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CallError::AuthToken(_)
                | CallError::TransportConnect(_)
                | CallError::TransportDisconnect(_)
        )
    }

    /// Returns a user-facing message (no internal details).
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            CallError::AuthToken(_)
            | CallError::TransportConnect(_)
            | CallError::TransportDisconnect(_) => {
                "Unable to connect to the call. Please try again later.".to_string()
            }
            CallError::ServerConfig(_) => {
                "Server configuration issue. Please contact support.".to_string()
            }
            CallError::MediaControl(_) => "Could not change the media setting.".to_string(),
            CallError::Config(_) | CallError::Internal(_) => {
                "An internal error occurred.".to_string()
            }
            CallError::SessionClosed => "The call has ended.".to_string(),
        }
    }
}
