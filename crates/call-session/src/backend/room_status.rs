//! Room-status endpoint HTTP client.
//!
//! Used outside the hot call path (pre-join checks). The backend is
//! designed to return error details in the JSON body even on non-200
//! responses, so this client parses whatever it can and degrades to
//! "no participants, room does not exist" instead of erroring: a failed
//! probe must never block entering the call screen.

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Total request timeout for room-status probes.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Connect timeout for room-status probes.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Room status as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomStatus {
    /// Whether at least one participant is already in the room.
    pub has_participants: bool,
    /// Number of participants currently in the room.
    pub participant_count: u32,
    /// Whether the room exists at all.
    pub room_exists: bool,
    /// Error detail from the backend, if any.
    pub error: Option<String>,
}

impl RoomStatus {
    /// The degraded status used when the probe fails outright.
    fn unavailable(error: String) -> Self {
        Self {
            has_participants: false,
            participant_count: 0,
            room_exists: false,
            error: Some(error),
        }
    }
}

/// Wire shape of the room-status response. All fields optional; the
/// backend omits some of them depending on the failure mode.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoomStatusBody {
    #[serde(default)]
    has_participants: bool,
    #[serde(default)]
    participant_count: u32,
    room_exists: Option<bool>,
    error: Option<String>,
}

/// HTTP client for the room-status endpoint.
#[derive(Clone)]
pub struct RoomStatusClient {
    client: Client,
    endpoint: String,
}

impl RoomStatusClient {
    /// Create a new room-status client.
    ///
    /// # Errors
    ///
    /// Returns an error string if the HTTP client cannot be built.
    pub fn new(endpoint: String) -> Result<Self, crate::errors::CallError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| {
                crate::errors::CallError::Internal(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self { client, endpoint })
    }

    /// Check whether the meeting's room exists and has participants.
    ///
    /// Infallible by design: every failure mode degrades to
    /// `{has_participants: false, room_exists: false}` with the cause
    /// recorded in `error`.
    #[instrument(skip(self), fields(meeting_id = %meeting_id))]
    pub async fn check_room_status(&self, meeting_id: &str) -> RoomStatus {
        let response = match self
            .client
            .post(&self.endpoint)
            .json(&json!({ "meetingId": meeting_id }))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(target: "call.backend.room_status", error = %e, "Room status request failed");
                return RoomStatus::unavailable(e.to_string());
            }
        };

        let status = response.status();

        // Parse the body regardless of HTTP status; the backend returns
        // error details in JSON even on failures.
        let body: RoomStatusBody = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!(
                    target: "call.backend.room_status",
                    status = %status,
                    error = %e,
                    "Room status response was not parseable"
                );
                return RoomStatus::unavailable(format!("Invalid room status response: {e}"));
            }
        };

        if !status.is_success() {
            warn!(
                target: "call.backend.room_status",
                status = %status,
                error = ?body.error,
                "Room status check returned non-200 status"
            );
            return RoomStatus::unavailable(
                body.error.unwrap_or_else(|| "Server error".to_string()),
            );
        }

        if let Some(error) = &body.error {
            warn!(target: "call.backend.room_status", error = %error, "Room status check returned error detail");
        }

        debug!(
            target: "call.backend.room_status",
            has_participants = body.has_participants,
            participant_count = body.participant_count,
            "Room status received"
        );

        RoomStatus {
            has_participants: body.has_participants,
            participant_count: body.participant_count,
            // Room is assumed to exist unless the backend says otherwise.
            room_exists: body.room_exists != Some(false),
            error: body.error,
        }
    }
}
