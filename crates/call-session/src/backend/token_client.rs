//! Token endpoint HTTP client.
//!
//! Fetches a short-lived room access token for `(meeting_id, identity)`.
//! The backend identifies the caller through an identity-bearing
//! `Authorization` header and also expects the identity in the JSON
//! body.
//!
//! # Security
//!
//! - The returned token is a credential; it is wrapped in
//!   [`SecretString`] so `Debug`/tracing output stays redacted.
//! - Requests are bounded by a timeout so a stuck backend cannot hang
//!   the connect path; the session's reconnect logic is the safety net.

use crate::errors::CallError;
use reqwest::Client;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Connect timeout for the token endpoint.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Body signature of a known backend defect: the token service calls
/// `.decode()` on an already-decoded JWT string and returns HTTP 500.
/// Deterministic server bug, surfaced distinctly and never retried.
const DECODE_DEFECT_SIGNATURE: &str = "'str' object has no attribute 'decode'";

/// Request body for the token endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenRequest<'a> {
    meeting_id: &'a str,
    identity: &'a str,
}

/// Response body from the token endpoint.
#[derive(Debug, Clone, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: String,
}

/// Trait for token fetching (enables mocking).
#[async_trait::async_trait]
pub trait TokenFetcher: Send + Sync {
    /// Fetch an access token for a meeting and caller identity.
    async fn fetch_token(&self, meeting_id: &str, identity: &str)
        -> Result<SecretString, CallError>;
}

/// HTTP client for the token endpoint.
#[derive(Clone)]
pub struct TokenClient {
    /// HTTP client with configured timeouts.
    client: Client,

    /// Token endpoint URL.
    endpoint: String,
}

impl TokenClient {
    /// Create a new token client.
    ///
    /// # Arguments
    ///
    /// * `endpoint` - Token endpoint URL
    /// * `timeout` - Total request timeout (default 10 seconds)
    ///
    /// # Errors
    ///
    /// Returns `CallError::Internal` if the HTTP client cannot be built.
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self, CallError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .build()
            .map_err(|e| CallError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client, endpoint })
    }

    /// Fetch an access token for `(meeting_id, identity)`.
    ///
    /// # Errors
    ///
    /// - `CallError::ServerConfig` for the known backend decode defect
    /// - `CallError::AuthToken` for timeouts, non-2xx responses, and
    ///   responses missing a token
    #[instrument(skip(self), fields(meeting_id = %meeting_id))]
    pub async fn fetch_token(
        &self,
        meeting_id: &str,
        identity: &str,
    ) -> Result<SecretString, CallError> {
        debug!(
            target: "call.backend.token",
            meeting_id = %meeting_id,
            "Requesting access token"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", identity)
            .json(&TokenRequest {
                meeting_id,
                identity,
            })
            .send()
            .await
            .map_err(|e| {
                warn!(target: "call.backend.token", error = %e, "Token request failed");
                if e.is_timeout() {
                    CallError::AuthToken("Token request timed out".to_string())
                } else {
                    CallError::AuthToken(format!("Token request failed: {e}"))
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                target: "call.backend.token",
                status = %status,
                body_len = body.len(),
                "Token endpoint returned error status"
            );

            if status.as_u16() == 500 && body.contains(DECODE_DEFECT_SIGNATURE) {
                return Err(CallError::ServerConfig(
                    "Token service returned the known decode defect".to_string(),
                ));
            }

            return Err(CallError::AuthToken(format!(
                "Token endpoint returned HTTP {status}"
            )));
        }

        let body: TokenResponse = response.json().await.map_err(|e| {
            warn!(target: "call.backend.token", error = %e, "Failed to parse token response");
            CallError::AuthToken(format!("Invalid token response: {e}"))
        })?;

        if body.token.is_empty() {
            return Err(CallError::AuthToken(
                "No token returned from server".to_string(),
            ));
        }

        debug!(target: "call.backend.token", "Access token received");
        Ok(SecretString::from(body.token))
    }
}

#[async_trait::async_trait]
impl TokenFetcher for TokenClient {
    async fn fetch_token(
        &self,
        meeting_id: &str,
        identity: &str,
    ) -> Result<SecretString, CallError> {
        self.fetch_token(meeting_id, identity).await
    }
}
