//! Recording mock transport engine.
//!
//! Records every command the session issues, with arguments, so tests
//! can assert both on what was called and in which order. Failures can
//! be scripted per primitive.

use call_session::errors::CallError;
use call_session::transport::TransportEngine;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// A recorded transport command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Connect {
        token: String,
        room_name: String,
        quality_reporting: bool,
    },
    Disconnect,
    SetAudio {
        enabled: bool,
    },
    SetVideo {
        enabled: bool,
    },
    ToggleSpeaker {
        enabled: bool,
    },
    FlipCamera,
}

/// Mock transport engine recording all issued commands.
#[derive(Debug, Default)]
pub struct MockTransportEngine {
    calls: Mutex<Vec<TransportCall>>,
    fail_connect: AtomicBool,
    fail_disconnect: AtomicBool,
    fail_media: AtomicBool,
}

impl MockTransportEngine {
    /// Create an engine where every command succeeds.
    #[must_use]
    pub fn accepting() -> Self {
        Self::default()
    }

    /// Create an engine whose `connect` fails immediately.
    #[must_use]
    pub fn failing_connect() -> Self {
        let engine = Self::default();
        engine.fail_connect.store(true, Ordering::SeqCst);
        engine
    }

    /// Create an engine whose media primitives (audio/video/speaker/
    /// camera) fail.
    #[must_use]
    pub fn failing_media() -> Self {
        let engine = Self::default();
        engine.fail_media.store(true, Ordering::SeqCst);
        engine
    }

    /// Create an engine whose `disconnect` fails.
    #[must_use]
    pub fn failing_disconnect() -> Self {
        let engine = Self::default();
        engine.fail_disconnect.store(true, Ordering::SeqCst);
        engine
    }

    /// Flip connect failures on or off mid-test.
    pub fn set_fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    /// All commands issued so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().expect("calls lock poisoned").clone()
    }

    /// Number of `connect` commands issued.
    #[must_use]
    pub fn connect_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, TransportCall::Connect { .. }))
            .count()
    }

    /// Number of `disconnect` commands issued.
    #[must_use]
    pub fn disconnect_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, TransportCall::Disconnect))
            .count()
    }

    /// Token passed to the most recent `connect`, if any.
    #[must_use]
    pub fn last_token(&self) -> Option<String> {
        self.calls().iter().rev().find_map(|c| match c {
            TransportCall::Connect { token, .. } => Some(token.clone()),
            _ => None,
        })
    }

    fn record(&self, call: TransportCall) {
        self.calls.lock().expect("calls lock poisoned").push(call);
    }
}

#[async_trait::async_trait]
impl TransportEngine for MockTransportEngine {
    async fn connect(
        &self,
        token: &str,
        room_name: &str,
        quality_reporting: bool,
    ) -> Result<(), CallError> {
        self.record(TransportCall::Connect {
            token: token.to_string(),
            room_name: room_name.to_string(),
            quality_reporting,
        });

        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(CallError::TransportConnect(
                "mock connect failure".to_string(),
            ));
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), CallError> {
        self.record(TransportCall::Disconnect);

        if self.fail_disconnect.load(Ordering::SeqCst) {
            return Err(CallError::TransportDisconnect(
                "mock disconnect failure".to_string(),
            ));
        }
        Ok(())
    }

    async fn set_local_audio_enabled(&self, enabled: bool) -> Result<(), CallError> {
        self.record(TransportCall::SetAudio { enabled });

        if self.fail_media.load(Ordering::SeqCst) {
            return Err(CallError::MediaControl("mock audio failure".to_string()));
        }
        Ok(())
    }

    async fn set_local_video_enabled(&self, enabled: bool) -> Result<(), CallError> {
        self.record(TransportCall::SetVideo { enabled });

        if self.fail_media.load(Ordering::SeqCst) {
            return Err(CallError::MediaControl("mock video failure".to_string()));
        }
        Ok(())
    }

    async fn toggle_speaker(&self, enabled: bool) -> Result<(), CallError> {
        self.record(TransportCall::ToggleSpeaker { enabled });

        if self.fail_media.load(Ordering::SeqCst) {
            return Err(CallError::MediaControl("mock speaker failure".to_string()));
        }
        Ok(())
    }

    async fn flip_camera(&self) -> Result<(), CallError> {
        self.record(TransportCall::FlipCamera);

        if self.fail_media.load(Ordering::SeqCst) {
            return Err(CallError::MediaControl("mock flip failure".to_string()));
        }
        Ok(())
    }
}
