//! `CallSessionActor` - per-call-attempt session lifecycle actor.
//!
//! Each `CallSessionActor`:
//! - Owns one call session (status, reconnect budget, media toggles,
//!   track registry, duration clock) exclusively
//! - Serializes user commands and transport events through one mailbox,
//!   so no state is ever mutated from two places
//! - Drives the connect path: token fetch, transport connect, bounded
//!   automatic reconnection on qualifying failures
//!
//! # Lifecycle
//!
//! 1. Created when the call screen is entered; connects immediately
//! 2. Runs until the user ends the call, the remote side hangs up, or
//!    the session definitively fails after exhausting retries
//! 3. Teardown cancels any in-flight token fetch and pending reconnect
//!    timer, stops the clock, and issues a transport disconnect - even
//!    if the session never connected

use crate::backend::TokenFetcher;
use crate::config::CallConfig;
use crate::errors::CallError;
use crate::session::clock::CallClock;
use crate::session::messages::{
    CallSnapshot, CallStatus, MediaState, SessionCommand, SessionNotice,
};
use crate::session::policy::{ReconnectDecision, ReconnectPolicy};
use crate::session::registry::ParticipantTrackRegistry;
use crate::transport::{TransportEngine, TransportEvent};

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use secrecy::ExposeSecret;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Command mailbox buffer size.
const COMMAND_CHANNEL_BUFFER: usize = 32;

/// Presentation notice buffer size.
const NOTICE_CHANNEL_BUFFER: usize = 16;

/// Parameters identifying the call to join.
#[derive(Debug, Clone)]
pub struct CallSessionParams {
    /// Identifier of the target meeting.
    pub meeting_id: String,
    /// Room name; derived from the meeting id when not supplied.
    pub room_name: Option<String>,
    /// Identity string used for authentication and token requests.
    pub caller_identity: String,
}

impl CallSessionParams {
    fn room_name(&self) -> String {
        self.room_name
            .clone()
            .unwrap_or_else(|| format!("meeting-{}", self.meeting_id))
    }
}

/// Why the session is being torn down. Decides which notice (if any)
/// the presentation layer receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TeardownKind {
    /// The user ended the call (or the owning screen was cancelled).
    UserEnded,
    /// The remote side hung up, or an unrecoverable drop exhausted the
    /// retry budget.
    RemoteEnded,
    /// A connection attempt definitively failed; the failure notice was
    /// already emitted with a user-facing message.
    Failure,
}

/// Handle to a running `CallSessionActor`.
#[derive(Clone, Debug)]
pub struct CallSessionHandle {
    sender: mpsc::Sender<SessionCommand>,
    cancel_token: CancellationToken,
    status_rx: watch::Receiver<CallStatus>,
    session_id: String,
    meeting_id: String,
}

impl CallSessionHandle {
    /// Get the session ID.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Get the meeting ID.
    #[must_use]
    pub fn meeting_id(&self) -> &str {
        &self.meeting_id
    }

    /// Current connection status.
    #[must_use]
    pub fn status(&self) -> CallStatus {
        *self.status_rx.borrow()
    }

    /// Subscribe to status transitions.
    #[must_use]
    pub fn watch_status(&self) -> watch::Receiver<CallStatus> {
        self.status_rx.clone()
    }

    /// Enable or disable the local audio track. No-op unless connected;
    /// transport failures are logged and leave the prior state.
    pub async fn set_audio_enabled(&self, enabled: bool) -> Result<(), CallError> {
        self.send(SessionCommand::SetAudioEnabled { enabled }).await
    }

    /// Enable or disable the local video track.
    pub async fn set_video_enabled(&self, enabled: bool) -> Result<(), CallError> {
        self.send(SessionCommand::SetVideoEnabled { enabled }).await
    }

    /// Route audio to the speaker or the earpiece.
    pub async fn set_speaker_enabled(&self, enabled: bool) -> Result<(), CallError> {
        self.send(SessionCommand::SetSpeakerEnabled { enabled })
            .await
    }

    /// Switch between front and back camera.
    pub async fn flip_camera(&self) -> Result<(), CallError> {
        self.send(SessionCommand::FlipCamera).await
    }

    /// End the call and tear the session down.
    ///
    /// Idempotent: calling it twice, or before the connection ever
    /// completed, never raises. Cancellation also interrupts an
    /// in-flight token fetch.
    pub async fn end_call(&self) {
        let _ = self.sender.send(SessionCommand::EndCall).await;
        self.cancel_token.cancel();
    }

    /// Request a consistent snapshot of the session state.
    pub async fn snapshot(&self) -> Result<CallSnapshot, CallError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SessionCommand::Snapshot { respond_to: tx })
            .await
            .map_err(|_| CallError::SessionClosed)?;
        rx.await.map_err(|_| CallError::SessionClosed)
    }

    /// Cancel the session actor (screen teardown path).
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Check if the actor is cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    async fn send(&self, command: SessionCommand) -> Result<(), CallError> {
        self.sender
            .send(command)
            .await
            .map_err(|_| CallError::SessionClosed)
    }
}

/// The `CallSessionActor` implementation.
pub struct CallSessionActor {
    /// Session ID (log correlation).
    session_id: String,
    /// Call parameters.
    meeting_id: String,
    room_name: String,
    caller_identity: String,
    /// Current status; mirrored on the watch channel.
    status: CallStatus,
    status_tx: watch::Sender<CallStatus>,
    /// Reconnect attempts consumed; reset to 0 on every Connected.
    reconnect_attempts: u32,
    /// Local media toggles.
    media: MediaState,
    /// Remote video tracks.
    registry: ParticipantTrackRegistry,
    /// Call duration clock.
    clock: CallClock,
    /// Reconnect decision policy.
    policy: ReconnectPolicy,
    /// Token fetch budget.
    token_timeout: Duration,
    /// Whether to request network quality reporting from the engine.
    quality_reporting: bool,
    /// Token endpoint client.
    token_fetcher: Arc<dyn TokenFetcher>,
    /// Transport engine handle (exclusively owned by this session).
    transport: Arc<dyn TransportEngine>,
    /// Command mailbox.
    commands: mpsc::Receiver<SessionCommand>,
    /// Transport event stream.
    events: mpsc::Receiver<TransportEvent>,
    /// Presentation notices.
    notices: mpsc::Sender<SessionNotice>,
    /// Cancellation token for the session.
    cancel_token: CancellationToken,
    /// Deadline of the pending scheduled reconnect, if any.
    reconnect_at: Option<Instant>,
    /// Whether teardown has already run.
    is_closing: bool,
}

impl CallSessionActor {
    /// Spawn a new call session actor. The first connection attempt
    /// starts immediately.
    ///
    /// Returns a handle, the presentation notice receiver, and the task
    /// join handle.
    pub fn spawn(
        params: CallSessionParams,
        config: &CallConfig,
        token_fetcher: Arc<dyn TokenFetcher>,
        transport: Arc<dyn TransportEngine>,
        events: mpsc::Receiver<TransportEvent>,
        cancel_token: CancellationToken,
    ) -> (
        CallSessionHandle,
        mpsc::Receiver<SessionNotice>,
        JoinHandle<()>,
    ) {
        let (sender, commands) = mpsc::channel(COMMAND_CHANNEL_BUFFER);
        let (notices, notice_rx) = mpsc::channel(NOTICE_CHANNEL_BUFFER);
        let (status_tx, status_rx) = watch::channel(CallStatus::Connecting);

        let session_id = Uuid::new_v4().to_string();
        let room_name = params.room_name();

        let actor = Self {
            session_id: session_id.clone(),
            meeting_id: params.meeting_id.clone(),
            room_name,
            caller_identity: params.caller_identity,
            status: CallStatus::Connecting,
            status_tx,
            reconnect_attempts: 0,
            media: MediaState::default(),
            registry: ParticipantTrackRegistry::new(),
            clock: CallClock::new(),
            policy: ReconnectPolicy::new(config.max_reconnect_attempts, config.reconnect_delay),
            token_timeout: config.token_timeout,
            quality_reporting: config.quality_reporting,
            token_fetcher,
            transport,
            commands,
            events,
            notices,
            cancel_token: cancel_token.clone(),
            reconnect_at: None,
            is_closing: false,
        };

        let task_handle = tokio::spawn(actor.run());

        let handle = CallSessionHandle {
            sender,
            cancel_token,
            status_rx,
            session_id,
            meeting_id: params.meeting_id,
        };

        (handle, notice_rx, task_handle)
    }

    /// Run the session loop.
    #[instrument(
        skip_all,
        name = "call.session",
        fields(
            session_id = %self.session_id,
            meeting_id = %self.meeting_id,
            room_name = %self.room_name
        )
    )]
    async fn run(mut self) {
        info!(
            target: "call.session",
            session_id = %self.session_id,
            meeting_id = %self.meeting_id,
            "Call session started"
        );

        // Connect as soon as the session is created.
        if self.begin_connect().await.is_break() {
            return;
        }

        loop {
            // Copy out the deadline so the timer future borrows no state.
            let reconnect_at = self.reconnect_at;

            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    debug!(
                        target: "call.session",
                        session_id = %self.session_id,
                        "Session received cancellation signal"
                    );
                    self.teardown(TeardownKind::UserEnded).await;
                    break;
                }

                cmd = self.commands.recv() => {
                    match cmd {
                        Some(command) => {
                            if self.handle_command(command).await.is_break() {
                                break;
                            }
                        }
                        None => {
                            debug!(
                                target: "call.session",
                                session_id = %self.session_id,
                                "Command channel closed, tearing down"
                            );
                            self.teardown(TeardownKind::UserEnded).await;
                            break;
                        }
                    }
                }

                event = self.events.recv() => {
                    match event {
                        Some(event) => {
                            if self.handle_event(event).await.is_break() {
                                break;
                            }
                        }
                        None => {
                            warn!(
                                target: "call.session",
                                session_id = %self.session_id,
                                "Transport event channel closed, tearing down"
                            );
                            self.teardown(TeardownKind::RemoteEnded).await;
                            break;
                        }
                    }
                }

                () = async move {
                    match reconnect_at {
                        Some(at) => tokio::time::sleep_until(at).await,
                        None => std::future::pending().await,
                    }
                }, if reconnect_at.is_some() => {
                    self.reconnect_at = None;
                    if self.begin_connect().await.is_break() {
                        break;
                    }
                }
            }
        }

        info!(
            target: "call.session",
            session_id = %self.session_id,
            status = ?self.status,
            elapsed_seconds = self.clock.elapsed_seconds(),
            "Call session stopped"
        );
    }

    /// Run one connection attempt: token fetch, then transport connect.
    /// Returns `Break` if the session tore down along the way.
    async fn begin_connect(&mut self) -> ControlFlow<()> {
        self.set_status(CallStatus::Connecting);
        info!(
            target: "call.session",
            session_id = %self.session_id,
            attempt = self.reconnect_attempts,
            "Starting connection attempt"
        );

        // The fetch is cancellable: ending the call mid-fetch must not
        // leave the session hanging on the backend.
        let fetch = tokio::time::timeout(
            self.token_timeout,
            self.token_fetcher
                .fetch_token(&self.meeting_id, &self.caller_identity),
        );

        let token = tokio::select! {
            () = self.cancel_token.cancelled() => {
                debug!(
                    target: "call.session",
                    session_id = %self.session_id,
                    "Session cancelled during token fetch"
                );
                self.teardown(TeardownKind::UserEnded).await;
                return ControlFlow::Break(());
            }
            result = fetch => match result {
                Ok(inner) => inner,
                Err(_) => Err(CallError::AuthToken("Token fetch timed out".to_string())),
            },
        };

        let token = match token {
            Ok(token) => token,
            Err(cause) => return self.handle_connect_failure(cause).await,
        };

        match self
            .transport
            .connect(token.expose_secret(), &self.room_name, self.quality_reporting)
            .await
        {
            Ok(()) => {
                debug!(
                    target: "call.session",
                    session_id = %self.session_id,
                    "Transport connect initiated, awaiting room events"
                );
                ControlFlow::Continue(())
            }
            Err(cause) => self.handle_connect_failure(cause).await,
        }
    }

    /// Apply the reconnect decision to a failed attempt or dropped
    /// connection. Token and transport failures take the same path.
    async fn handle_connect_failure(&mut self, cause: CallError) -> ControlFlow<()> {
        warn!(
            target: "call.session",
            session_id = %self.session_id,
            error = %cause,
            attempts = self.reconnect_attempts,
            "Connection failure"
        );

        match self.policy.decide(self.reconnect_attempts, &cause) {
            ReconnectDecision::RetryAfter(delay) => {
                self.schedule_reconnect(delay);
                ControlFlow::Continue(())
            }
            ReconnectDecision::GiveUp => {
                error!(
                    target: "call.session",
                    session_id = %self.session_id,
                    error = %cause,
                    attempts = self.reconnect_attempts,
                    "Giving up on connection"
                );
                self.set_status(CallStatus::Failed);
                self.notify(SessionNotice::ConnectionFailed {
                    message: cause.user_message(),
                });
                self.teardown(TeardownKind::Failure).await;
                ControlFlow::Break(())
            }
        }
    }

    /// Consume one reconnect attempt and arm the retry timer. The only
    /// place attempt bookkeeping happens, whichever path the failure
    /// arrived on.
    fn schedule_reconnect(&mut self, delay: Duration) {
        self.reconnect_attempts += 1;
        self.set_status(CallStatus::Reconnecting);
        self.reconnect_at = Some(Instant::now() + delay);
        info!(
            target: "call.session",
            session_id = %self.session_id,
            attempt = self.reconnect_attempts,
            delay_ms = delay.as_millis() as u64,
            "Reconnect scheduled"
        );
    }

    /// Handle a single user command. Returns `Break` if the actor
    /// should exit.
    async fn handle_command(&mut self, command: SessionCommand) -> ControlFlow<()> {
        match command {
            SessionCommand::SetAudioEnabled { enabled } => {
                if self.media_controls_available("audio toggle") {
                    match self.transport.set_local_audio_enabled(enabled).await {
                        Ok(()) => self.media.audio_enabled = enabled,
                        Err(e) => warn!(
                            target: "call.session",
                            session_id = %self.session_id,
                            error = %e,
                            "Audio toggle failed, keeping prior state"
                        ),
                    }
                }
                ControlFlow::Continue(())
            }

            SessionCommand::SetVideoEnabled { enabled } => {
                if self.media_controls_available("video toggle") {
                    match self.transport.set_local_video_enabled(enabled).await {
                        Ok(()) => self.media.video_enabled = enabled,
                        Err(e) => warn!(
                            target: "call.session",
                            session_id = %self.session_id,
                            error = %e,
                            "Video toggle failed, keeping prior state"
                        ),
                    }
                }
                ControlFlow::Continue(())
            }

            SessionCommand::SetSpeakerEnabled { enabled } => {
                if self.media_controls_available("speaker toggle") {
                    match self.transport.toggle_speaker(enabled).await {
                        Ok(()) => self.media.speaker_enabled = enabled,
                        Err(e) => warn!(
                            target: "call.session",
                            session_id = %self.session_id,
                            error = %e,
                            "Speaker toggle failed, keeping prior state"
                        ),
                    }
                }
                ControlFlow::Continue(())
            }

            SessionCommand::FlipCamera => {
                if self.media_controls_available("camera flip") {
                    if let Err(e) = self.transport.flip_camera().await {
                        warn!(
                            target: "call.session",
                            session_id = %self.session_id,
                            error = %e,
                            "Camera flip failed"
                        );
                    }
                }
                ControlFlow::Continue(())
            }

            SessionCommand::EndCall => {
                info!(
                    target: "call.session",
                    session_id = %self.session_id,
                    "User ended the call"
                );
                self.teardown(TeardownKind::UserEnded).await;
                ControlFlow::Break(())
            }

            SessionCommand::Snapshot { respond_to } => {
                let _ = respond_to.send(self.snapshot());
                ControlFlow::Continue(())
            }
        }
    }

    /// Handle a single transport event. Returns `Break` if the actor
    /// should exit.
    async fn handle_event(&mut self, event: TransportEvent) -> ControlFlow<()> {
        match event {
            TransportEvent::Connected => {
                info!(
                    target: "call.session",
                    session_id = %self.session_id,
                    room_name = %self.room_name,
                    "Connected to room"
                );
                self.reconnect_at = None;
                self.set_status(CallStatus::Connected);
                self.reconnect_attempts = 0;
                self.clock.start();
                ControlFlow::Continue(())
            }

            TransportEvent::Disconnected { error } => {
                info!(
                    target: "call.session",
                    session_id = %self.session_id,
                    error = ?error,
                    "Disconnected from room"
                );
                self.clock.stop();
                self.registry.clear();
                self.set_status(CallStatus::Disconnected);

                match error {
                    Some(detail) => {
                        let cause = CallError::TransportDisconnect(detail);
                        match self.policy.decide(self.reconnect_attempts, &cause) {
                            ReconnectDecision::RetryAfter(delay) => {
                                self.schedule_reconnect(delay);
                                ControlFlow::Continue(())
                            }
                            ReconnectDecision::GiveUp => {
                                self.teardown(TeardownKind::RemoteEnded).await;
                                ControlFlow::Break(())
                            }
                        }
                    }
                    None => {
                        // Graceful hangup by the remote party.
                        self.teardown(TeardownKind::RemoteEnded).await;
                        ControlFlow::Break(())
                    }
                }
            }

            TransportEvent::FailedToConnect { error } => {
                self.handle_connect_failure(CallError::TransportConnect(error))
                    .await
            }

            TransportEvent::TrackAdded {
                participant_id,
                track_id,
            } => {
                debug!(
                    target: "call.session",
                    session_id = %self.session_id,
                    participant_id = %participant_id,
                    track_id = %track_id,
                    "Participant added video track"
                );
                self.registry.add(track_id, participant_id);
                ControlFlow::Continue(())
            }

            TransportEvent::TrackRemoved { track_id } => {
                debug!(
                    target: "call.session",
                    session_id = %self.session_id,
                    track_id = %track_id,
                    "Participant removed video track"
                );
                self.registry.remove(&track_id);
                ControlFlow::Continue(())
            }
        }
    }

    /// Whether media controls may be issued right now. They are
    /// pass-throughs to a live room connection and no-ops otherwise.
    fn media_controls_available(&self, what: &str) -> bool {
        if self.status == CallStatus::Connected {
            return true;
        }
        debug!(
            target: "call.session",
            session_id = %self.session_id,
            status = ?self.status,
            "Ignoring {what}: not connected"
        );
        false
    }

    /// Tear the session down: cancel the pending reconnect, stop the
    /// clock, clear the registry, and disconnect the transport - even
    /// if the session never connected. Idempotent.
    async fn teardown(&mut self, kind: TeardownKind) {
        if self.is_closing {
            return;
        }
        self.is_closing = true;
        self.reconnect_at = None;
        self.clock.stop();
        self.registry.clear();

        if let Err(e) = self.transport.disconnect().await {
            warn!(
                target: "call.session",
                session_id = %self.session_id,
                error = %e,
                "Transport disconnect during teardown failed"
            );
        }

        match kind {
            TeardownKind::UserEnded | TeardownKind::RemoteEnded => {
                self.set_status(CallStatus::Disconnected);
                self.notify(SessionNotice::CallEnded);
            }
            // Failed status and the failure notice were set before
            // teardown; leave them in place.
            TeardownKind::Failure => {}
        }

        debug!(
            target: "call.session",
            session_id = %self.session_id,
            kind = ?kind,
            "Session torn down"
        );

        self.cancel_token.cancel();
    }

    fn snapshot(&self) -> CallSnapshot {
        CallSnapshot {
            status: self.status,
            reconnect_attempts: self.reconnect_attempts,
            media: self.media,
            elapsed_seconds: self.clock.elapsed_seconds(),
            tracks: self.registry.snapshot(),
        }
    }

    fn set_status(&mut self, status: CallStatus) {
        if self.status == status {
            return;
        }
        debug!(
            target: "call.session",
            session_id = %self.session_id,
            from = ?self.status,
            to = ?status,
            "Status transition"
        );
        self.status = status;
        let _ = self.status_tx.send(status);
    }

    fn notify(&self, notice: SessionNotice) {
        if let Err(e) = self.notices.try_send(notice) {
            debug!(
                target: "call.session",
                session_id = %self.session_id,
                error = %e,
                "Dropping session notice"
            );
        }
    }
}
