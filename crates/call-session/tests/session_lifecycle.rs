//! End-to-end session lifecycle tests.
//!
//! Drives a full session through mock backends: connect, media
//! controls, track bookkeeping, duration clock, and teardown paths.
//! Uses tokio's paused-time test features so the clock and timers are
//! deterministic.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use call_session::config::CallConfig;
use call_session::session::{CallSessionActor, CallSessionHandle, CallSessionParams};
use call_session::session::messages::{CallStatus, SessionNotice};
use call_session::transport::TransportEvent;
use call_test_utils::{MockTokenFetcher, MockTransportEngine, TransportCall};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Let the paused-time runtime deliver queued messages to the actor.
async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

/// Route session logs through the test writer; `RUST_LOG` can raise
/// the filter when debugging a failure.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

fn spawn_session(
    tokens: Arc<MockTokenFetcher>,
    transport: Arc<MockTransportEngine>,
) -> (
    CallSessionHandle,
    mpsc::Receiver<SessionNotice>,
    JoinHandle<()>,
    mpsc::Sender<TransportEvent>,
) {
    init_tracing();
    let (event_tx, event_rx) = mpsc::channel(16);
    let (handle, notices, task) = CallSessionActor::spawn(
        CallSessionParams {
            meeting_id: "42".to_string(),
            room_name: None,
            caller_identity: "alice".to_string(),
        },
        &CallConfig::default(),
        tokens,
        transport,
        event_rx,
        CancellationToken::new(),
    );
    (handle, notices, task, event_tx)
}

#[tokio::test(start_paused = true)]
async fn test_happy_path_connects_and_ticks_clock() -> anyhow::Result<()> {
    let tokens = Arc::new(MockTokenFetcher::fixed("tok-abc"));
    let transport = Arc::new(MockTransportEngine::accepting());
    let (handle, mut notices, task, event_tx) =
        spawn_session(Arc::clone(&tokens), Arc::clone(&transport));

    settle().await;

    // The attempt is in flight: token fetched, connect issued.
    assert_eq!(tokens.call_count(), 1);
    assert_eq!(
        transport.calls().first(),
        Some(&TransportCall::Connect {
            token: "tok-abc".to_string(),
            room_name: "meeting-42".to_string(),
            quality_reporting: true,
        })
    );
    assert_eq!(handle.status(), CallStatus::Connecting);

    event_tx.send(TransportEvent::Connected).await?;
    settle().await;
    assert_eq!(handle.status(), CallStatus::Connected);

    // The clock ticks once per second while connected.
    tokio::time::advance(Duration::from_secs(5)).await;
    settle().await;
    let snapshot = handle.snapshot().await?;
    assert_eq!(snapshot.elapsed_seconds, 5);
    assert_eq!(snapshot.reconnect_attempts, 0);

    // Graceful remote hangup ends the session.
    event_tx
        .send(TransportEvent::Disconnected { error: None })
        .await?;
    settle().await;

    assert_eq!(notices.recv().await, Some(SessionNotice::CallEnded));
    assert_eq!(handle.status(), CallStatus::Disconnected);
    assert_eq!(transport.disconnect_count(), 1);
    task.await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_graceful_hangup_does_not_reconnect() {
    let tokens = Arc::new(MockTokenFetcher::fixed("tok-abc"));
    let transport = Arc::new(MockTransportEngine::accepting());
    let (handle, mut notices, task, event_tx) =
        spawn_session(Arc::clone(&tokens), Arc::clone(&transport));

    settle().await;
    event_tx.send(TransportEvent::Connected).await.unwrap();
    settle().await;
    event_tx
        .send(TransportEvent::Disconnected { error: None })
        .await
        .unwrap();
    settle().await;

    // Well past the reconnect delay: no new attempt must appear.
    tokio::time::advance(Duration::from_secs(30)).await;
    settle().await;

    assert_eq!(tokens.call_count(), 1, "no token refetch after hangup");
    assert_eq!(transport.connect_count(), 1, "no reconnect after hangup");
    assert_eq!(handle.status(), CallStatus::Disconnected);
    assert_eq!(notices.recv().await, Some(SessionNotice::CallEnded));
    task.await.expect("session task should not panic");
}

#[tokio::test(start_paused = true)]
async fn test_end_call_is_idempotent() {
    let tokens = Arc::new(MockTokenFetcher::fixed("tok-abc"));
    let transport = Arc::new(MockTransportEngine::accepting());
    let (handle, mut notices, task, event_tx) =
        spawn_session(Arc::clone(&tokens), Arc::clone(&transport));

    settle().await;
    event_tx.send(TransportEvent::Connected).await.unwrap();
    settle().await;

    handle.end_call().await;
    settle().await;

    assert_eq!(handle.status(), CallStatus::Disconnected);
    assert_eq!(transport.disconnect_count(), 1);
    assert_eq!(notices.recv().await, Some(SessionNotice::CallEnded));

    // A second end never raises or double-disconnects.
    handle.end_call().await;
    assert_eq!(transport.disconnect_count(), 1);
    task.await.expect("session task should not panic");
}

#[tokio::test(start_paused = true)]
async fn test_end_call_before_connected_still_disconnects() {
    // A fetch that never completes: the user ends the call while the
    // token request is still in flight.
    let tokens = Arc::new(MockTokenFetcher::hanging());
    let transport = Arc::new(MockTransportEngine::accepting());
    let (handle, mut notices, task, _event_tx) =
        spawn_session(Arc::clone(&tokens), Arc::clone(&transport));

    settle().await;
    assert_eq!(handle.status(), CallStatus::Connecting);

    handle.end_call().await;
    task.await.expect("session task should not panic");

    // Transport disconnect is issued even though connect never ran.
    assert_eq!(transport.connect_count(), 0);
    assert_eq!(transport.disconnect_count(), 1);
    assert_eq!(handle.status(), CallStatus::Disconnected);
    assert_eq!(notices.recv().await, Some(SessionNotice::CallEnded));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_mid_connect_tears_down() {
    let tokens = Arc::new(MockTokenFetcher::hanging());
    let transport = Arc::new(MockTransportEngine::accepting());
    let (handle, mut notices, task, _event_tx) =
        spawn_session(Arc::clone(&tokens), Arc::clone(&transport));

    settle().await;
    assert_eq!(handle.status(), CallStatus::Connecting);
    assert!(!handle.is_cancelled());

    // Screen teardown path: plain cancellation, no explicit end-call.
    handle.cancel();
    task.await.expect("session task should not panic");

    assert!(handle.is_cancelled());
    assert_eq!(handle.status(), CallStatus::Disconnected);
    assert_eq!(transport.disconnect_count(), 1);
    assert_eq!(notices.recv().await, Some(SessionNotice::CallEnded));
}

#[tokio::test(start_paused = true)]
async fn test_media_commands_gated_on_connected_state() {
    let tokens = Arc::new(MockTokenFetcher::fixed("tok-abc"));
    let transport = Arc::new(MockTransportEngine::accepting());
    let (handle, _notices, _task, event_tx) =
        spawn_session(Arc::clone(&tokens), Arc::clone(&transport));

    settle().await;

    // Not connected yet: the toggle is ignored entirely.
    handle.set_audio_enabled(false).await.unwrap();
    settle().await;
    let snapshot = handle.snapshot().await.unwrap();
    assert!(snapshot.media.audio_enabled, "toggle before connect ignored");
    assert!(!transport
        .calls()
        .iter()
        .any(|c| matches!(c, TransportCall::SetAudio { .. })));

    event_tx.send(TransportEvent::Connected).await.unwrap();
    settle().await;

    handle.set_audio_enabled(false).await.unwrap();
    handle.set_video_enabled(false).await.unwrap();
    handle.set_speaker_enabled(false).await.unwrap();
    handle.flip_camera().await.unwrap();
    settle().await;

    let snapshot = handle.snapshot().await.unwrap();
    assert!(!snapshot.media.audio_enabled);
    assert!(!snapshot.media.video_enabled);
    assert!(!snapshot.media.speaker_enabled);

    let calls = transport.calls();
    assert!(calls.contains(&TransportCall::SetAudio { enabled: false }));
    assert!(calls.contains(&TransportCall::SetVideo { enabled: false }));
    assert!(calls.contains(&TransportCall::ToggleSpeaker { enabled: false }));
    assert!(calls.contains(&TransportCall::FlipCamera));
}

#[tokio::test(start_paused = true)]
async fn test_failed_media_primitive_keeps_prior_state() {
    let tokens = Arc::new(MockTokenFetcher::fixed("tok-abc"));
    let transport = Arc::new(MockTransportEngine::failing_media());
    let (handle, _notices, _task, event_tx) =
        spawn_session(Arc::clone(&tokens), Arc::clone(&transport));

    settle().await;
    event_tx.send(TransportEvent::Connected).await.unwrap();
    settle().await;

    handle.set_video_enabled(false).await.unwrap();
    settle().await;

    // The primitive failed: recorded state must not change, and the
    // session itself must survive.
    let snapshot = handle.snapshot().await.unwrap();
    assert!(snapshot.media.video_enabled, "no optimistic update");
    assert_eq!(handle.status(), CallStatus::Connected);
}

#[tokio::test(start_paused = true)]
async fn test_track_registry_first_available_wins() {
    let tokens = Arc::new(MockTokenFetcher::fixed("tok-abc"));
    let transport = Arc::new(MockTransportEngine::accepting());
    let (handle, _notices, _task, event_tx) =
        spawn_session(Arc::clone(&tokens), Arc::clone(&transport));

    settle().await;
    event_tx.send(TransportEvent::Connected).await.unwrap();
    settle().await;

    event_tx
        .send(TransportEvent::TrackAdded {
            participant_id: "p1".to_string(),
            track_id: "trackA".to_string(),
        })
        .await
        .unwrap();
    event_tx
        .send(TransportEvent::TrackAdded {
            participant_id: "p2".to_string(),
            track_id: "trackB".to_string(),
        })
        .await
        .unwrap();
    settle().await;

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.tracks.len(), 2);
    assert_eq!(snapshot.displayed_track().unwrap().track_id, "trackA");

    // Removing the displayed track promotes the next one.
    event_tx
        .send(TransportEvent::TrackRemoved {
            track_id: "trackA".to_string(),
        })
        .await
        .unwrap();
    settle().await;

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.displayed_track().unwrap().track_id, "trackB");

    // An unexpected drop clears the registry before reconnecting.
    event_tx
        .send(TransportEvent::Disconnected {
            error: Some("network dropped".to_string()),
        })
        .await
        .unwrap();
    settle().await;

    let snapshot = handle.snapshot().await.unwrap();
    assert!(snapshot.tracks.is_empty(), "no stale tracks after a drop");
    assert_eq!(snapshot.status, CallStatus::Reconnecting);
}

#[tokio::test(start_paused = true)]
async fn test_clock_freezes_across_reconnect() {
    let tokens = Arc::new(MockTokenFetcher::fixed("tok-abc"));
    let transport = Arc::new(MockTransportEngine::accepting());
    let (handle, _notices, _task, event_tx) =
        spawn_session(Arc::clone(&tokens), Arc::clone(&transport));

    settle().await;
    event_tx.send(TransportEvent::Connected).await.unwrap();
    settle().await;

    tokio::time::advance(Duration::from_secs(7)).await;
    settle().await;
    assert_eq!(handle.snapshot().await.unwrap().elapsed_seconds, 7);

    event_tx
        .send(TransportEvent::Disconnected {
            error: Some("network dropped".to_string()),
        })
        .await
        .unwrap();
    settle().await;

    // The reconnect delay elapses; the clock must not move while the
    // session is not connected.
    tokio::time::advance(Duration::from_secs(3)).await;
    settle().await;
    assert_eq!(handle.snapshot().await.unwrap().elapsed_seconds, 7);

    event_tx.send(TransportEvent::Connected).await.unwrap();
    settle().await;
    tokio::time::advance(Duration::from_secs(2)).await;
    settle().await;

    // Resumes where it left off rather than resetting.
    assert_eq!(handle.snapshot().await.unwrap().elapsed_seconds, 9);
}
