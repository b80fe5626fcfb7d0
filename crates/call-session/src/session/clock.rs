//! Call duration clock.
//!
//! Counts whole seconds spent in the connected state. The controller
//! starts it on every Connected transition and stops it the moment the
//! session leaves Connected, so the count freezes across reconnects and
//! resumes where it left off. At most one ticking task exists at a
//! time; `start` while running is a no-op.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Elapsed-time counter that ticks only while started.
#[derive(Debug)]
pub struct CallClock {
    /// Seconds counted so far. Shared with the ticking task.
    elapsed: Arc<AtomicU64>,
    /// Cancellation token of the active ticking task, if any.
    ticker: Option<CancellationToken>,
}

impl CallClock {
    /// Create a stopped clock at zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            elapsed: Arc::new(AtomicU64::new(0)),
            ticker: None,
        }
    }

    /// Begin incrementing once per second. No-op while already running,
    /// which guards against duplicate timers from repeated Connected
    /// transitions.
    pub fn start(&mut self) {
        if self.ticker.is_some() {
            return;
        }

        let cancel = CancellationToken::new();
        let elapsed = Arc::clone(&self.elapsed);
        let task_cancel = cancel.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            // The first interval tick completes immediately; consume it
            // so the count advances exactly one second from start.
            ticker.tick().await;

            loop {
                tokio::select! {
                    () = task_cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        elapsed.fetch_add(1, Ordering::SeqCst);
                    }
                }
            }
        });

        debug!(target: "call.session.clock", "Clock started");
        self.ticker = Some(cancel);
    }

    /// Halt incrementing. Idempotent.
    pub fn stop(&mut self) {
        if let Some(cancel) = self.ticker.take() {
            cancel.cancel();
            debug!(
                target: "call.session.clock",
                elapsed_seconds = self.elapsed_seconds(),
                "Clock stopped"
            );
        }
    }

    /// Whether a ticking task is active.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.ticker.is_some()
    }

    /// Seconds counted so far.
    #[must_use]
    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed.load(Ordering::SeqCst)
    }

    /// The elapsed count as zero-padded `MM:SS`. Minutes grow past two
    /// digits rather than wrapping.
    #[must_use]
    pub fn formatted(&self) -> String {
        format_mm_ss(self.elapsed_seconds())
    }
}

impl Default for CallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CallClock {
    fn drop(&mut self) {
        self.stop();
    }
}

fn format_mm_ss(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
