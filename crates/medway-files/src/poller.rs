//! Fixed-interval processing poller.
//!
//! Runs only while any uploaded document is still Processing. The loop
//! stops itself the moment a refresh shows nothing pending, and can be
//! shut down early via `Notify`, mirroring a declaratively scoped timer.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

use crate::store::UploadTracker;

/// Background poller that refreshes document states until none is pending.
pub struct UploadPoller {
    tracker: UploadTracker,
    interval: Duration,
    shutdown: Arc<Notify>,
}

impl UploadPoller {
    pub fn new(tracker: UploadTracker, interval: Duration) -> Self {
        Self {
            tracker,
            interval,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Run the polling loop.
    ///
    /// Returns as soon as no document is pending, immediately if nothing
    /// is pending at entry, or on shutdown signal. Refresh failures are
    /// logged and retried on the next tick.
    pub async fn run(&self) {
        let mut interval = tokio::time::interval(self.interval);
        // First tick fires immediately; skip it so ticks land on the period.
        interval.tick().await;

        while self.tracker.has_pending() {
            tokio::select! {
                _ = interval.tick() => {
                    match self.tracker.refresh().await {
                        Ok(docs) => {
                            let pending = docs.iter().filter(|d| d.is_pending()).count();
                            tracing::debug!(pending, total = docs.len(), "Upload poll");
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "Upload poll failed");
                        }
                    }
                }
                _ = self.shutdown.notified() => {
                    tracing::debug!("Upload poller shut down");
                    return;
                }
            }
        }
        tracing::debug!("Upload poller finished; nothing pending");
    }

    /// Signal the poller to stop early.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }
}

// =============================================================================
// Tests
// =============================================================================
