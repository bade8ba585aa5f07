//! Periodic dispute discovery

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::coordinator::Coordinator;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// What one tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickReport {
    /// Number of pending disputes handed to the coordinator
    Processed(usize),
    /// Another tick was still running
    Skipped,
    /// Pending disputes could not be fetched
    Failed,
}

impl TickReport {
    pub fn processed(&self) -> usize {
        match self {
            Self::Processed(n) => *n,
            Self::Skipped | Self::Failed => 0,
        }
    }
}

/// Polls the escrow contract and feeds pending disputes to the coordinator.
///
/// Ticks never overlap: a tick that starts while another (scheduled or
/// forced) is running is skipped.
pub struct Poller {
    coordinator: Arc<Coordinator>,
    interval: Duration,
    running: Mutex<()>,
}

impl Poller {
    pub fn new(coordinator: Arc<Coordinator>, interval: Duration) -> Self {
        Self {
            coordinator,
            interval,
            running: Mutex::new(()),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one tick now
    pub async fn tick(&self) -> TickReport {
        let Ok(_running) = self.running.try_lock() else {
            tracing::debug!("Previous poll still running, skipping tick");
            return TickReport::Skipped;
        };

        let pending = match self.coordinator.chain().get_pending_disputes().await {
            Ok(pending) => pending,
            Err(e) => {
                tracing::error!(error = %e, "Poll error");
                return TickReport::Failed;
            }
        };

        if !pending.is_empty() {
            tracing::info!(count = pending.len(), "Found pending disputes");
        }

        let count = pending.len();
        for key in pending {
            let outcome = self.coordinator.process(key.clone()).await;
            tracing::info!(dispute = %key, %outcome, "Dispute processed");
        }
        TickReport::Processed(count)
    }

    /// Force one tick and return the number of disputes handed off
    pub async fn poll_once(&self) -> usize {
        self.tick().await.processed()
    }

    /// Tick on the interval until `shutdown` is cancelled. The first tick
    /// runs immediately.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(interval_secs = self.interval.as_secs(), "Poller started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {}
            }
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = self.tick() => {}
            }
        }
        tracing::info!("Poller stopped");
    }
}
