//! # Periodic Task
//!
//! Runs a [`Job`] once immediately, then once per interval, until the cancellation
//! token fires. The wait between ticks is a two-way `select!` over the token and a
//! fresh `sleep`, re-armed only after the previous tick has finished, so ticks of one
//! job never overlap and there is no catch-up backlog.
//!
//! Cancellation is only observed while waiting; a tick in progress runs to completion.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Default spacing between two poll cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// A unit of recurring work with a stable name for supervision and logging.
#[async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &'static str;

    /// One complete cycle. Must not fail: per-item errors are handled inside.
    async fn tick(&self);
}

#[derive(Debug, Clone, Copy)]
pub struct PeriodicTask {
    interval: Duration,
}

impl Default for PeriodicTask {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl PeriodicTask {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns the number of ticks run once `cancel` is observed (at least one).
    pub async fn run<J>(self, cancel: CancellationToken, job: Arc<J>) -> u64
    where
        J: Job + ?Sized,
    {
        info!(job = job.name(), interval = ?self.interval, "Starting periodic job");

        // The first cycle always runs, even if `cancel` already fired.
        job.tick().await;
        let mut ticks = 1u64;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(job = job.name(), ticks, "Periodic job stopped");
                    return ticks;
                }
                _ = tokio::time::sleep(self.interval) => {
                    debug!(job = job.name(), tick = ticks + 1, "Tick");
                    job.tick().await;
                    ticks += 1;
                }
            }
        }
    }
}
