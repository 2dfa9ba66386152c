//! Cancellable repeating tasks.
//!
//! DESIGN
//! ======
//! A `RepeatingTask` owns its tokio task. Dropping it aborts the task, so a
//! timer can never outlive whatever holds it. Missed ticks are delayed
//! rather than bursted: after a long stall the job runs once and the
//! schedule restarts from there.

#[cfg(test)]
#[path = "scheduler_test.rs"]
mod scheduler_test;

use std::future::Future;
use std::ops::ControlFlow;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, trace};

/// A periodic job running on the tokio runtime until cancelled or dropped.
#[derive(Debug)]
pub struct RepeatingTask {
    name: &'static str,
    handle: JoinHandle<()>,
}

impl RepeatingTask {
    /// Run `job` every `period`, first after one full period.
    ///
    /// The job returns `ControlFlow::Break(())` to stop itself. Must be
    /// called from within a tokio runtime.
    pub fn spawn<F, Fut>(name: &'static str, period: Duration, job: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ControlFlow<()>> + Send + 'static,
    {
        Self::spawn_at(name, Instant::now() + period, period, job)
    }

    /// Run `job` every `period`, first immediately.
    pub fn spawn_immediate<F, Fut>(name: &'static str, period: Duration, job: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ControlFlow<()>> + Send + 'static,
    {
        Self::spawn_at(name, Instant::now(), period, job)
    }

    fn spawn_at<F, Fut>(name: &'static str, start: Instant, period: Duration, mut job: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ControlFlow<()>> + Send + 'static,
    {
        debug!(task = name, period_ms = u64::try_from(period.as_millis()).unwrap_or(u64::MAX), "repeating task started");
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(start, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                trace!(task = name, "repeating task fired");
                if job().await.is_break() {
                    debug!(task = name, "repeating task stopped itself");
                    break;
                }
            }
        });
        Self { name, handle }
    }
}

impl Drop for RepeatingTask {
    fn drop(&mut self) {
        if !self.handle.is_finished() {
            debug!(task = self.name, "repeating task cancelled");
        }
        self.handle.abort();
    }
}
