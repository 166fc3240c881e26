//! Periodic task abstraction used by the timer-driven analyzers.
//!
//! Each tick is awaited to completion before the next one is scheduled, and
//! ticks that fall due while a previous one is still running are skipped
//! rather than queued. A slow inference call therefore delays sampling but
//! can never overlap with itself.

use std::future::Future;
use std::ops::ControlFlow;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

const LOG_TARGET: &str = "analysis::ticker";

/// Handle to a spawned periodic task. Dropping it cancels the task.
#[derive(Debug)]
pub struct TickerHandle {
    name: &'static str,
    handle: JoinHandle<()>,
}

impl TickerHandle {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn cancel(self) {
        // Drop does the work.
    }
}

impl Drop for TickerHandle {
    fn drop(&mut self) {
        if !self.handle.is_finished() {
            tracing::trace!(target: LOG_TARGET, ticker = self.name, "ticker cancelled");
        }
        self.handle.abort();
    }
}

/// Runs `tick` every `period` until it returns [`ControlFlow::Break`].
///
/// The first tick fires after one full period.
pub async fn run_periodic<F, Fut>(name: &'static str, period: Duration, mut tick: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ControlFlow<()>>,
{
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        let scheduled = interval.tick().await;
        let lag = Instant::now().saturating_duration_since(scheduled);
        if lag > period {
            tracing::trace!(target: LOG_TARGET, ticker = name, ?lag, "tick ran late");
        }
        if tick().await.is_break() {
            tracing::debug!(target: LOG_TARGET, ticker = name, "ticker stopped");
            return;
        }
    }
}

/// Spawns [`run_periodic`] onto the current runtime.
pub fn spawn_periodic<F, Fut>(name: &'static str, period: Duration, tick: F) -> TickerHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ControlFlow<()>> + Send + 'static,
{
    let handle = tokio::spawn(run_periodic(name, period, tick));
    TickerHandle { name, handle }
}
