//! Cancellable scheduled tasks.
//!
//! A [`ScheduledTask`] owns the tokio task it spawned. Cancelling it, or
//! dropping it, aborts the task; a task that already fired stays fired.

use std::future::Future;
use std::time::Duration;

use std::sync::Arc;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Handle to a timer-driven task.
#[derive(Debug)]
pub struct ScheduledTask {
    name: &'static str,
    handle: Option<JoinHandle<()>>,
}

impl ScheduledTask {
    /// Run `fut` once after `delay`.
    pub fn after<F>(name: &'static str, delay: Duration, fut: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            fut.await;
        });
        tracing::debug!(task = name, delay_ms = delay.as_millis() as u64, "Timer armed");
        Self {
            name,
            handle: Some(handle),
        }
    }

    /// Call `tick` after every `period` without activity.
    ///
    /// Each `reset.notify_one()` restarts the countdown, so the first tick
    /// after activity comes one full period later.
    pub fn idle<F>(name: &'static str, period: Duration, reset: Arc<Notify>, mut tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(period) => tick(),
                    _ = reset.notified() => {}
                }
            }
        });
        tracing::debug!(task = name, period_ms = period.as_millis() as u64, "Idle timer armed");
        Self {
            name,
            handle: Some(handle),
        }
    }

    /// Cancel the task. Safe to call more than once.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::debug!(task = self.name, "Timer cancelled");
        }
    }

    /// Whether the task is still scheduled or running.
    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.cancel();
    }
}
