//! Cancellable Periodic Tasks
//!
//! Countdown timers and location polls run as [`PeriodicTask`]s. The task
//! object owns the spawned loop: `stop()` or dropping it aborts the loop, so
//! every exit path of the owner cancels the timer.

use std::future::Future;
use std::ops::ControlFlow;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};

/// When the first tick fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstTick {
    /// Right after start
    Immediate,
    /// One period after start
    AfterPeriod,
}

/// Handle to a running periodic loop
#[derive(Debug)]
pub struct PeriodicTask {
    name: &'static str,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicTask {
    /// Start calling `tick` every `period` until it returns `Break` or the
    /// task is stopped.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<F, Fut>(
        name: &'static str,
        period: Duration,
        first: FirstTick,
        mut tick: F,
    ) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ControlFlow<()>> + Send + 'static,
    {
        let start = match first {
            FirstTick::Immediate => Instant::now(),
            FirstTick::AfterPeriod => Instant::now() + period,
        };

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(start, period);
            loop {
                ticker.tick().await;
                if tick().await.is_break() {
                    break;
                }
            }
            tracing::debug!(task = name, "Periodic task finished");
        });

        tracing::debug!(
            task = name,
            period_ms = period.as_millis() as u64,
            "Periodic task started"
        );

        Self {
            name,
            handle: Some(handle),
        }
    }

    /// Abort the loop. Idempotent.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::debug!(task = self.name, "Periodic task stopped");
        }
    }

    /// Whether the loop is still scheduled
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counting(
        counter: Arc<AtomicU32>,
        limit: Option<u32>,
    ) -> impl FnMut() -> std::future::Ready<ControlFlow<()>> + Send + 'static {
        move || {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            std::future::ready(match limit {
                Some(limit) if n >= limit => ControlFlow::Break(()),
                _ => ControlFlow::Continue(()),
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_after_period() {
        let counter = Arc::new(AtomicU32::new(0));
        let _task = PeriodicTask::start(
            "test",
            Duration::from_secs(1),
            FirstTick::AfterPeriod,
            counting(counter.clone(), None),
        );

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(2600)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_first_tick() {
        let counter = Arc::new(AtomicU32::new(0));
        let _task = PeriodicTask::start(
            "test",
            Duration::from_secs(5),
            FirstTick::Immediate,
            counting(counter.clone(), None),
        );

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_loop() {
        let counter = Arc::new(AtomicU32::new(0));
        let mut task = PeriodicTask::start(
            "test",
            Duration::from_secs(1),
            FirstTick::AfterPeriod,
            counting(counter.clone(), None),
        );

        tokio::time::sleep(Duration::from_millis(2500)).await;
        task.stop();
        task.stop();
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert!(!task.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_loop() {
        let counter = Arc::new(AtomicU32::new(0));
        let task = PeriodicTask::start(
            "test",
            Duration::from_secs(1),
            FirstTick::AfterPeriod,
            counting(counter.clone(), None),
        );

        tokio::time::sleep(Duration::from_millis(1500)).await;
        drop(task);
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_break_ends_loop() {
        let counter = Arc::new(AtomicU32::new(0));
        let task = PeriodicTask::start(
            "test",
            Duration::from_secs(1),
            FirstTick::AfterPeriod,
            counting(counter.clone(), Some(3)),
        );

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert!(!task.is_running());
    }
}
