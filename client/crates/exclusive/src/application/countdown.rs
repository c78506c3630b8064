//! Countdown
//!
//! Seconds remaining on an exclusive. Decrements once per tick, never goes
//! below zero and is only ever set from a server value at creation.

use std::ops::ControlFlow;
use std::time::Duration;

use platform::task::{FirstTick, PeriodicTask};
use tokio::sync::watch;

/// Running countdown; stops on drop
#[derive(Debug)]
pub struct Countdown {
    rx: watch::Receiver<u32>,
    task: PeriodicTask,
}

impl Countdown {
    /// Start counting down from `initial`, calling `on_expire` once when
    /// zero is reached.
    pub fn start<F>(initial: u32, tick: Duration, on_expire: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let (tx, rx) = watch::channel(initial);
        let mut on_expire = Some(on_expire);

        let task = PeriodicTask::start("countdown", tick, FirstTick::AfterPeriod, move || {
            let remaining = tx.borrow().saturating_sub(1);
            tx.send_replace(remaining);

            let flow = if remaining == 0 {
                if let Some(on_expire) = on_expire.take() {
                    tracing::info!("Exclusive countdown expired");
                    on_expire();
                }
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            };
            std::future::ready(flow)
        });

        Self { rx, task }
    }

    pub fn remaining(&self) -> u32 {
        *self.rx.borrow()
    }

    pub fn is_expired(&self) -> bool {
        self.remaining() == 0
    }

    /// Receiver that sees every decrement
    pub fn subscribe(&self) -> watch::Receiver<u32> {
        self.rx.clone()
    }

    /// Freeze the countdown at its current value. Idempotent.
    pub fn stop(&mut self) {
        self.task.stop();
    }

    pub fn is_running(&self) -> bool {
        self.task.is_running()
    }
}
