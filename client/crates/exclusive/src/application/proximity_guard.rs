//! Proximity Guard
//!
//! Polls the device location and reports distance to a target. Failed
//! readings produce an unknown signal instead of ending the stream. Polling
//! lives exactly as long as the [`ProximityObserver`].

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use platform::geo::Coordinate;
use platform::location::LocationSource;
use platform::task::{FirstTick, PeriodicTask};
use tokio::sync::watch;

use crate::domain::value_objects::ProximitySignal;

/// Starts proximity observations against one location source
#[derive(Debug)]
pub struct ProximityGuard<L> {
    location: Arc<L>,
}

impl<L> Clone for ProximityGuard<L> {
    fn clone(&self) -> Self {
        Self {
            location: Arc::clone(&self.location),
        }
    }
}

impl<L> ProximityGuard<L>
where
    L: LocationSource + Send + Sync + 'static,
{
    pub fn new(location: Arc<L>) -> Self {
        Self { location }
    }

    /// Poll every `poll_interval`, starting now, until the observer is
    /// stopped or dropped.
    pub fn observe(
        &self,
        target: Coordinate,
        radius_meters: f64,
        poll_interval: Duration,
    ) -> ProximityObserver {
        self.observe_while(target, radius_meters, poll_interval, || true)
    }

    /// Like [`observe`](Self::observe), but polling ends for good the first
    /// time `keep_polling` returns false. No reading is published after that.
    pub fn observe_while<F>(
        &self,
        target: Coordinate,
        radius_meters: f64,
        poll_interval: Duration,
        keep_polling: F,
    ) -> ProximityObserver
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        let (tx, rx) = watch::channel(ProximitySignal::unknown());
        let tx = Arc::new(tx);
        let location = Arc::clone(&self.location);
        let keep_polling = Arc::new(keep_polling);

        let task = PeriodicTask::start(
            "proximity_poll",
            poll_interval,
            FirstTick::Immediate,
            move || {
                let location = Arc::clone(&location);
                let tx = Arc::clone(&tx);
                let keep_polling = Arc::clone(&keep_polling);
                async move {
                    if !keep_polling() {
                        tracing::debug!("Proximity observation no longer needed");
                        return ControlFlow::Break(());
                    }
                    let signal = match location.current_position().await {
                        Ok(sample) => ProximitySignal::measured(
                            sample.coordinate().distance_to(&target),
                            radius_meters,
                        ),
                        Err(err) => {
                            tracing::debug!(
                                error = %err,
                                "Position unavailable, proximity unknown"
                            );
                            ProximitySignal::unknown()
                        }
                    };
                    // the reading may outlive the observation
                    if !keep_polling() {
                        return ControlFlow::Break(());
                    }
                    tx.send_replace(signal);
                    ControlFlow::Continue(())
                }
            },
        );

        tracing::debug!(
            target_lat = target.lat,
            target_lng = target.lng,
            radius_meters,
            "Proximity observation started"
        );

        ProximityObserver { rx, task }
    }
}

/// Live proximity readings; polling stops when this is dropped
#[derive(Debug)]
pub struct ProximityObserver {
    rx: watch::Receiver<ProximitySignal>,
    task: PeriodicTask,
}

impl ProximityObserver {
    /// Most recent signal; unknown until the first reading
    pub fn latest(&self) -> ProximitySignal {
        *self.rx.borrow()
    }

    /// Wait for the next reading. `None` once polling has stopped.
    pub async fn changed(&mut self) -> Option<ProximitySignal> {
        if !self.task.is_running() {
            return None;
        }
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }

    /// Receiver for UI surfaces that only need to watch
    pub fn subscribe(&self) -> watch::Receiver<ProximitySignal> {
        self.rx.clone()
    }

    /// Every new reading as a stream; dropping the stream stops polling
    pub fn into_stream(self) -> impl Stream<Item = ProximitySignal> + Send {
        futures::stream::unfold(self, |mut observer| async move {
            let signal = observer.changed().await?;
            Some((signal, observer))
        })
    }

    pub fn stop(&mut self) {
        self.task.stop();
    }

    pub fn is_polling(&self) -> bool {
        self.task.is_running()
    }
}
