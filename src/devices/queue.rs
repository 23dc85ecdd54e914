// devices/queue.rs
//! Serial access to the strip.
//!
//! The engine is moved into a single worker task; the bounded channel in
//! front of it is the only way in. Operations run one at a time in
//! submission order and a full backlog is rejected immediately.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::engine::{Outcome, ReconciliationEngine};
use super::state::DeviceSnapshot;
use crate::colour::{Brightness, check_hue, check_percent};
use crate::commands::{Operation, Reply};
use crate::error::StripError;
use crate::events::{EngineEvent, EventSink};

/// Cheaply cloneable front door to the device worker.
#[derive(Clone)]
pub struct DeviceHandle {
    tx: mpsc::Sender<Operation>,
    capacity: usize,
    events: Arc<dyn EventSink>,
}

impl DeviceHandle {
    /// Start the worker. It reconciles once before serving the queue;
    /// operations submitted meanwhile wait in the backlog.
    pub fn spawn(
        engine: ReconciliationEngine,
        capacity: usize,
        events: Arc<dyn EventSink>,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity);
        let worker = tokio::spawn(run_worker(engine, rx));
        let handle = Self {
            tx,
            capacity,
            events,
        };
        (handle, worker)
    }

    /// Queue an operation without waiting for it to run.
    pub fn enqueue(&self, operation: Operation) -> Result<(), StripError> {
        match self.tx.try_send(operation) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(operation)) => {
                metrics::counter!("homestrip_queue_rejections_total").increment(1);
                self.events.emit(EngineEvent::QueueRejected {
                    operation: operation.name().to_string(),
                    capacity: self.capacity,
                });
                Err(StripError::QueueFull {
                    capacity: self.capacity,
                })
            }
            Err(TrySendError::Closed(_)) => Err(StripError::WorkerStopped),
        }
    }

    async fn call<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> Operation,
    ) -> Result<Outcome<T>, StripError> {
        let (tx, rx) = oneshot::channel();
        self.enqueue(build(tx))?;
        rx.await.map_err(|_| StripError::WorkerStopped)?
    }

    pub async fn get_power(&self) -> Result<Outcome<bool>, StripError> {
        self.call(Operation::GetPower).await
    }

    pub async fn set_power(&self, on: bool) -> Result<Outcome<()>, StripError> {
        self.call(|reply| Operation::SetPower(on, reply)).await
    }

    pub async fn get_hue(&self) -> Result<Outcome<f64>, StripError> {
        self.call(Operation::GetHue).await
    }

    pub async fn set_hue(&self, hue: f64) -> Result<Outcome<()>, StripError> {
        check_hue(hue)?;
        self.call(|reply| Operation::SetHue(hue, reply)).await
    }

    pub async fn get_saturation(&self) -> Result<Outcome<f64>, StripError> {
        self.call(Operation::GetSaturation).await
    }

    pub async fn set_saturation(&self, saturation: f64) -> Result<Outcome<()>, StripError> {
        check_percent("saturation", saturation)?;
        self.call(|reply| Operation::SetSaturation(saturation, reply))
            .await
    }

    pub async fn get_brightness(&self) -> Result<Outcome<u8>, StripError> {
        self.call(Operation::GetBrightness).await
    }

    pub async fn set_brightness(&self, brightness: u8) -> Result<Outcome<()>, StripError> {
        let brightness = Brightness::new(brightness)?;
        self.call(|reply| Operation::SetBrightness(brightness, reply))
            .await
    }

    pub async fn reconcile(&self) -> Result<Outcome<()>, StripError> {
        self.call(Operation::Reconcile).await
    }

    pub async fn snapshot(&self) -> Result<Outcome<DeviceSnapshot>, StripError> {
        self.call(Operation::Snapshot).await
    }

    /// Reconcile on a fixed interval so that intent accepted during an
    /// outage reaches the strip without waiting for the next caller.
    pub fn spawn_periodic_sync(&self, every: Duration) -> JoinHandle<()> {
        let handle = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                match handle.reconcile().await {
                    Ok(outcome) => debug!(freshness = ?outcome.freshness, "Periodic sync done"),
                    Err(StripError::QueueFull { .. }) => debug!("Queue busy, skipping periodic sync"),
                    Err(StripError::WorkerStopped) => break,
                    Err(e) => warn!(error = %e, "Periodic sync failed"),
                }
            }
        })
    }
}

async fn run_worker(mut engine: ReconciliationEngine, mut rx: mpsc::Receiver<Operation>) {
    let startup = engine.reconcile().await;
    info!(freshness = ?startup.freshness, "Initial reconciliation finished");

    while let Some(operation) = rx.recv().await {
        let name = operation.name();
        debug!(operation = name, "Running operation");
        metrics::counter!("homestrip_operations_total", "operation" => name).increment(1);
        operation.execute(&mut engine).await;
    }

    info!("Device worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colour::Rgb;
    use crate::devices::Freshness;
    use crate::events::testing::RecordingSink;
    use crate::transport::fake::FakeStrip;

    fn spawn(strip: &FakeStrip, capacity: usize) -> (DeviceHandle, JoinHandle<()>, RecordingSink) {
        let sink = RecordingSink::default();
        let engine = ReconciliationEngine::new(
            Box::new(strip.clone()),
            "RGBW",
            Brightness::MAX,
            Arc::new(sink.clone()),
        );
        let (handle, worker) = DeviceHandle::spawn(engine, capacity, Arc::new(sink.clone()));
        (handle, worker, sink)
    }

    #[tokio::test]
    async fn set_then_get_from_different_callers_observes_the_set() {
        let strip = FakeStrip::new(true, Some(Rgb::new(255, 0, 0)));
        let (handle, _worker, _) = spawn(&strip, 5);
        let setter = handle.clone();
        let getter = handle.clone();

        let (set, get) = tokio::join!(setter.set_hue(120.0), getter.get_hue());

        assert_eq!(set.unwrap().freshness, Freshness::Verified);
        assert_eq!(get.unwrap().value, 120.0);
        assert_eq!(strip.colour(), Some(Rgb::new(0, 255, 0)));
    }

    #[tokio::test]
    async fn full_backlog_fails_fast_without_touching_queued_work() {
        let (strip, gate) = FakeStrip::new(true, None).gated();
        let (handle, _worker, sink) = spawn(&strip, 5);

        // The worker is now stuck in its startup poll.
        gate.entered.notified().await;

        let mut pending = Vec::new();
        for on in [true, false, true, false, true] {
            let (tx, rx) = oneshot::channel();
            handle.enqueue(Operation::SetPower(on, tx)).unwrap();
            pending.push(rx);
        }

        let (tx, _rx) = oneshot::channel();
        let rejected = handle.enqueue(Operation::GetPower(tx));
        assert_eq!(rejected, Err(StripError::QueueFull { capacity: 5 }));
        assert!(
            sink.events()
                .iter()
                .any(|e| matches!(e, EngineEvent::QueueRejected { capacity: 5, .. }))
        );

        gate.permits.add_permits(1_000);
        for rx in pending {
            let outcome = rx.await.unwrap().unwrap();
            assert_eq!(outcome.freshness, Freshness::Verified);
        }
        assert_eq!(strip.power_writes(), [false, true, false, true]);
    }

    #[tokio::test]
    async fn invalid_values_are_rejected_before_queueing() {
        let strip = FakeStrip::new(true, None);
        let (handle, _worker, _) = spawn(&strip, 1);

        assert!(matches!(
            handle.set_hue(400.0).await,
            Err(StripError::InvalidColour(_))
        ));
        assert!(matches!(
            handle.set_saturation(f64::INFINITY).await,
            Err(StripError::InvalidColour(_))
        ));
        assert_eq!(
            handle.set_brightness(120).await,
            Err(StripError::InvalidBrightness(120))
        );
        assert_eq!(handle.get_brightness().await.unwrap().value, 100);
    }

    #[tokio::test]
    async fn brightness_and_snapshot_go_through_the_worker() {
        let strip = FakeStrip::new(true, Some(Rgb::new(0, 0, 255)));
        let (handle, _worker, _) = spawn(&strip, 5);

        handle.set_brightness(20).await.unwrap();
        let snapshot = handle.snapshot().await.unwrap().value;

        assert_eq!(snapshot.state.brightness.value(), 20);
        assert_eq!(strip.colour(), Some(Rgb::new(0, 0, 51)));
        assert_eq!(snapshot.state.remote.colour, Some(crate::colour::Colour::rgb(0, 0, 51)));
    }

    #[tokio::test]
    async fn stopped_worker_is_reported() {
        let strip = FakeStrip::new(true, None);
        let (handle, worker, _) = spawn(&strip, 5);

        worker.abort();
        let _ = worker.await;

        assert_eq!(handle.get_power().await, Err(StripError::WorkerStopped));
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_sync_applies_intent_accepted_during_outage() {
        let strip = FakeStrip::new(false, None);
        let (handle, _worker, _) = spawn(&strip, 5);

        strip.fail_with(Some(crate::transport::fake::Failure::Broken));
        let outcome = handle.set_power(true).await.unwrap();
        assert_eq!(outcome.freshness, Freshness::Stale);
        strip.fail_with(None);

        let sync = handle.spawn_periodic_sync(Duration::from_secs(30));
        tokio::time::sleep(Duration::from_secs(31)).await;
        // One more round trip through the queue so the sync has finished.
        assert!(handle.get_power().await.unwrap().value);
        assert_eq!(strip.power_writes(), [true]);
        sync.abort();
    }
}
