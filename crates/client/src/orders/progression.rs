//! Mock order-status progression.
//!
//! After an order is placed the client walks it through `confirmed`,
//! `shipped` and `delivered` on a fixed schedule, issuing one remote status
//! update per step. Each applied step is persisted to the order's timeline
//! and announced on the [`StatusBus`]. A failed update is logged and the
//! progression moves on to the next step; there is no retry and no
//! cancellation.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use jalapeno_core::{OrderId, OrderStatus};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{Instrument, info, info_span, warn};

use crate::error::ClientError;

use super::bus::{StatusBus, StatusChanged};
use super::schedule::ProgressionSchedule;
use super::timeline::TimelineStore;

/// Applies a status change to an order.
#[async_trait]
pub trait StatusUpdater: Send + Sync {
    async fn update_status(&self, order_id: OrderId, status: OrderStatus) -> Result<(), ClientError>;
}

/// What a finished progression did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressionReport {
    pub order_id: OrderId,
    /// Steps whose update succeeded, in order.
    pub applied: Vec<OrderStatus>,
    /// Steps whose update failed, with the error message.
    pub failed: Vec<(OrderStatus, String)>,
}

impl ProgressionReport {
    const fn new(order_id: OrderId) -> Self {
        Self {
            order_id,
            applied: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// Whether every step was applied.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// A running progression.
///
/// Dropping the handle detaches the task; the progression keeps running.
#[derive(Debug)]
pub struct ProgressionHandle {
    order_id: OrderId,
    task: JoinHandle<ProgressionReport>,
}

impl ProgressionHandle {
    #[must_use]
    pub const fn order_id(&self) -> OrderId {
        self.order_id
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the final step.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Task` if the progression task panicked.
    pub async fn wait(self) -> Result<ProgressionReport, ClientError> {
        self.task
            .await
            .map_err(|e| ClientError::Task(e.to_string()))
    }
}

/// Starts status progressions for newly placed orders.
#[derive(Clone)]
pub struct OrderProgression {
    updater: Arc<dyn StatusUpdater>,
    timeline: Arc<dyn TimelineStore>,
    bus: StatusBus,
    schedule: ProgressionSchedule,
}

impl OrderProgression {
    #[must_use]
    pub fn new(
        updater: Arc<dyn StatusUpdater>,
        timeline: Arc<dyn TimelineStore>,
        bus: StatusBus,
        schedule: ProgressionSchedule,
    ) -> Self {
        Self {
            updater,
            timeline,
            bus,
            schedule,
        }
    }

    #[must_use]
    pub const fn bus(&self) -> &StatusBus {
        &self.bus
    }

    #[must_use]
    pub const fn schedule(&self) -> &ProgressionSchedule {
        &self.schedule
    }

    #[must_use]
    pub fn timeline(&self) -> &Arc<dyn TimelineStore> {
        &self.timeline
    }

    /// Begin the progression for an order created just now.
    ///
    /// Step offsets are measured from this call. Must be called from within
    /// a Tokio runtime.
    pub fn start(&self, order_id: OrderId) -> ProgressionHandle {
        let started = Instant::now();
        let progression = self.clone();
        let span = info_span!("order_progression", %order_id);

        info!(%order_id, steps = self.schedule.steps().len(), "Starting status progression");
        let task = tokio::spawn(progression.run(order_id, started).instrument(span));

        ProgressionHandle { order_id, task }
    }

    async fn run(self, order_id: OrderId, started: Instant) -> ProgressionReport {
        let mut report = ProgressionReport::new(order_id);

        if let Err(e) = self
            .timeline
            .record(order_id, OrderStatus::Pending, Utc::now())
            .await
        {
            warn!(error = %e, "Failed to persist pending timestamp");
        }

        for &(status, offset) in self.schedule.steps() {
            tokio::time::sleep(offset.saturating_sub(started.elapsed())).await;

            match self.updater.update_status(order_id, status).await {
                Ok(()) => {
                    let at = Utc::now();
                    if let Err(e) = self.timeline.record(order_id, status, at).await {
                        warn!(%status, error = %e, "Failed to persist status timestamp");
                    }
                    self.bus.publish(StatusChanged {
                        order_id,
                        status,
                        at,
                    });
                    info!(%status, "Order status advanced");
                    report.applied.push(status);
                }
                Err(e) => {
                    warn!(%status, error = %e, "Status update failed, skipping step");
                    report.failed.push((status, e.to_string()));
                }
            }
        }

        info!(
            applied = report.applied.len(),
            failed = report.failed.len(),
            "Status progression finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use chrono::DateTime;

    use super::super::timeline::{MemoryTimelineStore, TimelineError};
    use super::*;

    /// Records every call and its time since `origin`.
    struct MockUpdater {
        origin: Instant,
        fail_on: Option<OrderStatus>,
        calls: Mutex<Vec<(OrderStatus, Duration)>>,
    }

    impl MockUpdater {
        fn new(fail_on: Option<OrderStatus>) -> Arc<Self> {
            Arc::new(Self {
                origin: Instant::now(),
                fail_on,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<(OrderStatus, Duration)> {
            self.calls.lock().expect("lock").clone()
        }
    }

    #[async_trait]
    impl StatusUpdater for MockUpdater {
        async fn update_status(
            &self,
            _order_id: OrderId,
            status: OrderStatus,
        ) -> Result<(), ClientError> {
            self.calls
                .lock()
                .expect("lock")
                .push((status, self.origin.elapsed()));
            if self.fail_on == Some(status) {
                return Err(ClientError::Api {
                    status: 500,
                    detail: "database is locked".to_string(),
                });
            }
            Ok(())
        }
    }

    /// A timeline store whose writes always fail.
    struct BrokenTimeline;

    #[async_trait]
    impl TimelineStore for BrokenTimeline {
        async fn record(
            &self,
            _order_id: OrderId,
            _status: OrderStatus,
            _at: DateTime<Utc>,
        ) -> Result<(), TimelineError> {
            Err(TimelineError::Io {
                path: "/readonly".into(),
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            })
        }

        async fn load(
            &self,
            order_id: OrderId,
        ) -> Result<super::super::timeline::OrderTimeline, TimelineError> {
            Ok(super::super::timeline::OrderTimeline::new(order_id))
        }

        async fn clear(&self, _order_id: OrderId) -> Result<(), TimelineError> {
            Ok(())
        }
    }

    fn progression(
        updater: Arc<MockUpdater>,
        timeline: Arc<dyn TimelineStore>,
    ) -> OrderProgression {
        OrderProgression::new(
            updater,
            timeline,
            StatusBus::default(),
            ProgressionSchedule::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_steps_fire_at_offsets_from_creation() {
        let updater = MockUpdater::new(None);
        let timeline = Arc::new(MemoryTimelineStore::new());
        let progression = progression(updater.clone(), timeline.clone());
        let mut events = progression.bus().subscribe();

        let report = progression
            .start(OrderId::new(7))
            .wait()
            .await
            .expect("progression");

        assert!(report.is_complete());
        assert_eq!(
            report.applied,
            vec![
                OrderStatus::Confirmed,
                OrderStatus::Shipped,
                OrderStatus::Delivered
            ]
        );
        assert_eq!(
            updater.calls(),
            vec![
                (OrderStatus::Confirmed, Duration::from_secs(5)),
                (OrderStatus::Shipped, Duration::from_secs(15)),
                (OrderStatus::Delivered, Duration::from_secs(30)),
            ]
        );

        for expected in [
            OrderStatus::Confirmed,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
        ] {
            let event = events.try_recv().expect("status event");
            assert_eq!(event.order_id, OrderId::new(7));
            assert_eq!(event.status, expected);
        }

        let recorded = timeline.load(OrderId::new(7)).await.expect("load");
        assert_eq!(recorded.entries().count(), 4);
        assert_eq!(recorded.current(), Some(OrderStatus::Delivered));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_step_is_skipped() {
        let updater = MockUpdater::new(Some(OrderStatus::Shipped));
        let timeline = Arc::new(MemoryTimelineStore::new());
        let progression = progression(updater.clone(), timeline.clone());
        let mut events = progression.bus().subscribe();

        let report = progression
            .start(OrderId::new(2))
            .wait()
            .await
            .expect("progression");

        assert!(!report.is_complete());
        assert_eq!(
            report.applied,
            vec![OrderStatus::Confirmed, OrderStatus::Delivered]
        );
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, OrderStatus::Shipped);
        assert_eq!(updater.calls().len(), 3);

        assert_eq!(events.try_recv().expect("confirmed").status, OrderStatus::Confirmed);
        assert_eq!(events.try_recv().expect("delivered").status, OrderStatus::Delivered);
        assert!(events.try_recv().is_err());

        let recorded = timeline.load(OrderId::new(2)).await.expect("load");
        assert_eq!(recorded.reached_at(OrderStatus::Shipped), None);
        assert!(recorded.reached_at(OrderStatus::Delivered).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_does_not_cancel() {
        let updater = MockUpdater::new(None);
        let progression = progression(updater.clone(), Arc::new(MemoryTimelineStore::new()));

        drop(progression.start(OrderId::new(5)));
        tokio::time::sleep(Duration::from_secs(31)).await;

        assert_eq!(updater.calls().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeline_failure_does_not_stop_progression() {
        let updater = MockUpdater::new(None);
        let progression = progression(updater.clone(), Arc::new(BrokenTimeline));
        let mut events = progression.bus().subscribe();

        let report = progression
            .start(OrderId::new(9))
            .wait()
            .await
            .expect("progression");

        assert!(report.is_complete());
        assert_eq!(events.try_recv().expect("event").status, OrderStatus::Confirmed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_happens_before_first_offset() {
        let updater = MockUpdater::new(None);
        let timeline = Arc::new(MemoryTimelineStore::new());
        let progression = progression(updater.clone(), timeline.clone());

        let handle = progression.start(OrderId::new(11));
        tokio::time::sleep(Duration::from_secs(4)).await;

        assert!(updater.calls().is_empty());
        assert!(!handle.is_finished());
        let recorded = timeline.load(OrderId::new(11)).await.expect("load");
        assert_eq!(recorded.current(), Some(OrderStatus::Pending));
    }
}
