//! Process-wide notifications of order status changes.

use chrono::{DateTime, Utc};
use jalapeno_core::{OrderId, OrderStatus};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

const DEFAULT_CAPACITY: usize = 64;

/// An order reached a new status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChanged {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub at: DateTime<Utc>,
}

/// Fan-out channel for [`StatusChanged`] events.
///
/// Every subscriber sees every event published after it subscribed.
/// Publishing with no subscribers is not an error.
#[derive(Debug, Clone)]
pub struct StatusBus {
    sender: broadcast::Sender<StatusChanged>,
}

impl Default for StatusBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl StatusBus {
    /// A bus that buffers up to `capacity` events per slow subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Deliver an event to current subscribers, returning how many there were.
    pub fn publish(&self, event: StatusChanged) -> usize {
        let delivered = self.sender.send(event).unwrap_or(0);
        trace!(order_id = %event.order_id, status = %event.status, delivered, "Published status change");
        delivered
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusChanged> {
        self.sender.subscribe()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
