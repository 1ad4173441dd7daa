//! Per-order record of when each status was reached.
//!
//! The progression writes a timestamp for every step it applies; timeline
//! views read them back. Two stores are provided: [`FileTimelineStore`]
//! keeps one JSON file per order on disk, [`MemoryTimelineStore`] keeps
//! everything in process.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jalapeno_core::{OrderId, OrderStatus};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Errors reading or writing a timeline.
#[derive(Debug, Error)]
pub enum TimelineError {
    #[error("timeline I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt timeline at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// When an order reached each status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTimeline {
    pub order_id: OrderId,
    #[serde(default)]
    entries: BTreeMap<OrderStatus, DateTime<Utc>>,
}

impl OrderTimeline {
    /// An empty timeline.
    #[must_use]
    pub const fn new(order_id: OrderId) -> Self {
        Self {
            order_id,
            entries: BTreeMap::new(),
        }
    }

    /// Set the time `status` was reached, replacing any earlier value.
    pub fn record(&mut self, status: OrderStatus, at: DateTime<Utc>) {
        self.entries.insert(status, at);
    }

    #[must_use]
    pub fn reached_at(&self, status: OrderStatus) -> Option<DateTime<Utc>> {
        self.entries.get(&status).copied()
    }

    /// Reached statuses in lifecycle order.
    pub fn entries(&self) -> impl Iterator<Item = (OrderStatus, DateTime<Utc>)> + '_ {
        self.entries.iter().map(|(status, at)| (*status, *at))
    }

    /// The furthest status reached in lifecycle order.
    #[must_use]
    pub fn current(&self) -> Option<OrderStatus> {
        self.entries.keys().next_back().copied()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Persistence for order timelines.
#[async_trait]
pub trait TimelineStore: Send + Sync {
    /// Record that `order_id` reached `status` at `at`.
    async fn record(
        &self,
        order_id: OrderId,
        status: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<(), TimelineError>;

    /// Load the timeline, empty if nothing was recorded.
    async fn load(&self, order_id: OrderId) -> Result<OrderTimeline, TimelineError>;

    /// Forget everything recorded for the order.
    async fn clear(&self, order_id: OrderId) -> Result<(), TimelineError>;
}

// =============================================================================
// FileTimelineStore
// =============================================================================

/// Stores each timeline as `order-<id>.json` in a directory.
///
/// The directory is created on first write. Writes within one process are
/// serialized so concurrent steps for the same order do not lose updates.
#[derive(Debug)]
pub struct FileTimelineStore {
    dir: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl FileTimelineStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding an order's timeline.
    #[must_use]
    pub fn path_for(&self, order_id: OrderId) -> PathBuf {
        self.dir.join(format!("order-{order_id}.json"))
    }

    async fn read(&self, order_id: OrderId) -> Result<OrderTimeline, TimelineError> {
        let path = self.path_for(order_id);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                serde_json::from_slice(&bytes).map_err(|source| TimelineError::Json { path, source })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(OrderTimeline::new(order_id)),
            Err(source) => Err(TimelineError::Io { path, source }),
        }
    }

    async fn write(&self, timeline: &OrderTimeline) -> Result<(), TimelineError> {
        let path = self.path_for(timeline.order_id);
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| TimelineError::Io {
                path: self.dir.clone(),
                source,
            })?;

        let json = serde_json::to_vec_pretty(timeline).map_err(|source| TimelineError::Json {
            path: path.clone(),
            source,
        })?;

        // Write then rename so a reader never sees a half-written file.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|source| TimelineError::Io {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|source| TimelineError::Io { path, source })
    }
}

#[async_trait]
impl TimelineStore for FileTimelineStore {
    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    async fn record(
        &self,
        order_id: OrderId,
        status: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<(), TimelineError> {
        let _guard = self.write_lock.lock().await;
        let mut timeline = self.read(order_id).await?;
        timeline.record(status, at);
        self.write(&timeline).await?;
        debug!("Timeline entry persisted");
        Ok(())
    }

    async fn load(&self, order_id: OrderId) -> Result<OrderTimeline, TimelineError> {
        self.read(order_id).await
    }

    async fn clear(&self, order_id: OrderId) -> Result<(), TimelineError> {
        let _guard = self.write_lock.lock().await;
        let path = self.path_for(order_id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(TimelineError::Io { path, source }),
        }
    }
}

// =============================================================================
// MemoryTimelineStore
// =============================================================================

/// Keeps timelines in memory.
#[derive(Debug, Default)]
pub struct MemoryTimelineStore {
    timelines: RwLock<HashMap<OrderId, OrderTimeline>>,
}

impl MemoryTimelineStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TimelineStore for MemoryTimelineStore {
    async fn record(
        &self,
        order_id: OrderId,
        status: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<(), TimelineError> {
        self.timelines
            .write()
            .await
            .entry(order_id)
            .or_insert_with(|| OrderTimeline::new(order_id))
            .record(status, at);
        Ok(())
    }

    async fn load(&self, order_id: OrderId) -> Result<OrderTimeline, TimelineError> {
        Ok(self
            .timelines
            .read()
            .await
            .get(&order_id)
            .cloned()
            .unwrap_or_else(|| OrderTimeline::new(order_id)))
    }

    async fn clear(&self, order_id: OrderId) -> Result<(), TimelineError> {
        self.timelines.write().await.remove(&order_id);
        Ok(())
    }
}
