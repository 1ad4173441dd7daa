//! Order status progression, timelines and change notifications.
//!
//! # Flow
//!
//! 1. An order is placed (`JalapenoClient::create_order`).
//! 2. [`OrderProgression::start`] records `pending` and spawns a task that
//!    advances the order along its [`ProgressionSchedule`].
//! 3. Every applied step is written to a [`TimelineStore`] and published on
//!    the [`StatusBus`], where any number of watchers can pick it up.

mod bus;
mod progression;
mod schedule;
mod timeline;

pub use bus::{StatusBus, StatusChanged};
pub use progression::{OrderProgression, ProgressionHandle, ProgressionReport, StatusUpdater};
pub use schedule::{MAX_OFFSET, ProgressionSchedule, ScheduleError};
pub use timeline::{
    FileTimelineStore, MemoryTimelineStore, OrderTimeline, TimelineError, TimelineStore,
};
