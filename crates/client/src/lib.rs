//! Client library for the Jalapeño grocery ordering API.
//!
//! - [`JalapenoClient`]: orders, chat, voice and prompt suggestions over HTTP
//! - [`chat`]: incremental parsing of the streamed chat body and a
//!   [`ChatSession`] that accumulates a turn's reply, suggestions and cart
//! - [`orders`]: the mock status progression that walks a new order through
//!   `confirmed`, `shipped` and `delivered`, with a persisted timeline
//! - [`ClientConfig`]: environment-driven configuration

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod chat;
pub mod config;
pub mod error;
pub mod orders;

pub use api::{HealthStatus, JalapenoClient, StatusUpdate};
pub use chat::{ChatEvent, ChatHandler, ChatSession, ChatStreamParser, Outcome, StreamEnd};
pub use config::{ClientConfig, ConfigError};
pub use error::ClientError;
pub use orders::{
    FileTimelineStore, MemoryTimelineStore, OrderProgression, OrderTimeline, ProgressionHandle,
    ProgressionReport, ProgressionSchedule, StatusBus, StatusChanged, StatusUpdater,
    TimelineStore,
};

pub use jalapeno_core;
