//! HTTP client for the Jalapeño API.

mod client;
mod types;

pub use client::JalapenoClient;
pub use types::{HealthStatus, StatusUpdate};
