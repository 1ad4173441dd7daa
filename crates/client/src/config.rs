//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `JALAPENO_API_URL` - Base URL of the Jalapeño API (default: http://localhost:8000)
//! - `JALAPENO_TIMEOUT_SECS` - Timeout for non-streaming requests (default: 30)
//! - `JALAPENO_TIMELINE_DIR` - Directory for per-order status timelines
//!   (default: .jalapeno/timelines)
//! - `JALAPENO_STATUS_DELAYS` - Seconds after order creation at which the order
//!   is confirmed, shipped and delivered (default: 5,15,30)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::orders::ProgressionSchedule;

const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_TIMELINE_DIR: &str = ".jalapeno/timelines";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Jalapeño client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the API; paths such as `/api/orders` are joined onto it
    pub base_url: Url,
    /// Timeout applied to non-streaming requests
    pub request_timeout: Duration,
    /// Where per-order timelines are persisted
    pub timeline_dir: PathBuf,
    /// When the mock status progression fires each step
    pub schedule: ProgressionSchedule,
}

impl ClientConfig {
    /// Configuration for the given API base URL with every other value
    /// at its default.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            timeline_dir: PathBuf::from(DEFAULT_TIMELINE_DIR),
            schedule: ProgressionSchedule::default(),
        }
    }

    /// Replace the progression schedule.
    #[must_use]
    pub fn with_schedule(mut self, schedule: ProgressionSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Replace the timeline directory.
    #[must_use]
    pub fn with_timeline_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.timeline_dir = dir.into();
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let base_url = env.or_default("JALAPENO_API_URL", DEFAULT_API_URL);
        let base_url = Url::parse(&base_url)
            .map_err(|e| ConfigError::InvalidEnvVar("JALAPENO_API_URL".to_string(), e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidEnvVar(
                "JALAPENO_API_URL".to_string(),
                "must be an http(s) base URL".to_string(),
            ));
        }

        let timeout_secs = env
            .or_default("JALAPENO_TIMEOUT_SECS", &DEFAULT_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("JALAPENO_TIMEOUT_SECS".to_string(), e.to_string())
            })?;

        let timeline_dir = PathBuf::from(env.or_default("JALAPENO_TIMELINE_DIR", DEFAULT_TIMELINE_DIR));

        let schedule = match env.optional("JALAPENO_STATUS_DELAYS") {
            Some(raw) => raw.parse::<ProgressionSchedule>().map_err(|e| {
                ConfigError::InvalidEnvVar("JALAPENO_STATUS_DELAYS".to_string(), e.to_string())
            })?,
            None => ProgressionSchedule::default(),
        };

        Ok(Self {
            base_url,
            request_timeout: Duration::from_secs(timeout_secs),
            timeline_dir,
            schedule,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Get an optional variable, treating an empty value as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }
}
