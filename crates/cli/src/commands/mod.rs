//! CLI command implementations.

pub mod chat;
pub mod health;
pub mod order;

use std::path::PathBuf;

use jalapeno_client::ClientError;
use jalapeno_client::orders::TimelineError;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Talking to the API failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The local order timeline could not be read.
    #[error(transparent)]
    Timeline(#[from] TimelineError),

    /// An input file could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Reading from the terminal failed.
    #[error("Terminal I/O error: {0}")]
    Terminal(#[from] std::io::Error),

    /// A background task panicked.
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// The assistant ended the reply with an error.
    #[error("Assistant error: {0}")]
    Assistant(String),

    /// The API answered the health check with something other than healthy.
    #[error("API is not healthy (status: {0})")]
    Unhealthy(String),
}
