//! Integration tests for the Jalapeño client.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p jalapeno-integration-tests
//! ```
//!
//! No external services are needed: every test starts a [`MockApi`], an
//! in-process axum server on an ephemeral port that mimics the Jalapeño API
//! (orders, status updates, chat, streaming chat, voice, prompt suggestions).
//!
//! # Test Categories
//!
//! - `chat_stream` - Streaming chat over real chunked HTTP bodies
//! - `orders` - Order endpoints and the status progression

pub mod fixtures;
mod mock;
mod routes;

pub use mock::{MockApi, StreamScript};
