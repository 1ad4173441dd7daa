//! Jalapeño Core - Shared types library.
//!
//! This crate provides the domain types shared by the Jalapeño components:
//! - `client` - HTTP client, chat stream consumer and order status progression
//! - `cli` - Command-line front end for ordering and chat
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no HTTP clients.
//! The types mirror the JSON records exchanged with the Jalapeño API.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, statuses, catalog/order/chat records and the cart

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
