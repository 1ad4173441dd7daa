//! Core types for Jalapeño.
//!
//! This module provides type-safe wrappers and records for the ordering domain.

pub mod cart;
pub mod catalog;
pub mod chat;
pub mod id;
pub mod order;
pub mod price;
pub mod status;

pub use cart::{Cart, CartItem};
pub use catalog::Product;
pub use chat::{CartAddition, ChatMessage, ChatReply, ChatRequest, ProductSuggestion, VoiceReply};
pub use id::*;
pub use order::{NewOrder, NewOrderItem, Order, OrderItem, OrderValidationError};
pub use price::Price;
pub use status::*;
