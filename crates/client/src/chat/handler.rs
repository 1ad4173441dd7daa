//! Per-kind callbacks for chat stream consumers.

use jalapeno_core::{CartAddition, ProductSuggestion};

/// Receives chat stream events, one method per kind.
///
/// Every method defaults to doing nothing, so a handler only implements the
/// kinds it cares about.
pub trait ChatHandler {
    /// A fragment of the assistant's message.
    fn on_text(&mut self, _content: &str) {}

    /// The suggestion list was replaced.
    fn on_suggestions(&mut self, _suggestions: &[ProductSuggestion]) {}

    /// Items should be added to the cart.
    fn on_cart_add(&mut self, _items: &[CartAddition]) {}

    /// The reply finished.
    fn on_done(&mut self) {}

    /// The reply failed.
    fn on_error(&mut self, _message: &str) {}
}
