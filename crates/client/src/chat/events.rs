//! Messages carried by the streaming chat endpoint.

use serde::{Deserialize, Serialize};

use jalapeno_core::{CartAddition, ProductSuggestion};

use super::handler::ChatHandler;

/// One `data: ` record of the chat stream, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// Fragment to append to the assistant's running message.
    Text { content: String },
    /// Replacement for the current suggestion list.
    Suggestions { suggestions: Vec<ProductSuggestion> },
    /// Items to put straight into the cart.
    CartAdd { items: Vec<CartAddition> },
    /// The reply is complete.
    Done,
    /// The reply failed.
    Error { message: String },
}

impl ChatEvent {
    /// Whether this event ends the stream.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error { .. })
    }

    /// Invoke the handler callback matching this event's kind.
    pub fn dispatch<H: ChatHandler + ?Sized>(&self, handler: &mut H) {
        match self {
            Self::Text { content } => handler.on_text(content),
            Self::Suggestions { suggestions } => handler.on_suggestions(suggestions),
            Self::CartAdd { items } => handler.on_cart_add(items),
            Self::Done => handler.on_done(),
            Self::Error { message } => handler.on_error(message),
        }
    }
}

/// How a chat stream ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEnd {
    /// A `done` event arrived.
    Done,
    /// An `error` event arrived.
    Error(String),
    /// The transport closed before any terminal event.
    Closed,
}

impl StreamEnd {
    /// The end marker for a terminal event, `None` for other kinds.
    #[must_use]
    pub fn from_event(event: &ChatEvent) -> Option<Self> {
        match event {
            ChatEvent::Done => Some(Self::Done),
            ChatEvent::Error { message } => Some(Self::Error(message.clone())),
            _ => None,
        }
    }
}
