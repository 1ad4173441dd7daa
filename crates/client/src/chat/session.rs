//! Conversation state driven by chat stream events.

use jalapeno_core::{Cart, CartAddition, ChatMessage, ChatRequest, ProductSuggestion};
use tracing::debug;

use super::events::StreamEnd;
use super::handler::ChatHandler;
use crate::error::ClientError;

/// Where the current reply stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Outcome {
    /// No reply requested yet.
    #[default]
    Idle,
    /// A reply is being received.
    Streaming,
    /// The last reply finished.
    Completed,
    /// The last reply ended with an error.
    Failed,
}

/// A chat conversation with its cart.
///
/// Applies stream events the way the ordering UI does: text fragments are
/// appended to the running reply, a suggestion list replaces the previous
/// one, and cart additions go straight into the cart. Completed replies are
/// kept in the history sent with the next request. A failed turn is dropped
/// from the history so user and assistant messages keep alternating.
#[derive(Debug, Default)]
pub struct ChatSession {
    history: Vec<ChatMessage>,
    /// History length before the current turn's user message.
    turn_start: usize,
    reply: String,
    suggestions: Vec<ProductSuggestion>,
    cart: Cart,
    error: Option<String>,
    outcome: Outcome,
}

impl ChatSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new turn and build the request for it.
    ///
    /// The request carries the history before this message; the message is
    /// then recorded as a user turn.
    pub fn begin_turn(&mut self, message: impl Into<String>) -> ChatRequest {
        let message = message.into();
        let request = ChatRequest::new(message.clone()).with_history(self.history.clone());

        self.turn_start = self.history.len();
        self.history.push(ChatMessage::user(message));
        self.reply.clear();
        self.suggestions.clear();
        self.error = None;
        self.outcome = Outcome::Streaming;
        request
    }

    /// Apply how the stream ended.
    ///
    /// A transport close without a terminal event keeps whatever text
    /// arrived as a completed reply.
    pub fn end_turn(&mut self, end: &StreamEnd) {
        if self.outcome != Outcome::Streaming {
            return;
        }
        match end {
            StreamEnd::Done | StreamEnd::Closed => self.complete(),
            StreamEnd::Error(message) => self.fail(message),
        }
    }

    /// Fail the current turn after the transport broke off.
    ///
    /// Text that arrived before the failure stays readable through
    /// [`reply`](Self::reply) but is not recorded.
    pub fn abort_turn(&mut self, error: &ClientError) {
        if self.outcome != Outcome::Streaming {
            return;
        }
        debug!(error = %error, "Chat turn aborted");
        self.fail(&error.to_string());
    }

    fn complete(&mut self) {
        if !self.reply.is_empty() {
            self.history.push(ChatMessage::assistant(self.reply.clone()));
        }
        self.outcome = Outcome::Completed;
    }

    fn fail(&mut self, message: &str) {
        self.history.truncate(self.turn_start);
        self.error = Some(message.to_string());
        self.outcome = Outcome::Failed;
    }

    /// The reply received so far in the current turn.
    #[must_use]
    pub fn reply(&self) -> &str {
        &self.reply
    }

    #[must_use]
    pub fn suggestions(&self) -> &[ProductSuggestion] {
        &self.suggestions
    }

    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    pub const fn cart_mut(&mut self) -> &mut Cart {
        &mut self.cart
    }

    #[must_use]
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub const fn outcome(&self) -> Outcome {
        self.outcome
    }
}

impl ChatHandler for ChatSession {
    fn on_text(&mut self, content: &str) {
        self.reply.push_str(content);
    }

    fn on_suggestions(&mut self, suggestions: &[ProductSuggestion]) {
        self.suggestions = suggestions.to_vec();
    }

    fn on_cart_add(&mut self, items: &[CartAddition]) {
        for item in items {
            debug!(product_id = %item.product.id, quantity = item.quantity, "Adding chat item to cart");
            self.cart.add(item.product.clone(), item.quantity);
        }
    }

    fn on_done(&mut self) {
        if self.outcome == Outcome::Streaming {
            self.complete();
        }
    }

    fn on_error(&mut self, message: &str) {
        if self.outcome == Outcome::Streaming {
            self.fail(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::stream;
    use jalapeno_core::{ChatRole, Price, Product, ProductId};

    use super::super::events::ChatEvent;
    use super::super::stream::consume_stream;
    use super::*;

    fn product(id: i32) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Item {id}"),
            description: None,
            category: "Produce".to_string(),
            subcategory: None,
            unit: "lb".to_string(),
            price: Price::from_cents(300),
            image_url: None,
            in_stock: 5,
        }
    }

    fn suggestion(id: i32) -> ProductSuggestion {
        ProductSuggestion {
            product: product(id),
            suggested_quantity: 1.0,
            confidence: 0.9,
        }
    }

    #[test]
    fn test_turn_applies_each_kind() {
        let mut session = ChatSession::new();
        let request = session.begin_turn("garlic and olive oil");
        assert!(request.conversation_history.is_empty());
        assert_eq!(session.outcome(), Outcome::Streaming);

        let events = [
            ChatEvent::Text {
                content: "Here is ".to_string(),
            },
            ChatEvent::Suggestions {
                suggestions: vec![suggestion(1), suggestion(2)],
            },
            ChatEvent::Text {
                content: "what I found.".to_string(),
            },
            ChatEvent::Suggestions {
                suggestions: vec![suggestion(3)],
            },
            ChatEvent::CartAdd {
                items: vec![
                    CartAddition {
                        product: product(3),
                        quantity: 2.0,
                    },
                    CartAddition {
                        product: product(3),
                        quantity: 1.0,
                    },
                ],
            },
            ChatEvent::Done,
        ];
        for event in &events {
            event.dispatch(&mut session);
        }

        assert_eq!(session.reply(), "Here is what I found.");
        assert_eq!(session.suggestions(), &[suggestion(3)]);
        assert!((session.cart().quantity_of(ProductId::new(3)) - 3.0).abs() < f64::EPSILON);
        assert_eq!(session.outcome(), Outcome::Completed);
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.history()[1].role, ChatRole::Assistant);
    }

    #[test]
    fn test_next_turn_carries_history() {
        let mut session = ChatSession::new();
        session.begin_turn("eggs");
        session.on_text("How many?");
        session.on_done();

        let request = session.begin_turn("a dozen");
        assert_eq!(
            request.conversation_history,
            vec![ChatMessage::user("eggs"), ChatMessage::assistant("How many?")]
        );
        assert!(session.reply().is_empty());
    }

    #[test]
    fn test_error_keeps_reply_out_of_history() {
        let mut session = ChatSession::new();
        session.begin_turn("bacon");
        session.on_text("Let me");
        session.on_error("upstream timeout");

        assert_eq!(session.outcome(), Outcome::Failed);
        assert_eq!(session.error(), Some("upstream timeout"));
        assert!(session.history().is_empty());
        assert_eq!(session.reply(), "Let me");

        // A late terminal does not flip the outcome.
        session.on_done();
        assert_eq!(session.outcome(), Outcome::Failed);
    }

    #[test]
    fn test_closed_stream_completes_turn() {
        let mut session = ChatSession::new();
        session.begin_turn("butter");
        session.on_text("Found butter.");
        session.end_turn(&StreamEnd::Closed);

        assert_eq!(session.outcome(), Outcome::Completed);
        assert_eq!(session.history().len(), 2);

        // Already completed; ending again changes nothing.
        session.end_turn(&StreamEnd::Error("late".to_string()));
        assert_eq!(session.outcome(), Outcome::Completed);
    }

    #[tokio::test]
    async fn test_transport_error_fails_turn() {
        let mut session = ChatSession::new();
        session.begin_turn("cheddar");
        session.on_text("Sure.");
        session.on_done();

        session.begin_turn("eggs");
        let chunks = stream::iter(vec![
            Ok::<&[u8], String>(b"data: {\"type\": \"text\", \"content\": \"How many\"}\n"),
            Err("connection reset".to_string()),
        ]);
        let err = consume_stream(chunks, &mut session)
            .await
            .expect_err("transport error");
        session.abort_turn(&err);

        assert_eq!(session.outcome(), Outcome::Failed);
        assert!(
            session.error().is_some_and(|e| e.contains("connection reset")),
            "{:?}",
            session.error()
        );
        assert_eq!(session.reply(), "How many");

        let request = session.begin_turn("a dozen");
        assert_eq!(
            request.conversation_history,
            vec![ChatMessage::user("cheddar"), ChatMessage::assistant("Sure.")]
        );
        assert_eq!(session.outcome(), Outcome::Streaming);
        assert!(session.error().is_none());
    }

    #[test]
    fn test_abort_after_completion_is_ignored() {
        let mut session = ChatSession::new();
        session.begin_turn("milk");
        session.on_text("Added milk.");
        session.end_turn(&StreamEnd::Done);

        session.abort_turn(&ClientError::Stream("late reset".to_string()));

        assert_eq!(session.outcome(), Outcome::Completed);
        assert!(session.error().is_none());
        assert_eq!(session.history().len(), 2);
    }
}
