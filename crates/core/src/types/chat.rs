//! Chat and voice ordering records.

use serde::{Deserialize, Serialize};

use super::catalog::Product;
use super::status::ChatRole;

/// One turn of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    /// A message written by the customer.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    /// A message written by the assistant.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Request body for `/api/chat` and `/api/chat/stream`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub conversation_history: Vec<ChatMessage>,
}

impl ChatRequest {
    /// A request with no prior conversation.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            conversation_history: Vec::new(),
        }
    }

    /// Attach prior conversation turns.
    #[must_use]
    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.conversation_history = history;
        self
    }
}

/// A catalog product the assistant matched against the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSuggestion {
    pub product: Product,
    pub suggested_quantity: f64,
    /// How sure the assistant is about the match, 0 to 1.
    pub confidence: f64,
}

/// An instruction to put a product straight into the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartAddition {
    pub product: Product,
    pub quantity: f64,
}

/// Response of the non-streaming `/api/chat` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub message: String,
    #[serde(default)]
    pub suggestions: Vec<ProductSuggestion>,
    #[serde(default)]
    pub needs_clarification: bool,
    #[serde(default)]
    pub clarification_question: Option<String>,
    /// Set when the assistant failed and `message` is an apology.
    #[serde(default)]
    pub error: Option<String>,
}

/// Response of `/api/voice`: the transcript plus the chat reply for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceReply {
    #[serde(default)]
    pub transcribed_text: String,
    #[serde(flatten)]
    pub reply: ChatReply,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_default_history() {
        let request: ChatRequest =
            serde_json::from_str(r#"{"message": "a dozen eggs"}"#).expect("deserialize");
        assert_eq!(request, ChatRequest::new("a dozen eggs"));
    }

    #[test]
    fn test_chat_message_roles_serialize_lowercase() {
        let json = serde_json::to_value(ChatMessage::assistant("hi")).expect("serialize");
        assert_eq!(json, serde_json::json!({"role": "assistant", "content": "hi"}));
    }

    #[test]
    fn test_voice_reply_flattens_chat_reply() {
        let json = r#"{
            "transcribed_text": "",
            "message": "I couldn't understand the audio. Please try again.",
            "suggestions": [],
            "needs_clarification": true
        }"#;

        let reply: VoiceReply = serde_json::from_str(json).expect("deserialize");
        assert!(reply.transcribed_text.is_empty());
        assert!(reply.reply.needs_clarification);
        assert!(reply.reply.suggestions.is_empty());
    }
}
