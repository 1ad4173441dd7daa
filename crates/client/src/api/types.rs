//! Request and response bodies that only the HTTP layer needs.

use serde::{Deserialize, Serialize};

use jalapeno_core::ChatMessage;

/// Response of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Response of `PATCH /api/orders/{id}/status`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StatusUpdate {
    pub message: String,
}

/// Response of `GET /api/chat/suggestions`.
#[derive(Debug, Deserialize)]
pub(crate) struct PromptSuggestions {
    pub suggestions: Vec<String>,
}

/// Request body for `POST /api/voice`.
#[derive(Debug, Serialize)]
pub(crate) struct VoiceRequest<'a> {
    /// Base64 encoded audio (webm).
    pub audio_base64: String,
    pub conversation_history: &'a [ChatMessage],
}
