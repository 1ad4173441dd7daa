//! Jalapeño API client.
//!
//! Covers the order endpoints, chat (streaming and not), voice ordering and
//! the example prompt list.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use futures::Stream;
use moka::future::Cache;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use jalapeno_core::{
    ChatMessage, ChatReply, ChatRequest, NewOrder, Order, OrderId, OrderStatus, VoiceReply,
};

use crate::chat::{ChatEvent, ChatHandler, StreamEnd, dispatch_events, parse_event_stream};
use crate::config::ClientConfig;
use crate::error::{ApiErrorResponse, ClientError};
use crate::orders::{OrderProgression, StatusBus, StatusUpdater, TimelineStore};

use super::types::{HealthStatus, PromptSuggestions, StatusUpdate, VoiceRequest};

const DEFAULT_RETRY_AFTER_SECS: u64 = 60;
const PROMPT_CACHE_KEY: &str = "chat:suggestions";
const PROMPT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Jalapeño API client.
///
/// Cheap to clone; clones share the connection pool and caches.
#[derive(Clone)]
pub struct JalapenoClient {
    inner: Arc<JalapenoClientInner>,
}

struct JalapenoClientInner {
    client: reqwest::Client,
    base_url: Url,
    request_timeout: Duration,
    prompts: Cache<&'static str, Vec<String>>,
}

impl std::fmt::Debug for JalapenoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JalapenoClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("request_timeout", &self.inner.request_timeout)
            .finish_non_exhaustive()
    }
}

impl JalapenoClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built (e.g. no TLS
    /// backend is available).
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("jalapeno-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let prompts = Cache::builder()
            .max_capacity(1)
            .time_to_live(PROMPT_CACHE_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(JalapenoClientInner {
                client,
                base_url: config.base_url.clone(),
                request_timeout: config.request_timeout,
                prompts,
            }),
        })
    }

    /// The API base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// A progression that updates orders through this client.
    #[must_use]
    pub fn progression(
        &self,
        timeline: Arc<dyn TimelineStore>,
        bus: StatusBus,
        config: &ClientConfig,
    ) -> OrderProgression {
        OrderProgression::new(Arc::new(self.clone()), timeline, bus, config.schedule.clone())
    }

    // =========================================================================
    // Health
    // =========================================================================

    /// Check that the API is up.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn health(&self) -> Result<HealthStatus, ClientError> {
        let url = self.endpoint(&["health"])?;
        let response = self
            .inner
            .client
            .get(url)
            .timeout(self.inner.request_timeout)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Place an order.
    ///
    /// The order is validated locally first; an empty order is never sent.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidRequest` for an invalid order,
    /// `ClientError::NotFound` if a product does not exist, or another error
    /// if the request fails.
    #[instrument(skip(self, order), fields(lines = order.items.len()))]
    pub async fn create_order(&self, order: &NewOrder) -> Result<Order, ClientError> {
        order.validate()?;

        let url = self.endpoint(&["api", "orders"])?;
        let response = self
            .inner
            .client
            .post(url)
            .timeout(self.inner.request_timeout)
            .json(order)
            .send()
            .await?;
        let created: Order = Self::handle_response(response).await?;
        debug!(order_id = %created.id, total = %created.total, "Order created");
        Ok(created)
    }

    /// List orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn list_orders(&self, skip: u32, limit: u32) -> Result<Vec<Order>, ClientError> {
        let mut url = self.endpoint(&["api", "orders"])?;
        url.query_pairs_mut()
            .append_pair("skip", &skip.to_string())
            .append_pair("limit", &limit.to_string());

        let response = self
            .inner
            .client
            .get(url)
            .timeout(self.inner.request_timeout)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// Fetch one order.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotFound` if there is no such order.
    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order, ClientError> {
        let url = self.endpoint(&["api", "orders", &order_id.to_string()])?;
        let response = self
            .inner
            .client
            .get(url)
            .timeout(self.inner.request_timeout)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// Set an order's status.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotFound` if there is no such order.
    #[instrument(skip(self))]
    pub async fn update_order_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<StatusUpdate, ClientError> {
        let mut url = self.endpoint(&["api", "orders", &order_id.to_string(), "status"])?;
        url.query_pairs_mut().append_pair("status", status.as_str());

        let response = self
            .inner
            .client
            .patch(url)
            .timeout(self.inner.request_timeout)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    // =========================================================================
    // Chat & voice
    // =========================================================================

    /// Send a chat message and get the complete reply.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, request), fields(history = request.conversation_history.len()))]
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, ClientError> {
        let url = self.endpoint(&["api", "chat"])?;
        let response = self
            .inner
            .client
            .post(url)
            .timeout(self.inner.request_timeout)
            .json(request)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// Send a chat message and stream the reply.
    ///
    /// The stream ends after a `done` or `error` event, or when the server
    /// closes the body.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial request fails.
    #[instrument(skip(self, request), fields(history = request.conversation_history.len()))]
    pub async fn chat_stream(
        &self,
        request: &ChatRequest,
    ) -> Result<impl Stream<Item = Result<ChatEvent, ClientError>> + use<>, ClientError> {
        let url = self.endpoint(&["api", "chat", "stream"])?;
        let response = self
            .inner
            .client
            .post(url)
            .header(ACCEPT, "text/event-stream")
            .json(request)
            .send()
            .await?;

        // Check for error responses before streaming
        let status = response.status();
        if !status.is_success() {
            return Err(Self::handle_error_status(status, response).await);
        }

        Ok(parse_event_stream(response.bytes_stream()))
    }

    /// Stream a chat reply into `handler`, one callback per event.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body breaks off.
    pub async fn chat_stream_into<H>(
        &self,
        request: &ChatRequest,
        handler: &mut H,
    ) -> Result<StreamEnd, ClientError>
    where
        H: ChatHandler + ?Sized,
    {
        let events = self.chat_stream(request).await?;
        dispatch_events(events, handler).await
    }

    /// Order by voice: upload recorded audio to be transcribed and answered.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or transcription fails
    /// server-side.
    #[instrument(skip(self, audio, history), fields(audio_bytes = audio.len()))]
    pub async fn voice(
        &self,
        audio: &[u8],
        history: &[ChatMessage],
    ) -> Result<VoiceReply, ClientError> {
        if audio.is_empty() {
            return Err(ClientError::InvalidRequest("audio is empty".to_string()));
        }

        let url = self.endpoint(&["api", "voice"])?;
        let body = VoiceRequest {
            audio_base64: base64::engine::general_purpose::STANDARD.encode(audio),
            conversation_history: history,
        };
        let response = self
            .inner
            .client
            .post(url)
            .timeout(self.inner.request_timeout)
            .json(&body)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// Example prompts for the chat interface, cached for an hour.
    ///
    /// # Errors
    ///
    /// Returns an error if the list is not cached and the request fails.
    #[instrument(skip(self))]
    pub async fn prompt_suggestions(&self) -> Result<Vec<String>, ClientError> {
        if let Some(cached) = self.inner.prompts.get(PROMPT_CACHE_KEY).await {
            debug!("Prompt suggestions served from cache");
            return Ok(cached);
        }

        let url = self.endpoint(&["api", "chat", "suggestions"])?;
        let response = self
            .inner
            .client
            .get(url)
            .timeout(self.inner.request_timeout)
            .send()
            .await?;
        let body: PromptSuggestions = Self::handle_response(response).await?;

        self.inner
            .prompts
            .insert(PROMPT_CACHE_KEY, body.suggestions.clone())
            .await;
        Ok(body.suggestions)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Join path segments onto the base URL.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                ClientError::InvalidRequest(format!(
                    "base URL {} cannot have a path",
                    self.inner.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Parse a successful response or convert the error status.
    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();

        if status.is_success() {
            let body = response.text().await?;
            serde_json::from_str(&body)
                .map_err(|e| ClientError::Parse(format!("Failed to parse response: {e}")))
        } else {
            Err(Self::handle_error_status(status, response).await)
        }
    }

    /// Handle an error status code.
    async fn handle_error_status(
        status: reqwest::StatusCode,
        response: reqwest::Response,
    ) -> ClientError {
        // Check for rate limiting
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            return ClientError::RateLimited(retry_after);
        }

        let detail = match response.text().await {
            Ok(body) => serde_json::from_str::<ApiErrorResponse>(&body)
                .map_or(body, |api_error| api_error.message()),
            Err(e) => return ClientError::Http(e),
        };

        if status == reqwest::StatusCode::NOT_FOUND {
            ClientError::NotFound(detail)
        } else {
            ClientError::Api {
                status: status.as_u16(),
                detail,
            }
        }
    }
}

#[async_trait]
impl StatusUpdater for JalapenoClient {
    async fn update_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<(), ClientError> {
        self.update_order_status(order_id, status).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> JalapenoClient {
        let config = ClientConfig::new(Url::parse(base).expect("url"));
        JalapenoClient::new(&config).expect("client")
    }

    #[test]
    fn test_endpoint_joins_segments() {
        let client = client("http://localhost:8000");
        let url = client.endpoint(&["api", "orders", "7", "status"]).expect("url");
        assert_eq!(url.as_str(), "http://localhost:8000/api/orders/7/status");
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = client("https://example.test/jalapeno/");
        let url = client.endpoint(&["api", "chat", "stream"]).expect("url");
        assert_eq!(url.as_str(), "https://example.test/jalapeno/api/chat/stream");
    }

    #[test]
    fn test_jalapeno_client_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<JalapenoClient>();
    }

    #[test]
    fn test_jalapeno_client_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<JalapenoClient>();
    }

    #[tokio::test]
    async fn test_create_order_rejects_empty_without_request() {
        // Nothing listens on this port; validation must fail first.
        let client = client("http://127.0.0.1:9");
        let err = client
            .create_order(&NewOrder::new(vec![]))
            .await
            .expect_err("empty order");
        assert!(matches!(err, ClientError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_voice_rejects_empty_audio() {
        let client = client("http://127.0.0.1:9");
        let err = client.voice(&[], &[]).await.expect_err("empty audio");
        assert!(matches!(err, ClientError::InvalidRequest(_)));
    }
}
