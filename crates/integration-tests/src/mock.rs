//! In-process mock of the Jalapeño API.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use jalapeno_client::{ChatEvent, ClientConfig, JalapenoClient};
use jalapeno_core::{ChatRequest, Order, OrderId, OrderStatus};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;

use crate::fixtures;
use crate::routes;

/// What `POST /api/chat/stream` answers with.
#[derive(Debug, Clone)]
pub struct StreamScript {
    /// Body chunks, written one at a time.
    pub chunks: Vec<Vec<u8>>,
    /// Keep the connection open after the last chunk instead of closing it.
    pub hold_open: bool,
}

impl Default for StreamScript {
    fn default() -> Self {
        Self {
            chunks: fixtures::split_every(&fixtures::sse_body(&fixtures::ordering_turn()), 7),
            hold_open: false,
        }
    }
}

/// Shared state behind the mock's handlers.
#[derive(Debug, Default)]
pub(crate) struct MockState {
    pub orders: Mutex<Vec<Order>>,
    pub next_order_id: AtomicI32,
    pub status_updates: Mutex<Vec<(OrderId, OrderStatus)>>,
    pub failing_statuses: Mutex<HashSet<OrderStatus>>,
    pub chat_requests: Mutex<Vec<ChatRequest>>,
    pub stream_script: Mutex<StreamScript>,
    pub rate_limit_chat: AtomicBool,
    pub voice_audio: Mutex<Vec<Vec<u8>>>,
    pub suggestion_hits: AtomicUsize,
}

/// Lock a mock mutex, ignoring poisoning from a panicked handler.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// A running mock API bound to an ephemeral local port.
///
/// The server stops when this value is dropped.
pub struct MockApi {
    addr: SocketAddr,
    state: Arc<MockState>,
    server: JoinHandle<()>,
}

impl MockApi {
    /// Bind to `127.0.0.1:0` and start serving.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let app = routes::router(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock API listener");
        let addr = listener.local_addr().expect("Failed to read local address");

        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            addr,
            state,
            server,
        }
    }

    /// Base URL of the mock.
    ///
    /// # Panics
    ///
    /// Never in practice; the address is always a valid URL.
    #[must_use]
    pub fn url(&self) -> Url {
        Url::parse(&format!("http://{}", self.addr)).expect("valid mock URL")
    }

    /// Client configuration pointing at the mock.
    #[must_use]
    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(self.url())
    }

    /// A client pointing at the mock.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn client(&self) -> JalapenoClient {
        JalapenoClient::new(&self.config()).expect("Failed to build client")
    }

    /// Answer the next streaming chat requests with `script`.
    pub fn script_stream(&self, script: StreamScript) {
        *lock(&self.state.stream_script) = script;
    }

    /// Answer streaming chat requests with `events`, split every `chunk_size`
    /// bytes.
    pub fn stream_events(&self, events: &[ChatEvent], chunk_size: usize) {
        self.script_stream(StreamScript {
            chunks: fixtures::split_every(&fixtures::sse_body(events), chunk_size),
            hold_open: false,
        });
    }

    /// Make every status update to `status` fail with a 500.
    pub fn fail_status(&self, status: OrderStatus) {
        lock(&self.state.failing_statuses).insert(status);
    }

    /// Answer `POST /api/chat` with 429.
    pub fn rate_limit_chat(&self, enabled: bool) {
        self.state.rate_limit_chat.store(enabled, Ordering::SeqCst);
    }

    /// Status updates received, in order.
    #[must_use]
    pub fn status_updates(&self) -> Vec<(OrderId, OrderStatus)> {
        lock(&self.state.status_updates).clone()
    }

    /// Chat requests received by either chat endpoint, in order.
    #[must_use]
    pub fn chat_requests(&self) -> Vec<ChatRequest> {
        lock(&self.state.chat_requests).clone()
    }

    /// Decoded audio received by the voice endpoint.
    #[must_use]
    pub fn voice_audio(&self) -> Vec<Vec<u8>> {
        lock(&self.state.voice_audio).clone()
    }

    /// How many times the prompt suggestions were requested.
    #[must_use]
    pub fn suggestion_hits(&self) -> usize {
        self.state.suggestion_hits.load(Ordering::SeqCst)
    }

    /// Number of orders stored.
    #[must_use]
    pub fn order_count(&self) -> usize {
        lock(&self.state.orders).len()
    }

    /// The stored copy of an order.
    #[must_use]
    pub fn order(&self, order_id: OrderId) -> Option<Order> {
        lock(&self.state.orders)
            .iter()
            .find(|o| o.id == order_id)
            .cloned()
    }
}

impl Drop for MockApi {
    fn drop(&mut self) {
        self.server.abort();
    }
}
