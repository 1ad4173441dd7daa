//! Handlers of the mock API. Response shapes follow the real service,
//! including naive `created_at` timestamps and `{"detail": ...}` errors.

use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use base64::Engine;
use chrono::Utc;
use futures::StreamExt;
use jalapeno_core::{
    ChatReply, ChatRequest, NewOrder, Order, OrderId, OrderItem, OrderItemId, OrderStatus, Price,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::fixtures;
use crate::mock::{MockState, lock};

type AppState = Arc<MockState>;

/// Pause between streamed chunks so they reach the client separately.
const CHUNK_GAP: Duration = Duration::from_millis(2);

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/orders", get(list_orders).post(create_order))
        .route("/api/orders/{id}", get(get_order))
        .route("/api/orders/{id}/status", patch(update_status))
        .route("/api/chat", post(chat))
        .route("/api/chat/stream", post(chat_stream))
        .route("/api/chat/suggestions", get(suggestions))
        .route("/api/voice", post(voice))
        .with_state(state)
}

fn detail(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "detail": message.into() }))).into_response()
}

/// Serialize an order the way the service does: `created_at` without offset.
fn order_json(order: &Order) -> Value {
    let mut value = serde_json::to_value(order).unwrap_or(Value::Null);
    value["created_at"] = json!(
        order
            .created_at
            .naive_utc()
            .format("%Y-%m-%dT%H:%M:%S%.6f")
            .to_string()
    );
    value
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

async fn create_order(State(state): State<AppState>, Json(new_order): Json<NewOrder>) -> Response {
    if new_order.items.is_empty() {
        return detail(StatusCode::BAD_REQUEST, "Order must contain at least one item");
    }

    let mut items = Vec::with_capacity(new_order.items.len());
    for (n, line) in (1..).zip(&new_order.items) {
        let Some(product) = fixtures::product_by_id(line.product_id) else {
            return detail(
                StatusCode::NOT_FOUND,
                format!("Product {} not found", line.product_id),
            );
        };
        items.push(OrderItem {
            id: OrderItemId::new(n),
            product_id: product.id,
            quantity: line.quantity,
            unit_price: product.price,
            product: Some(product),
        });
    }

    let order = Order {
        id: OrderId::new(state.next_order_id.fetch_add(1, Ordering::SeqCst) + 1),
        total: items.iter().map(OrderItem::line_total).sum::<Price>(),
        status: OrderStatus::Pending,
        created_at: Utc::now(),
        items,
    };
    let body = order_json(&order);
    lock(&state.orders).push(order);

    (StatusCode::OK, Json(body)).into_response()
}

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    skip: usize,
    #[serde(default = "default_limit")]
    limit: usize,
}

const fn default_limit() -> usize {
    50
}

async fn list_orders(State(state): State<AppState>, Query(page): Query<Page>) -> Json<Value> {
    let orders = lock(&state.orders);
    let listed: Vec<Value> = orders
        .iter()
        .rev()
        .skip(page.skip)
        .take(page.limit)
        .map(order_json)
        .collect();
    Json(Value::Array(listed))
}

async fn get_order(State(state): State<AppState>, Path(id): Path<i32>) -> Response {
    let orders = lock(&state.orders);
    orders.iter().find(|o| o.id == OrderId::new(id)).map_or_else(
        || detail(StatusCode::NOT_FOUND, "Order not found"),
        |order| Json(order_json(order)).into_response(),
    )
}

#[derive(Debug, Deserialize)]
struct StatusQuery {
    status: Option<String>,
}

async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<StatusQuery>,
) -> Response {
    let Some(raw) = query.status else {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "detail": [{"loc": ["query", "status"], "msg": "field required", "type": "value_error.missing"}]
            })),
        )
            .into_response();
    };
    let Ok(status) = raw.parse::<OrderStatus>() else {
        return detail(StatusCode::BAD_REQUEST, format!("Invalid status: {raw}"));
    };

    let order_id = OrderId::new(id);
    lock(&state.status_updates).push((order_id, status));

    if lock(&state.failing_statuses).contains(&status) {
        return detail(StatusCode::INTERNAL_SERVER_ERROR, "database is locked");
    }

    let mut orders = lock(&state.orders);
    let Some(order) = orders.iter_mut().find(|o| o.id == order_id) else {
        return detail(StatusCode::NOT_FOUND, "Order not found");
    };
    order.status = status;

    Json(json!({ "message": format!("Order status updated to {status}") })).into_response()
}

fn reply_for(message: &str) -> ChatReply {
    ChatReply {
        message: format!("I found a few options for \"{message}\"."),
        suggestions: vec![jalapeno_core::ProductSuggestion {
            product: fixtures::large_eggs(),
            suggested_quantity: 2.0,
            confidence: 0.8,
        }],
        needs_clarification: false,
        clarification_question: None,
        error: None,
    }
}

async fn chat(State(state): State<AppState>, Json(request): Json<ChatRequest>) -> Response {
    if state.rate_limit_chat.load(Ordering::SeqCst) {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, "7")],
            Json(json!({ "detail": "Too many requests" })),
        )
            .into_response();
    }

    let reply = reply_for(&request.message);
    lock(&state.chat_requests).push(request);
    Json(reply).into_response()
}

async fn chat_stream(State(state): State<AppState>, Json(request): Json<ChatRequest>) -> Response {
    lock(&state.chat_requests).push(request);
    let script = lock(&state.stream_script).clone();

    let chunks = futures::stream::iter(script.chunks).then(|chunk| async move {
        tokio::time::sleep(CHUNK_GAP).await;
        Ok::<_, Infallible>(Bytes::from(chunk))
    });
    let body = if script.hold_open {
        Body::from_stream(chunks.chain(futures::stream::pending()))
    } else {
        Body::from_stream(chunks)
    };

    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response()
}

async fn suggestions(State(state): State<AppState>) -> Json<Value> {
    state.suggestion_hits.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "suggestions": [
            "I need 20 lbs of chicken breast",
            "Add 5 dozen eggs to my order",
            "What vegetables do you have?",
        ]
    }))
}

#[derive(Debug, Deserialize)]
struct VoiceBody {
    audio_base64: String,
}

async fn voice(State(state): State<AppState>, Json(body): Json<VoiceBody>) -> Response {
    let Ok(audio) = base64::engine::general_purpose::STANDARD.decode(&body.audio_base64) else {
        return detail(StatusCode::BAD_REQUEST, "Invalid audio encoding");
    };
    lock(&state.voice_audio).push(audio);

    let transcript = "two dozen eggs";
    let mut reply = serde_json::to_value(reply_for(transcript)).unwrap_or(Value::Null);
    reply["transcribed_text"] = json!(transcript);
    Json(reply).into_response()
}
