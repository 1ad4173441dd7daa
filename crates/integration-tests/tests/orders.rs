//! Integration tests for the order endpoints and the status progression.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use jalapeno_client::{
    ClientError, FileTimelineStore, ProgressionSchedule, StatusBus, TimelineStore,
};
use jalapeno_core::{NewOrder, NewOrderItem, OrderId, OrderStatus, Price, ProductId};
use jalapeno_integration_tests::MockApi;

fn eggs_and_chicken() -> NewOrder {
    NewOrder::new(vec![
        NewOrderItem::new(ProductId::new(1), 5.0),
        NewOrderItem::new(ProductId::new(2), 2.0),
    ])
}

fn fast_schedule() -> ProgressionSchedule {
    ProgressionSchedule::from_offsets(
        Duration::from_millis(50),
        Duration::from_millis(100),
        Duration::from_millis(150),
    )
    .expect("valid schedule")
}

// =============================================================================
// Endpoint Tests
// =============================================================================

#[tokio::test]
async fn test_health() {
    let api = MockApi::start().await;
    let health = api.client().health().await.expect("health");
    assert!(health.is_healthy());
}

#[tokio::test]
async fn test_create_and_fetch_order() {
    let api = MockApi::start().await;
    let client = api.client();

    let created = client
        .create_order(&eggs_and_chicken())
        .await
        .expect("create");

    assert_eq!(created.status, OrderStatus::Pending);
    assert_eq!(created.items.len(), 2);
    // 5 x 3.49 + 2 x 4.99
    assert_eq!(created.total, Price::from_cents(2743));
    // Naive timestamps from the server are read as UTC
    assert!((Utc::now() - created.created_at).num_seconds().abs() < 60);

    let fetched = client.get_order(created.id).await.expect("get");
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn test_list_orders_newest_first() {
    let api = MockApi::start().await;
    let client = api.client();

    for _ in 0..3 {
        client
            .create_order(&eggs_and_chicken())
            .await
            .expect("create");
    }

    let all = client.list_orders(0, 50).await.expect("list");
    let ids: Vec<i32> = all.iter().map(|o| o.id.as_i32()).collect();
    assert_eq!(ids, vec![3, 2, 1]);

    let page = client.list_orders(1, 1).await.expect("list");
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id, OrderId::new(2));
}

#[tokio::test]
async fn test_empty_order_is_never_sent() {
    let api = MockApi::start().await;

    let err = api
        .client()
        .create_order(&NewOrder::new(vec![]))
        .await
        .expect_err("empty order");

    assert!(matches!(err, ClientError::InvalidRequest(_)));
    assert_eq!(api.order_count(), 0);
}

#[tokio::test]
async fn test_unknown_product_is_not_found() {
    let api = MockApi::start().await;

    let err = api
        .client()
        .create_order(&NewOrder::new(vec![NewOrderItem::new(ProductId::new(99), 1.0)]))
        .await
        .expect_err("unknown product");

    match err {
        ClientError::NotFound(detail) => assert_eq!(detail, "Product 99 not found"),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_order_is_not_found() {
    let api = MockApi::start().await;

    let err = api
        .client()
        .get_order(OrderId::new(404))
        .await
        .expect_err("missing order");

    assert!(matches!(err, ClientError::NotFound(ref detail) if detail == "Order not found"));
}

#[tokio::test]
async fn test_update_status() {
    let api = MockApi::start().await;
    let client = api.client();
    let order = client
        .create_order(&eggs_and_chicken())
        .await
        .expect("create");

    let update = client
        .update_order_status(order.id, OrderStatus::Cancelled)
        .await
        .expect("update");

    assert_eq!(update.message, "Order status updated to cancelled");
    assert_eq!(
        api.order(order.id).map(|o| o.status),
        Some(OrderStatus::Cancelled)
    );
}

#[tokio::test]
async fn test_server_error_carries_detail() {
    let api = MockApi::start().await;
    let client = api.client();
    api.fail_status(OrderStatus::Shipped);
    let order = client
        .create_order(&eggs_and_chicken())
        .await
        .expect("create");

    let err = client
        .update_order_status(order.id, OrderStatus::Shipped)
        .await
        .expect_err("failing status");

    match err {
        ClientError::Api { status, detail } => {
            assert_eq!(status, 500);
            assert_eq!(detail, "database is locked");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

// =============================================================================
// Progression Tests
// =============================================================================

#[tokio::test]
async fn test_progression_delivers_order() {
    let api = MockApi::start().await;
    let client = api.client();
    let dir = tempfile::tempdir().expect("tempdir");
    let config = api.config().with_schedule(fast_schedule());
    let timeline = Arc::new(FileTimelineStore::new(dir.path()));

    let order = client
        .create_order(&eggs_and_chicken())
        .await
        .expect("create");
    let progression = client.progression(timeline.clone(), StatusBus::default(), &config);
    let mut events = progression.bus().subscribe();

    let report = progression
        .start(order.id)
        .wait()
        .await
        .expect("progression");

    assert!(report.is_complete());
    assert_eq!(
        api.status_updates(),
        vec![
            (order.id, OrderStatus::Confirmed),
            (order.id, OrderStatus::Shipped),
            (order.id, OrderStatus::Delivered),
        ]
    );
    assert_eq!(
        api.order(order.id).map(|o| o.status),
        Some(OrderStatus::Delivered)
    );

    for expected in [
        OrderStatus::Confirmed,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
    ] {
        assert_eq!(events.try_recv().expect("event").status, expected);
    }

    // Persisted to disk, readable by a fresh store
    assert!(dir.path().join(format!("order-{}.json", order.id)).exists());
    let recorded = FileTimelineStore::new(dir.path())
        .load(order.id)
        .await
        .expect("load");
    let statuses: Vec<OrderStatus> = recorded.entries().map(|(status, _)| status).collect();
    assert_eq!(
        statuses,
        vec![
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
        ]
    );
    let confirmed = recorded.reached_at(OrderStatus::Confirmed).expect("confirmed");
    let delivered = recorded.reached_at(OrderStatus::Delivered).expect("delivered");
    assert!(delivered >= confirmed);
}

#[tokio::test]
async fn test_progression_skips_failed_step() {
    let api = MockApi::start().await;
    let client = api.client();
    api.fail_status(OrderStatus::Shipped);
    let dir = tempfile::tempdir().expect("tempdir");
    let config = api.config().with_schedule(fast_schedule());
    let timeline = Arc::new(FileTimelineStore::new(dir.path()));

    let order = client
        .create_order(&eggs_and_chicken())
        .await
        .expect("create");
    let report = client
        .progression(timeline.clone(), StatusBus::default(), &config)
        .start(order.id)
        .wait()
        .await
        .expect("progression");

    assert_eq!(
        report.applied,
        vec![OrderStatus::Confirmed, OrderStatus::Delivered]
    );
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, OrderStatus::Shipped);
    assert_eq!(api.status_updates().len(), 3);

    let recorded = timeline.load(order.id).await.expect("load");
    assert!(recorded.reached_at(OrderStatus::Shipped).is_none());
    assert_eq!(recorded.current(), Some(OrderStatus::Delivered));
}

#[tokio::test]
async fn test_progression_for_unknown_order_fails_every_step() {
    let api = MockApi::start().await;
    let client = api.client();
    let dir = tempfile::tempdir().expect("tempdir");
    let config = api.config().with_schedule(fast_schedule());

    let report = client
        .progression(
            Arc::new(FileTimelineStore::new(dir.path())),
            StatusBus::default(),
            &config,
        )
        .start(OrderId::new(77))
        .wait()
        .await
        .expect("progression");

    assert!(report.applied.is_empty());
    assert_eq!(report.failed.len(), 3);
}
