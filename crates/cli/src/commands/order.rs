//! Order commands.
//!
//! # Usage
//!
//! ```bash
//! # Place an order for 5 units of product 12 and follow it to delivery
//! jalapeno order place --item 12:5 --watch
//!
//! jalapeno order list --limit 10
//! jalapeno order show 42
//! jalapeno order set-status 42 cancelled
//! jalapeno order timeline 42
//! ```

#![allow(clippy::print_stdout)]

use std::sync::Arc;

use jalapeno_client::{
    ClientConfig, FileTimelineStore, JalapenoClient, StatusBus, TimelineStore,
};
use jalapeno_core::{NewOrder, NewOrderItem, Order, OrderId, OrderStatus, ProductId};
use tokio::sync::broadcast::error::RecvError;

use super::CommandError;

/// Parse an order line given as `<product_id>:<quantity>`.
pub fn parse_item(value: &str) -> Result<NewOrderItem, String> {
    let (id, quantity) = value
        .split_once(':')
        .ok_or_else(|| format!("expected <product_id>:<quantity>, got `{value}`"))?;

    let product_id: ProductId = id
        .trim()
        .parse()
        .map_err(|e| format!("invalid product id `{id}`: {e}"))?;
    let quantity: f64 = quantity
        .trim()
        .parse()
        .map_err(|e| format!("invalid quantity `{quantity}`: {e}"))?;

    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(format!("quantity must be positive, got {quantity}"));
    }

    Ok(NewOrderItem::new(product_id, quantity))
}

/// Place an order and run its status progression to the end.
pub async fn place(
    client: &JalapenoClient,
    config: &ClientConfig,
    items: Vec<NewOrderItem>,
    watch: bool,
) -> Result<(), CommandError> {
    let order = client.create_order(&NewOrder::new(items)).await?;
    print_order(&order);

    let timeline = Arc::new(FileTimelineStore::new(config.timeline_dir.clone()));
    let progression = client.progression(timeline, StatusBus::default(), config);

    // Subscribe before starting so no step is missed
    let mut events = progression.bus().subscribe();
    let handle = progression.start(order.id);
    drop(progression);

    let printer = watch.then(|| {
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => println!(
                        "{}  order #{} is now {}",
                        event.at.format("%H:%M:%S"),
                        event.order_id,
                        event.status
                    ),
                    Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => break,
                }
            }
        })
    });
    if !watch {
        println!(
            "Progressing order #{} (finishes in {}s)...",
            order.id,
            config.schedule.total().as_secs()
        );
    }

    let report = handle.wait().await?;
    if let Some(printer) = printer {
        // The bus closes once the progression task has dropped its sender
        printer.await?;
    }

    for (status, error) in &report.failed {
        println!("Could not move order #{} to {status}: {error}", report.order_id);
    }
    if let Some(last) = report.applied.last() {
        println!("Order #{} is {last}.", report.order_id);
    }
    Ok(())
}

/// Show one order with its items.
pub async fn show(client: &JalapenoClient, order_id: OrderId) -> Result<(), CommandError> {
    let order = client.get_order(order_id).await?;
    print_order(&order);
    Ok(())
}

/// List orders, newest first.
pub async fn list(client: &JalapenoClient, skip: u32, limit: u32) -> Result<(), CommandError> {
    let orders = client.list_orders(skip, limit).await?;
    if orders.is_empty() {
        println!("No orders.");
        return Ok(());
    }

    for order in &orders {
        println!(
            "#{:<6} {:<10} {:>10}  {}  {} lines",
            order.id,
            order.status,
            order.total.to_string(),
            order.created_at.format("%Y-%m-%d %H:%M"),
            order.items.len()
        );
    }
    Ok(())
}

/// Set an order's status directly.
pub async fn set_status(
    client: &JalapenoClient,
    order_id: OrderId,
    status: OrderStatus,
) -> Result<(), CommandError> {
    let update = client.update_order_status(order_id, status).await?;
    println!("{}", update.message);
    Ok(())
}

/// Show when an order reached each status, from the local timeline.
pub async fn timeline(config: &ClientConfig, order_id: OrderId) -> Result<(), CommandError> {
    let store = FileTimelineStore::new(config.timeline_dir.clone());
    let timeline = store.load(order_id).await?;

    if timeline.is_empty() {
        println!("No timeline recorded for order #{order_id}.");
        return Ok(());
    }

    for (status, at) in timeline.entries() {
        println!("{:<10} {}", status, at.to_rfc3339());
    }
    Ok(())
}

pub(crate) fn print_order(order: &Order) {
    println!(
        "Order #{} - {} - {} - placed {}",
        order.id,
        order.status,
        order.total,
        order.created_at.format("%Y-%m-%d %H:%M UTC")
    );
    for item in &order.items {
        let name = item
            .product
            .as_ref()
            .map_or_else(|| format!("product #{}", item.product_id), |p| p.name.clone());
        println!(
            "  {name} x {} @ {} = {}",
            item.quantity,
            item.unit_price,
            item.line_total()
        );
    }
}
