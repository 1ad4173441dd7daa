//! Order records and the order creation request.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use super::catalog::Product;
use super::id::{OrderId, OrderItemId, ProductId};
use super::price::Price;
use super::status::OrderStatus;

/// A placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub total: Price,
    pub status: OrderStatus,
    /// Creation time. The API may send a naive timestamp, which is UTC.
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Total number of units across all lines.
    #[must_use]
    pub fn unit_count(&self) -> f64 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

/// A line of a placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub product_id: ProductId,
    pub quantity: f64,
    /// Unit price captured when the order was placed.
    pub unit_price: Price,
    #[serde(default)]
    pub product: Option<Product>,
}

impl OrderItem {
    /// Line total at the captured unit price.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.unit_price.times(self.quantity)
    }
}

/// Request body for `POST /api/orders`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    pub items: Vec<NewOrderItem>,
}

/// One requested line of a new order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub quantity: f64,
}

/// Reasons a [`NewOrder`] is rejected before it is sent.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrderValidationError {
    #[error("order must contain at least one item")]
    Empty,
    #[error("quantity for product {product_id} must be positive, got {quantity}")]
    InvalidQuantity { product_id: ProductId, quantity: f64 },
}

impl NewOrder {
    /// Create an order request from its lines.
    #[must_use]
    pub const fn new(items: Vec<NewOrderItem>) -> Self {
        Self { items }
    }

    /// Check the request against the rules the API enforces.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no lines or a quantity is not a positive
    /// finite number.
    pub fn validate(&self) -> Result<(), OrderValidationError> {
        if self.items.is_empty() {
            return Err(OrderValidationError::Empty);
        }
        for item in &self.items {
            if !item.quantity.is_finite() || item.quantity <= 0.0 {
                return Err(OrderValidationError::InvalidQuantity {
                    product_id: item.product_id,
                    quantity: item.quantity,
                });
            }
        }
        Ok(())
    }
}

impl NewOrderItem {
    /// Create an order line.
    #[must_use]
    pub const fn new(product_id: ProductId, quantity: f64) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// Accept RFC 3339 timestamps as well as naive ones (treated as UTC).
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};

    use super::*;

    #[test]
    fn test_order_deserialize_naive_timestamp() {
        let json = r#"{
            "id": 12,
            "total": 29.95,
            "status": "pending",
            "created_at": "2024-03-01T09:15:30.123456",
            "items": [
                {"id": 1, "product_id": 4, "quantity": 5, "unit_price": 5.99}
            ]
        }"#;

        let order: Order = serde_json::from_str(json).expect("deserialize");
        assert_eq!(order.id, OrderId::new(12));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.created_at.day(), 1);
        assert_eq!(order.created_at.hour(), 9);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].line_total(), Price::from_cents(2995));
        assert!((order.unit_count() - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_order_deserialize_rfc3339_timestamp() {
        let json = r#"{
            "id": 3,
            "total": 1,
            "status": "shipped",
            "created_at": "2024-03-01T09:15:30+02:00",
            "items": []
        }"#;

        let order: Order = serde_json::from_str(json).expect("deserialize");
        assert_eq!(order.created_at.hour(), 7);
    }

    #[test]
    fn test_new_order_validation() {
        assert_eq!(NewOrder::new(vec![]).validate(), Err(OrderValidationError::Empty));

        let bad = NewOrder::new(vec![NewOrderItem::new(ProductId::new(1), 0.0)]);
        assert!(matches!(
            bad.validate(),
            Err(OrderValidationError::InvalidQuantity { .. })
        ));

        let good = NewOrder::new(vec![NewOrderItem::new(ProductId::new(1), 2.5)]);
        assert_eq!(good.validate(), Ok(()));
    }

    #[test]
    fn test_new_order_serializes_api_shape() {
        let order = NewOrder::new(vec![NewOrderItem::new(ProductId::new(9), 2.0)]);
        let json = serde_json::to_value(&order).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({"items": [{"product_id": 9, "quantity": 2.0}]})
        );
    }
}
