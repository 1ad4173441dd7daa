//! Catalog records.

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::Price;

/// A product as returned by the catalog and embedded in chat payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: String,
    #[serde(default)]
    pub subcategory: Option<String>,
    /// Selling unit (`lb`, `gallon`, `each`, `case`, ...).
    pub unit: String,
    /// Price per unit.
    pub price: Price,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Units on hand.
    #[serde(default)]
    pub in_stock: i32,
}

impl Product {
    /// Whether any stock is on hand.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.in_stock > 0
    }
}
