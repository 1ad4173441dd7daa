//! In-memory shopping cart.
//!
//! Chat `cart_add` instructions land here. Adding a product already in the
//! cart increases its quantity instead of adding a second line.

use serde::{Deserialize, Serialize};

use super::catalog::Product;
use super::id::ProductId;
use super::order::{NewOrder, NewOrderItem};
use super::price::Price;

/// A cart line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub product: Product,
    pub quantity: f64,
}

impl CartItem {
    /// Line total at the product's current price.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product.price.times(self.quantity)
    }
}

/// A per-session cart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Add `quantity` of `product`, merging with an existing line.
    pub fn add(&mut self, product: Product, quantity: f64) {
        if let Some(line) = self
            .items
            .iter_mut()
            .find(|line| line.product.id == product.id)
        {
            line.quantity += quantity;
            line.product = product;
        } else {
            self.items.push(CartItem { product, quantity });
        }
    }

    /// Quantity of a product currently in the cart.
    #[must_use]
    pub fn quantity_of(&self, product_id: ProductId) -> f64 {
        self.items
            .iter()
            .find(|line| line.product.id == product_id)
            .map_or(0.0, |line| line.quantity)
    }

    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of all line totals.
    #[must_use]
    pub fn total(&self) -> Price {
        self.items.iter().map(CartItem::line_total).sum()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// The order request for checking out this cart.
    #[must_use]
    pub fn to_order(&self) -> NewOrder {
        NewOrder::new(
            self.items
                .iter()
                .map(|line| NewOrderItem::new(line.product.id, line.quantity))
                .collect(),
        )
    }
}
