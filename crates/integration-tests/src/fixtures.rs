//! Catalog data and chat stream bodies used by the mock API.

use jalapeno_client::ChatEvent;
use jalapeno_core::{CartAddition, Price, Product, ProductId, ProductSuggestion};

fn product(id: i32, name: &str, category: &str, unit: &str, cents: i64) -> Product {
    Product {
        id: ProductId::new(id),
        name: name.to_string(),
        description: None,
        category: category.to_string(),
        subcategory: None,
        unit: unit.to_string(),
        price: Price::from_cents(cents),
        image_url: None,
        in_stock: 100,
    }
}

#[must_use]
pub fn chicken_breast() -> Product {
    product(1, "Chicken Breast", "Meat & Poultry", "lb", 349)
}

#[must_use]
pub fn large_eggs() -> Product {
    product(2, "Large Eggs", "Dairy & Eggs", "dozen", 499)
}

#[must_use]
pub fn yellow_onions() -> Product {
    product(3, "Yellow Onions", "Produce", "lb", 89)
}

/// The mock catalog.
#[must_use]
pub fn products() -> Vec<Product> {
    vec![chicken_breast(), large_eggs(), yellow_onions()]
}

/// Look up a catalog product.
#[must_use]
pub fn product_by_id(id: ProductId) -> Option<Product> {
    products().into_iter().find(|p| p.id == id)
}

/// Render events as the streaming endpoint frames them, with a keep-alive
/// comment after the first record.
#[must_use]
pub fn sse_body(events: &[ChatEvent]) -> Vec<u8> {
    let mut body = Vec::new();
    for (n, event) in events.iter().enumerate() {
        body.extend_from_slice(b"data: ");
        // ChatEvent only holds strings and numbers
        body.extend_from_slice(serde_json::to_string(event).unwrap_or_default().as_bytes());
        body.extend_from_slice(b"\n\n");
        if n == 0 {
            body.extend_from_slice(b": keep-alive\n\n");
        }
    }
    body
}

/// Split `body` into chunks of `size` bytes, cutting through lines and
/// multi-byte characters alike.
#[must_use]
pub fn split_every(body: &[u8], size: usize) -> Vec<Vec<u8>> {
    body.chunks(size.max(1)).map(<[u8]>::to_vec).collect()
}

/// A complete assistant turn: two text fragments, suggestions, a cart
/// addition and `done`.
#[must_use]
pub fn ordering_turn() -> Vec<ChatEvent> {
    vec![
        ChatEvent::Text {
            content: "Sure! Adding 5 lb of chicken ".to_string(),
        },
        ChatEvent::Text {
            content: "breast and a dozen eggs. Anything else? 🌶️".to_string(),
        },
        ChatEvent::Suggestions {
            suggestions: vec![ProductSuggestion {
                product: chicken_breast(),
                suggested_quantity: 5.0,
                confidence: 0.92,
            }],
        },
        ChatEvent::CartAdd {
            items: vec![
                CartAddition {
                    product: chicken_breast(),
                    quantity: 5.0,
                },
                CartAddition {
                    product: large_eggs(),
                    quantity: 1.0,
                },
            ],
        },
        ChatEvent::Done,
    ]
}
