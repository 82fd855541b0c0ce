//! Cart line and order value objects.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{OrderId, ProductId};
use super::product::Product;

/// One line of the shopping cart.
///
/// The embedded [`Product`] is the snapshot taken when the line was created;
/// `quantity` is kept within `[1, product.stock]` by the cart ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub product: Product,
    pub quantity: u32,
}

impl CartLine {
    /// Snapshot price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.product.price * Decimal::from(self.quantity)
    }
}

/// Order lifecycle states as reported by the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Created,
    Confirmed,
    Delivering,
    Done,
    Canceled,
}

/// An order as returned by the orders endpoints.
///
/// List responses omit `items`; the detail endpoint includes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub customer_name: String,
    pub phone: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promo_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_amount: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<OrderItem>,
}

/// One line of a placed order.
///
/// Title and price are snapshots taken at checkout; the referenced product
/// may have changed or disappeared since.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub product_id: ProductId,
    pub title_snapshot: String,
    pub price_snapshot: Decimal,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::id::CategoryId;

    fn product(price: u64, stock: u32) -> Product {
        Product {
            id: ProductId::new(1),
            category_id: CategoryId::new(1),
            title: "Tulip mix".into(),
            slug: "tulip-mix".into(),
            description: String::new(),
            price: Decimal::from(price),
            stock,
            is_active: true,
            image_url: String::new(),
            images: Vec::new(),
            is_new: false,
            is_hit: false,
            created_at: DateTime::<Utc>::MIN_UTC,
        }
    }

    #[test]
    fn test_line_total() {
        let line = CartLine {
            product_id: ProductId::new(1),
            product: product(250, 10),
            quantity: 3,
        };
        assert_eq!(line.line_total(), Decimal::from(750));
    }

    #[test]
    fn test_order_status_wire_names() {
        let status: OrderStatus = serde_json::from_str("\"delivering\"").unwrap();
        assert_eq!(status, OrderStatus::Delivering);
        assert_eq!(serde_json::to_string(&OrderStatus::Done).unwrap(), "\"done\"");
    }
}
