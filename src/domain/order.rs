//! Order aggregate: an immutable purchase snapshot with a mutable status.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// Order statuses are open strings so operators can extend the lifecycle
/// without a schema change; these are the ones the service itself writes.
pub mod status {
    pub const PENDING: &str = "PENDING";
    pub const PAID: &str = "PAID";
    pub const PAYMENT_FAILED: &str = "PAYMENT_FAILED";
    pub const SHIPPED: &str = "SHIPPED";
    pub const COMPLETED: &str = "COMPLETED";
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub total_price: Decimal,
    pub shipping_address: String,
    pub order_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    /// Unit price frozen at purchase time, decoupled from the live catalog.
    pub price: Decimal,
}

impl OrderItem {
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// Order plus its lines, the shape handlers return.
#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItemView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderItemView {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub price: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_total_multiplies_frozen_price() {
        let item = OrderItem {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            quantity: 3,
            price: Decimal::new(1250, 2),
        };
        assert_eq!(item.line_total(), Decimal::new(3750, 2));
    }
}
