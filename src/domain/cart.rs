//! Cart aggregate: one cart per user, at most one line per product.
//!
//! Prices are locked into the line at add-time so later catalog changes do
//! not move an already-built cart. Legacy rows predating the lock carry a
//! NULL price and fall back to the live product price. The cart total is
//! never stored; it is derived from the lines on every read.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Cart {
    pub id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CartItem {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: Option<Decimal>,
}

impl CartItem {
    /// Locked-in price, falling back to the live price for legacy rows.
    pub fn effective_price(&self, live_price: Decimal) -> Decimal {
        self.price.unwrap_or(live_price)
    }

    pub fn line_total(&self, live_price: Decimal) -> Decimal {
        self.effective_price(live_price) * Decimal::from(self.quantity)
    }
}

/// Derived cart total over (line, live product price) pairs.
pub fn cart_total(lines: &[(CartItem, Decimal)]) -> Decimal {
    lines
        .iter()
        .fold(Decimal::ZERO, |acc, (item, live)| acc + item.line_total(*live))
}

/// Client-facing cart line with the pricing already resolved.
#[derive(Debug, Clone, Serialize)]
pub struct CartItemView {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub price: Decimal,
    pub line_total: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub id: Uuid,
    pub items: Vec<CartItemView>,
    pub total_price: Decimal,
}

impl CartView {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(quantity: i32, locked: Option<Decimal>) -> CartItem {
        CartItem {
            id: Uuid::new_v4(),
            cart_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            quantity,
            price: locked,
        }
    }

    #[test]
    fn locked_price_wins_over_live_price() {
        let item = line(3, Some(Decimal::new(1000, 2)));
        // catalog later repriced to 99.99
        assert_eq!(item.line_total(Decimal::new(9999, 2)), Decimal::new(3000, 2));
    }

    #[test]
    fn legacy_line_falls_back_to_live_price() {
        let item = line(2, None);
        assert_eq!(item.effective_price(Decimal::new(500, 2)), Decimal::new(500, 2));
        assert_eq!(item.line_total(Decimal::new(500, 2)), Decimal::new(1000, 2));
    }

    #[test]
    fn total_is_recomputed_from_lines() {
        let lines = vec![
            (line(2, Some(Decimal::new(1000, 2))), Decimal::new(1200, 2)),
            (line(1, None), Decimal::new(500, 2)),
        ];
        // 2 x 10.00 locked + 1 x 5.00 fallback
        assert_eq!(cart_total(&lines), Decimal::new(2500, 2));
        assert_eq!(cart_total(&[]), Decimal::ZERO);
    }
}
