//! Checkout planning: turn a cart into an order snapshot.
//!
//! Planning is pure and all-or-nothing by construction: the planner either
//! returns a complete [`CheckoutPlan`] or an error, and nothing is mutated
//! until the store applies a plan inside a single transaction. Stock is
//! re-validated here against the current product rows, and again at apply
//! time by the guarded decrement, so a concurrent checkout losing the race
//! rolls back instead of overselling.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::cart::CartItem;
use crate::domain::catalog::Product;
use crate::domain::order::{status, Order, OrderItem};
use crate::error::Error;

/// Shipping-address capture happens outside checkout; orders carry a
/// placeholder until then.
pub const PLACEHOLDER_SHIPPING_ADDRESS: &str = "Default Shipping Address";

/// Everything a successful checkout will write, computed up front.
#[derive(Debug, Clone)]
pub struct CheckoutPlan {
    pub order: Order,
    pub items: Vec<OrderItem>,
    /// (product id, quantity) pairs to subtract from stock.
    pub stock_decrements: Vec<(Uuid, i32)>,
}

/// Build the order snapshot for a user's cart.
///
/// Each element of `lines` pairs a cart line with the current row of the
/// product it references. Fails with `InvalidState` on an empty cart and
/// `InsufficientStock` (naming the product) when any line exceeds current
/// stock; no partial plan is ever produced.
pub fn plan(
    user_id: Uuid,
    lines: &[(CartItem, Product)],
    now: DateTime<Utc>,
) -> Result<CheckoutPlan, Error> {
    if lines.is_empty() {
        return Err(Error::InvalidState(
            "cannot place an order with an empty cart".into(),
        ));
    }

    for (item, product) in lines {
        if !product.has_stock(item.quantity) {
            return Err(Error::InsufficientStock(format!(
                "not enough stock for product: {}",
                product.name
            )));
        }
    }

    let order_id = Uuid::now_v7();
    let mut items = Vec::with_capacity(lines.len());
    let mut stock_decrements = Vec::with_capacity(lines.len());
    let mut total_price = Decimal::ZERO;

    for (item, product) in lines {
        // The order freezes the product's current price; the cart's locked
        // price only governs what the cart displayed.
        items.push(OrderItem {
            id: Uuid::now_v7(),
            order_id,
            product_id: product.id,
            quantity: item.quantity,
            price: product.price,
        });
        total_price += product.price * Decimal::from(item.quantity);
        stock_decrements.push((product.id, item.quantity));
    }

    let order = Order {
        id: order_id,
        user_id,
        status: status::PENDING.to_string(),
        total_price,
        shipping_address: PLACEHOLDER_SHIPPING_ADDRESS.to_string(),
        order_date: now,
    };

    Ok(CheckoutPlan {
        order,
        items,
        stock_decrements,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: &str, stock: i32, price: Decimal) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            price,
            stock_quantity: stock,
            category_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn cart_line(product: &Product, quantity: i32) -> CartItem {
        CartItem {
            id: Uuid::new_v4(),
            cart_id: Uuid::new_v4(),
            product_id: product.id,
            quantity,
            price: Some(product.price),
        }
    }

    #[test]
    fn empty_cart_is_invalid_state() {
        let err = plan(Uuid::new_v4(), &[], Utc::now()).unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[test]
    fn successful_checkout_totals_and_decrements() {
        // Product A (stock 5, 10.00) x2 and B (stock 1, 5.00) x1.
        let a = product("A", 5, Decimal::new(1000, 2));
        let b = product("B", 1, Decimal::new(500, 2));
        let lines = vec![(cart_line(&a, 2), a.clone()), (cart_line(&b, 1), b.clone())];

        let plan = plan(Uuid::new_v4(), &lines, Utc::now()).unwrap();

        assert_eq!(plan.order.total_price, Decimal::new(2500, 2));
        assert_eq!(plan.order.status, status::PENDING);
        assert_eq!(plan.items.len(), 2);
        assert_eq!(plan.stock_decrements, vec![(a.id, 2), (b.id, 1)]);

        // Sum of item line totals equals the order total.
        let items_total: Decimal = plan.items.iter().map(|i| i.line_total()).sum();
        assert_eq!(items_total, plan.order.total_price);
    }

    #[test]
    fn any_short_line_aborts_the_whole_plan() {
        let a = product("A", 5, Decimal::new(1000, 2));
        let b = product("B", 0, Decimal::new(500, 2));
        let lines = vec![(cart_line(&a, 2), a), (cart_line(&b, 1), b)];

        let err = plan(Uuid::new_v4(), &lines, Utc::now()).unwrap_err();
        match err {
            Error::InsufficientStock(msg) => assert!(msg.contains('B')),
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
    }

    #[test]
    fn order_price_is_frozen_from_live_catalog() {
        // The cart locked 10.00 but the catalog now says 12.00; the order
        // snapshot takes the current catalog price.
        let a = product("A", 5, Decimal::new(1200, 2));
        let line = CartItem {
            price: Some(Decimal::new(1000, 2)),
            ..cart_line(&a, 1)
        };
        let plan = plan(Uuid::new_v4(), &[(line, a)], Utc::now()).unwrap();
        assert_eq!(plan.items[0].price, Decimal::new(1200, 2));
        assert_eq!(plan.order.total_price, Decimal::new(1200, 2));
    }

    #[test]
    fn exact_stock_match_is_allowed() {
        let a = product("A", 3, Decimal::new(100, 2));
        let plan = plan(Uuid::new_v4(), &[(cart_line(&a, 3), a.clone())], Utc::now()).unwrap();
        assert_eq!(plan.stock_decrements, vec![(a.id, 3)]);
    }
}
