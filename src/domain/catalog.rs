//! Product catalog: categories and products.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock_quantity: i32,
    pub category_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Whether current stock covers a requested quantity.
    pub fn has_stock(&self, quantity: i32) -> bool {
        self.stock_quantity >= quantity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: i32) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: "Widget".into(),
            description: None,
            price: Decimal::new(1000, 2),
            stock_quantity: stock,
            category_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn stock_check_is_inclusive() {
        assert!(product(5).has_stock(5));
        assert!(!product(5).has_stock(6));
        assert!(!product(0).has_stock(1));
    }
}
