//! Cart operations: lazy creation, quantity-merge additions, price-lock.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::cart::{cart_total, Cart, CartItem, CartItemView, CartView};
use crate::domain::catalog::Product;
use crate::error::{Error, Result};
use crate::service::users::find_user;

/// One cart line joined with the product it references.
#[derive(Debug, sqlx::FromRow)]
struct LineRow {
    item_id: Uuid,
    cart_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    locked_price: Option<Decimal>,
    name: String,
    description: Option<String>,
    price: Decimal,
    stock_quantity: i32,
    category_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl LineRow {
    fn split(self) -> (CartItem, Product) {
        (
            CartItem {
                id: self.item_id,
                cart_id: self.cart_id,
                product_id: self.product_id,
                quantity: self.quantity,
                price: self.locked_price,
            },
            Product {
                id: self.product_id,
                name: self.name,
                description: self.description,
                price: self.price,
                stock_quantity: self.stock_quantity,
                category_id: self.category_id,
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
        )
    }
}

const LINE_QUERY: &str = "SELECT ci.id AS item_id, ci.cart_id, ci.product_id, ci.quantity, \
     ci.price AS locked_price, p.name, p.description, p.price, p.stock_quantity, \
     p.category_id, p.created_at, p.updated_at \
     FROM cart_items ci JOIN products p ON p.id = ci.product_id \
     WHERE ci.cart_id = $1 ORDER BY ci.id";

pub(crate) async fn load_lines(
    exec: impl sqlx::PgExecutor<'_>,
    cart_id: Uuid,
) -> Result<Vec<(CartItem, Product)>> {
    let rows = sqlx::query_as::<_, LineRow>(LINE_QUERY)
        .bind(cart_id)
        .fetch_all(exec)
        .await?;
    Ok(rows.into_iter().map(LineRow::split).collect())
}

/// The cart row for a user, created lazily on first access.
pub(crate) async fn ensure_cart(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: Uuid,
) -> Result<Cart> {
    sqlx::query("INSERT INTO carts (id, user_id) VALUES ($1, $2) ON CONFLICT (user_id) DO NOTHING")
        .bind(Uuid::now_v7())
        .bind(user_id)
        .execute(&mut **tx)
        .await?;
    Ok(
        sqlx::query_as::<_, Cart>("SELECT * FROM carts WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&mut **tx)
            .await?,
    )
}

fn view(cart: &Cart, lines: Vec<(CartItem, Product)>) -> CartView {
    let priced: Vec<(CartItem, Decimal)> = lines
        .iter()
        .map(|(item, product)| (item.clone(), product.price))
        .collect();
    let total_price = cart_total(&priced);
    let items = lines
        .into_iter()
        .map(|(item, product)| {
            let price = item.effective_price(product.price);
            CartItemView {
                product_id: product.id,
                product_name: product.name,
                quantity: item.quantity,
                price,
                line_total: item.line_total(product.price),
            }
        })
        .collect();
    CartView {
        id: cart.id,
        items,
        total_price,
    }
}

pub async fn get_cart(pool: &PgPool, user_id: Uuid) -> Result<CartView> {
    let mut tx = pool.begin().await?;
    find_user(&mut *tx, user_id).await?;
    let cart = ensure_cart(&mut tx, user_id).await?;
    let lines = load_lines(&mut *tx, cart.id).await?;
    tx.commit().await?;
    Ok(view(&cart, lines))
}

pub async fn add_product(
    pool: &PgPool,
    user_id: Uuid,
    product_id: Uuid,
    quantity: i32,
) -> Result<CartView> {
    if quantity < 1 {
        return Err(Error::InvalidArgument("quantity must be at least 1".into()));
    }

    let mut tx = pool.begin().await?;
    find_user(&mut *tx, user_id).await?;
    let product = super::catalog::find_product(&mut *tx, product_id).await?;
    if !product.has_stock(quantity) {
        return Err(Error::InsufficientStock(format!(
            "not enough stock for product: {}",
            product.name
        )));
    }

    let cart = ensure_cart(&mut tx, user_id).await?;

    let existing = sqlx::query_as::<_, CartItem>(
        "SELECT * FROM cart_items WHERE cart_id = $1 AND product_id = $2",
    )
    .bind(cart.id)
    .bind(product_id)
    .fetch_optional(&mut *tx)
    .await?;

    match existing {
        Some(item) => {
            // Merge into the existing line; the original locked price stands.
            let merged = item.quantity + quantity;
            if !product.has_stock(merged) {
                return Err(Error::InsufficientStock(format!(
                    "not enough stock for product: {}",
                    product.name
                )));
            }
            sqlx::query("UPDATE cart_items SET quantity = $2 WHERE id = $1")
                .bind(item.id)
                .bind(merged)
                .execute(&mut *tx)
                .await?;
        }
        None => {
            // New line captures the current product price.
            sqlx::query(
                "INSERT INTO cart_items (id, cart_id, product_id, quantity, price) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(Uuid::now_v7())
            .bind(cart.id)
            .bind(product_id)
            .bind(quantity)
            .bind(product.price)
            .execute(&mut *tx)
            .await?;
        }
    }

    let lines = load_lines(&mut *tx, cart.id).await?;
    tx.commit().await?;
    Ok(view(&cart, lines))
}

pub async fn update_item(
    pool: &PgPool,
    user_id: Uuid,
    product_id: Uuid,
    quantity: i32,
) -> Result<CartView> {
    // Quantity zero or below is a removal.
    if quantity <= 0 {
        return remove_product(pool, user_id, product_id).await;
    }

    let mut tx = pool.begin().await?;
    find_user(&mut *tx, user_id).await?;
    let product = super::catalog::find_product(&mut *tx, product_id).await?;
    let cart = find_cart(&mut tx, user_id).await?;

    let item = sqlx::query_as::<_, CartItem>(
        "SELECT * FROM cart_items WHERE cart_id = $1 AND product_id = $2",
    )
    .bind(cart.id)
    .bind(product_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| Error::NotFound("product not in cart".into()))?;

    if !product.has_stock(quantity) {
        return Err(Error::InsufficientStock(format!(
            "not enough stock for product: {}",
            product.name
        )));
    }

    sqlx::query("UPDATE cart_items SET quantity = $2 WHERE id = $1")
        .bind(item.id)
        .bind(quantity)
        .execute(&mut *tx)
        .await?;

    let lines = load_lines(&mut *tx, cart.id).await?;
    tx.commit().await?;
    Ok(view(&cart, lines))
}

pub async fn remove_product(pool: &PgPool, user_id: Uuid, product_id: Uuid) -> Result<CartView> {
    let mut tx = pool.begin().await?;
    find_user(&mut *tx, user_id).await?;
    super::catalog::find_product(&mut *tx, product_id).await?;
    let cart = find_cart(&mut tx, user_id).await?;

    let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND product_id = $2")
        .bind(cart.id)
        .bind(product_id)
        .execute(&mut *tx)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::NotFound("product not in cart".into()));
    }

    let lines = load_lines(&mut *tx, cart.id).await?;
    tx.commit().await?;
    Ok(view(&cart, lines))
}

/// Idempotent: clearing an absent or already-empty cart is not an error.
pub async fn clear_cart(pool: &PgPool, user_id: Uuid) -> Result<()> {
    find_user(pool, user_id).await?;
    sqlx::query(
        "DELETE FROM cart_items WHERE cart_id IN (SELECT id FROM carts WHERE user_id = $1)",
    )
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(())
}

async fn find_cart(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: Uuid,
) -> Result<Cart> {
    sqlx::query_as::<_, Cart>("SELECT * FROM carts WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| Error::InvalidState("user does not have a cart".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cart() -> Cart {
        Cart {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
        }
    }

    fn product(name: &str, price: Decimal) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            price,
            stock_quantity: 10,
            category_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn item(cart_id: Uuid, product: &Product, quantity: i32, locked: Option<Decimal>) -> CartItem {
        CartItem {
            id: Uuid::new_v4(),
            cart_id,
            product_id: product.id,
            quantity,
            price: locked,
        }
    }

    #[test]
    fn view_totals_use_locked_price_with_fallback() {
        let c = cart();
        let a = product("A", Decimal::new(1200, 2));
        let b = product("B", Decimal::new(500, 2));
        let lines = vec![
            (item(c.id, &a, 2, Some(Decimal::new(1000, 2))), a.clone()),
            (item(c.id, &b, 1, None), b.clone()),
        ];
        let v = view(&c, lines);
        // 2 x 10.00 locked + 1 x 5.00 live fallback
        assert_eq!(v.total_price, Decimal::new(2500, 2));
        assert_eq!(v.items[0].price, Decimal::new(1000, 2));
        assert_eq!(v.items[1].price, Decimal::new(500, 2));
        assert_eq!(v.items[0].line_total, Decimal::new(2000, 2));
    }

    #[test]
    fn empty_cart_view() {
        let c = cart();
        let v = view(&c, vec![]);
        assert!(v.is_empty());
        assert_eq!(v.total_price, Decimal::ZERO);
    }
}
