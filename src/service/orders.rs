//! Order placement and lifecycle, plus the admin reporting queries.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::checkout;
use crate::domain::catalog::Product;
use crate::domain::order::{Order, OrderItemView, OrderView};
use crate::error::{Error, Result};
use crate::events;
use crate::report::{self, GroupBy, ReportItem, ReportOrder, SalesReport};
use crate::service::users::find_user;
use crate::service::{cart, catalog, Page, PageParams};

/// Convert the user's cart into a durable order.
///
/// Runs entirely inside one transaction: stock validation, the order and
/// item inserts, the guarded stock decrements, and the cart clear either
/// all commit or all roll back. The decrement re-checks stock in SQL so a
/// concurrent checkout that drained a product loses cleanly here instead
/// of overselling.
pub async fn place_order(
    pool: &PgPool,
    nats: &Option<async_nats::Client>,
    user_id: Uuid,
) -> Result<OrderView> {
    let mut tx = pool.begin().await?;
    find_user(&mut *tx, user_id).await?;
    let user_cart = cart::ensure_cart(&mut tx, user_id).await?;
    let lines = cart::load_lines(&mut *tx, user_cart.id).await?;

    let plan = checkout::plan(user_id, &lines, Utc::now())?;

    sqlx::query(
        "INSERT INTO orders (id, user_id, status, total_price, shipping_address, order_date) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(plan.order.id)
    .bind(plan.order.user_id)
    .bind(&plan.order.status)
    .bind(plan.order.total_price)
    .bind(&plan.order.shipping_address)
    .bind(plan.order.order_date)
    .execute(&mut *tx)
    .await?;

    for item in &plan.items {
        sqlx::query(
            "INSERT INTO order_items (id, order_id, product_id, quantity, price) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(item.id)
        .bind(item.order_id)
        .bind(item.product_id)
        .bind(item.quantity)
        .bind(item.price)
        .execute(&mut *tx)
        .await?;
    }

    for (product_id, quantity) in &plan.stock_decrements {
        let result = sqlx::query(
            "UPDATE products SET stock_quantity = stock_quantity - $2, updated_at = NOW() \
             WHERE id = $1 AND stock_quantity >= $2",
        )
        .bind(product_id)
        .bind(quantity)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            // A concurrent checkout drained this product between our read
            // and the decrement; dropping the transaction rolls it all back.
            let name = product_name(&lines, *product_id);
            return Err(Error::InsufficientStock(format!(
                "not enough stock for product: {name}"
            )));
        }
    }

    sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
        .bind(user_cart.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(order_id = %plan.order.id, user_id = %user_id, total = %plan.order.total_price, "order placed");
    events::publish_order_placed(nats, &plan.order).await;

    // Plan items are in cart-line order, so names pair up by position.
    let items = plan
        .items
        .iter()
        .zip(lines.iter())
        .map(|(item, (_, product))| OrderItemView {
            product_id: item.product_id,
            product_name: product.name.clone(),
            quantity: item.quantity,
            price: item.price,
        })
        .collect();

    Ok(OrderView {
        order: plan.order,
        items,
    })
}

fn product_name(lines: &[(crate::domain::cart::CartItem, Product)], product_id: Uuid) -> String {
    lines
        .iter()
        .find(|(_, p)| p.id == product_id)
        .map(|(_, p)| p.name.clone())
        .unwrap_or_else(|| product_id.to_string())
}

#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    order_id: Uuid,
    product_id: Uuid,
    product_name: String,
    quantity: i32,
    price: Decimal,
}

async fn load_items_for(
    exec: impl sqlx::PgExecutor<'_>,
    order_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<OrderItemView>>> {
    let rows = sqlx::query_as::<_, ItemRow>(
        "SELECT oi.order_id, oi.product_id, p.name AS product_name, oi.quantity, oi.price \
         FROM order_items oi JOIN products p ON p.id = oi.product_id \
         WHERE oi.order_id = ANY($1) ORDER BY oi.id",
    )
    .bind(order_ids)
    .fetch_all(exec)
    .await?;

    let mut by_order: HashMap<Uuid, Vec<OrderItemView>> = HashMap::new();
    for row in rows {
        by_order.entry(row.order_id).or_default().push(OrderItemView {
            product_id: row.product_id,
            product_name: row.product_name,
            quantity: row.quantity,
            price: row.price,
        });
    }
    Ok(by_order)
}

async fn attach_items(pool: &PgPool, orders: Vec<Order>) -> Result<Vec<OrderView>> {
    let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let mut items = load_items_for(pool, &ids).await?;
    Ok(orders
        .into_iter()
        .map(|order| {
            let items = items.remove(&order.id).unwrap_or_default();
            OrderView { order, items }
        })
        .collect())
}

pub async fn order_history(
    pool: &PgPool,
    user_id: Uuid,
    params: PageParams,
) -> Result<Page<OrderView>> {
    find_user(pool, user_id).await?;
    let orders = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE user_id = $1 ORDER BY order_date DESC LIMIT $2 OFFSET $3",
    )
    .bind(user_id)
    .bind(params.limit())
    .bind(params.offset())
    .fetch_all(pool)
    .await?;
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await?;

    Ok(Page::new(attach_items(pool, orders).await?, total, params))
}

pub async fn order_details(pool: &PgPool, user_id: Uuid, order_id: Uuid) -> Result<OrderView> {
    find_user(pool, user_id).await?;
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 AND user_id = $2")
        .bind(order_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("order not found with id: {order_id}")))?;

    let mut items = load_items_for(pool, &[order.id]).await?;
    let items = items.remove(&order.id).unwrap_or_default();
    Ok(OrderView { order, items })
}

pub async fn all_orders(
    pool: &PgPool,
    status: Option<String>,
    params: PageParams,
) -> Result<Page<OrderView>> {
    let (orders, total) = match status.filter(|s| !s.is_empty()) {
        Some(status) => {
            let orders = sqlx::query_as::<_, Order>(
                "SELECT * FROM orders WHERE status = $1 ORDER BY order_date DESC LIMIT $2 OFFSET $3",
            )
            .bind(&status)
            .bind(params.limit())
            .bind(params.offset())
            .fetch_all(pool)
            .await?;
            let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE status = $1")
                .bind(&status)
                .fetch_one(pool)
                .await?;
            (orders, total)
        }
        None => {
            let orders = sqlx::query_as::<_, Order>(
                "SELECT * FROM orders ORDER BY order_date DESC LIMIT $1 OFFSET $2",
            )
            .bind(params.limit())
            .bind(params.offset())
            .fetch_all(pool)
            .await?;
            let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
                .fetch_one(pool)
                .await?;
            (orders, total)
        }
    };

    Ok(Page::new(attach_items(pool, orders).await?, total, params))
}

pub async fn update_status(
    pool: &PgPool,
    nats: &Option<async_nats::Client>,
    order_id: Uuid,
    status: &str,
) -> Result<OrderView> {
    if status.trim().is_empty() {
        return Err(Error::InvalidArgument("status must not be empty".into()));
    }
    let order = sqlx::query_as::<_, Order>(
        "UPDATE orders SET status = $2 WHERE id = $1 RETURNING *",
    )
    .bind(order_id)
    .bind(status)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::NotFound(format!("order not found with id: {order_id}")))?;

    events::publish_order_status_changed(nats, order_id, status).await;

    let mut items = load_items_for(pool, &[order.id]).await?;
    let items = items.remove(&order.id).unwrap_or_default();
    Ok(OrderView { order, items })
}

/// Webhook-driven status transition: best-effort by design. An unknown
/// order id is logged and swallowed so the payment provider is not driven
/// into retrying a permanently-unresolvable delivery.
pub async fn update_status_from_webhook(
    pool: &PgPool,
    nats: &Option<async_nats::Client>,
    order_id: Uuid,
    status: &str,
) -> Result<()> {
    let result = sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
        .bind(order_id)
        .bind(status)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        tracing::error!(%order_id, "could not find order for webhook status update");
        return Ok(());
    }
    tracing::info!(%order_id, status, "order status updated from webhook");
    events::publish_order_status_changed(nats, order_id, status).await;
    Ok(())
}

// Admin reporting

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub total_sales: Decimal,
    pub order_count: i64,
    pub average_order_value: Decimal,
    pub user_count: i64,
    pub new_users_today: i64,
    pub product_count: i64,
    pub low_stock_products: Vec<Product>,
    pub recent_orders: Vec<OrderView>,
}

const LOW_STOCK_THRESHOLD: i32 = 5;
const RECENT_ORDERS: i64 = 5;

pub async fn dashboard(pool: &PgPool) -> Result<Dashboard> {
    let total_sales: Decimal =
        sqlx::query_scalar("SELECT COALESCE(SUM(total_price), 0) FROM orders")
            .fetch_one(pool)
            .await?;
    let order_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
        .fetch_one(pool)
        .await?;
    let user_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    let new_users_today: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE created_at::date = CURRENT_DATE")
            .fetch_one(pool)
            .await?;
    let product_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
        .fetch_one(pool)
        .await?;

    let low_stock_products = catalog::low_stock_products(pool, LOW_STOCK_THRESHOLD).await?;

    let recent = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders ORDER BY order_date DESC LIMIT $1",
    )
    .bind(RECENT_ORDERS)
    .fetch_all(pool)
    .await?;
    let recent_orders = attach_items(pool, recent).await?;

    Ok(Dashboard {
        total_sales,
        order_count,
        average_order_value: report::average(total_sales, order_count),
        user_count,
        new_users_today,
        product_count,
        low_stock_products,
        recent_orders,
    })
}

#[derive(Debug, sqlx::FromRow)]
struct ReportOrderRow {
    id: Uuid,
    user_id: Uuid,
    total_price: Decimal,
    order_date: DateTime<Utc>,
    first_name: String,
    last_name: String,
    email: String,
}

pub async fn sales_report(
    pool: &PgPool,
    start_date: NaiveDate,
    end_date: NaiveDate,
    group_by: GroupBy,
) -> Result<SalesReport> {
    if start_date > end_date {
        return Err(Error::InvalidArgument(
            "start date must not be after end date".into(),
        ));
    }

    let rows = sqlx::query_as::<_, ReportOrderRow>(
        "SELECT o.id, o.user_id, o.total_price, o.order_date, u.first_name, u.last_name, u.email \
         FROM orders o JOIN users u ON u.id = o.user_id \
         WHERE o.order_date::date BETWEEN $1 AND $2",
    )
    .bind(start_date)
    .bind(end_date)
    .fetch_all(pool)
    .await?;

    let order_ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let mut items = load_items_for(pool, &order_ids).await?;

    let orders: Vec<ReportOrder> = rows
        .into_iter()
        .map(|row| ReportOrder {
            id: row.id,
            user_id: row.user_id,
            customer_name: format!("{} {}", row.first_name, row.last_name),
            customer_email: row.email,
            total_price: row.total_price,
            order_date: row.order_date.date_naive(),
            items: items
                .remove(&row.id)
                .unwrap_or_default()
                .into_iter()
                .map(|item| ReportItem {
                    product_id: item.product_id,
                    product_name: item.product_name,
                    quantity: item.quantity,
                    price: item.price,
                })
                .collect(),
        })
        .collect();

    report::build_sales_report(start_date, end_date, group_by, &orders)
}
