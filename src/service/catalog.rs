//! Catalog administration and browsing: categories, products, stock.

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::Validate;

use crate::domain::catalog::{Category, Product};
use crate::error::{Error, Result};
use crate::service::{Page, PageParams};

#[derive(Debug, Deserialize, Validate)]
pub struct CategoryRequest {
    #[validate(length(min = 1))]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProductRequest {
    #[validate(length(min = 1))]
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    #[validate(range(min = 0))]
    pub stock_quantity: i32,
    pub category_id: Uuid,
}

impl ProductRequest {
    fn check(&self) -> Result<()> {
        self.validate()?;
        if self.price < Decimal::ZERO {
            return Err(Error::InvalidArgument("price must not be negative".into()));
        }
        Ok(())
    }
}

/// Optional filters for product search, all combinable.
#[derive(Debug, Default, Deserialize)]
pub struct ProductSearch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub category_id: Option<Uuid>,
    pub in_stock: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct StockUpdate {
    pub product_id: Uuid,
    pub stock_quantity: i32,
}

// Categories

pub async fn create_category(pool: &PgPool, req: CategoryRequest) -> Result<Category> {
    req.validate()?;
    Ok(sqlx::query_as::<_, Category>(
        "INSERT INTO categories (id, name, description) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&req.name)
    .bind(&req.description)
    .fetch_one(pool)
    .await?)
}

pub async fn list_categories(pool: &PgPool) -> Result<Vec<Category>> {
    Ok(
        sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY name")
            .fetch_all(pool)
            .await?,
    )
}

pub async fn get_category(pool: &PgPool, category_id: Uuid) -> Result<Category> {
    sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
        .bind(category_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("category not found with id: {category_id}")))
}

/// Deleting a category disassociates its products rather than deleting them.
pub async fn delete_category(pool: &PgPool, category_id: Uuid) -> Result<()> {
    let mut tx = pool.begin().await?;
    sqlx::query("UPDATE products SET category_id = NULL WHERE category_id = $1")
        .bind(category_id)
        .execute(&mut *tx)
        .await?;
    let result = sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(category_id)
        .execute(&mut *tx)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!(
            "category not found with id: {category_id}"
        )));
    }
    tx.commit().await?;
    Ok(())
}

// Products

pub async fn create_product(pool: &PgPool, req: ProductRequest) -> Result<Product> {
    req.check()?;
    get_category(pool, req.category_id).await?;

    Ok(sqlx::query_as::<_, Product>(
        "INSERT INTO products (id, name, description, price, stock_quantity, category_id) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&req.name)
    .bind(&req.description)
    .bind(req.price)
    .bind(req.stock_quantity)
    .bind(req.category_id)
    .fetch_one(pool)
    .await?)
}

pub async fn find_product(exec: impl sqlx::PgExecutor<'_>, product_id: Uuid) -> Result<Product> {
    sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_optional(exec)
        .await?
        .ok_or_else(|| Error::NotFound(format!("product not found with id: {product_id}")))
}

pub async fn list_products(pool: &PgPool) -> Result<Vec<Product>> {
    Ok(
        sqlx::query_as::<_, Product>("SELECT * FROM products ORDER BY created_at DESC")
            .fetch_all(pool)
            .await?,
    )
}

pub async fn products_by_category(pool: &PgPool, category_id: Uuid) -> Result<Vec<Product>> {
    get_category(pool, category_id).await?;
    Ok(sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE category_id = $1 ORDER BY name",
    )
    .bind(category_id)
    .fetch_all(pool)
    .await?)
}

pub async fn update_product(
    pool: &PgPool,
    product_id: Uuid,
    req: ProductRequest,
) -> Result<Product> {
    req.check()?;
    get_category(pool, req.category_id).await?;

    sqlx::query_as::<_, Product>(
        "UPDATE products SET name = $2, description = $3, price = $4, stock_quantity = $5, \
         category_id = $6, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(product_id)
    .bind(&req.name)
    .bind(&req.description)
    .bind(req.price)
    .bind(req.stock_quantity)
    .bind(req.category_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::NotFound(format!("product not found with id: {product_id}")))
}

pub async fn delete_product(pool: &PgPool, product_id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(product_id)
        .execute(pool)
        .await
        .map_err(|e| match &e {
            // order_items keep their product reference; purchased products
            // cannot be hard-deleted.
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23503") => {
                Error::Conflict("product is referenced by existing orders".into())
            }
            _ => Error::from(e),
        })?;
    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!(
            "product not found with id: {product_id}"
        )));
    }
    Ok(())
}

fn push_search_filters<'a>(qb: &mut QueryBuilder<'a, Postgres>, search: &'a ProductSearch) {
    if let Some(name) = &search.name {
        qb.push(" AND name ILIKE ").push_bind(format!("%{name}%"));
    }
    if let Some(description) = &search.description {
        qb.push(" AND description ILIKE ")
            .push_bind(format!("%{description}%"));
    }
    if let Some(min_price) = search.min_price {
        qb.push(" AND price >= ").push_bind(min_price);
    }
    if let Some(max_price) = search.max_price {
        qb.push(" AND price <= ").push_bind(max_price);
    }
    if let Some(category_id) = search.category_id {
        qb.push(" AND category_id = ").push_bind(category_id);
    }
    if search.in_stock == Some(true) {
        qb.push(" AND stock_quantity > 0");
    }
}

pub async fn search_products(
    pool: &PgPool,
    search: ProductSearch,
    params: PageParams,
) -> Result<Page<Product>> {
    let mut qb = QueryBuilder::new("SELECT * FROM products WHERE TRUE");
    push_search_filters(&mut qb, &search);
    qb.push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(params.limit())
        .push(" OFFSET ")
        .push_bind(params.offset());
    let products = qb.build_query_as::<Product>().fetch_all(pool).await?;

    let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM products WHERE TRUE");
    push_search_filters(&mut count_qb, &search);
    let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

    Ok(Page::new(products, total, params))
}

pub async fn low_stock_products(pool: &PgPool, threshold: i32) -> Result<Vec<Product>> {
    Ok(sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE stock_quantity <= $1 ORDER BY stock_quantity",
    )
    .bind(threshold)
    .fetch_all(pool)
    .await?)
}

/// Bulk stock set. All rows update or none; an unknown id aborts the batch.
pub async fn update_stock(pool: &PgPool, updates: Vec<StockUpdate>) -> Result<Vec<Product>> {
    for update in &updates {
        if update.stock_quantity < 0 {
            return Err(Error::InvalidArgument(
                "stock quantity must not be negative".into(),
            ));
        }
    }

    let mut tx = pool.begin().await?;
    let mut products = Vec::with_capacity(updates.len());
    for update in &updates {
        let product = sqlx::query_as::<_, Product>(
            "UPDATE products SET stock_quantity = $2, updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(update.product_id)
        .bind(update.stock_quantity)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            Error::NotFound(format!("product not found with id: {}", update.product_id))
        })?;
        products.push(product);
    }
    tx.commit().await?;

    Ok(products)
}
