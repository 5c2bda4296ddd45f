//! HTTP surface: router assembly and shared state.

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth;
use crate::config::Config;

mod admin;
mod cart;
mod catalog;
mod orders;
mod payments;
mod users;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub nats: Option<async_nats::Client>,
    pub config: Arc<Config>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/health",
            get(|| async {
                Json(serde_json::json!({"status": "healthy", "service": "storefront"}))
            }),
        )
        // users
        .route("/api/users/register", post(users::register))
        .route("/api/users/login", post(users::login))
        .route(
            "/api/users/:user_id",
            get(users::get_profile).put(users::update_profile),
        )
        .route(
            "/api/users/:user_id/addresses",
            get(users::list_addresses).post(users::add_address),
        )
        .route(
            "/api/users/:user_id/addresses/type/:address_type",
            get(users::addresses_by_type),
        )
        .route(
            "/api/users/:user_id/addresses/default/:address_type",
            get(users::default_address),
        )
        .route(
            "/api/users/:user_id/addresses/:address_id",
            put(users::update_address).delete(users::delete_address),
        )
        // catalog
        .route(
            "/api/categories",
            get(catalog::list_categories).post(catalog::create_category),
        )
        .route(
            "/api/categories/:id",
            get(catalog::get_category).delete(catalog::delete_category),
        )
        .route("/api/categories/:id/products", get(catalog::products_by_category))
        .route(
            "/api/products",
            get(catalog::list_products).post(catalog::create_product),
        )
        .route("/api/products/search", get(catalog::search_products))
        .route(
            "/api/products/:id",
            get(catalog::get_product)
                .put(catalog::update_product)
                .delete(catalog::delete_product),
        )
        // cart
        .route("/api/cart/:user_id", get(cart::get_cart).delete(cart::clear_cart))
        .route("/api/cart/:user_id/items", post(cart::add_product))
        .route(
            "/api/cart/:user_id/items/:product_id",
            put(cart::update_item).delete(cart::remove_product),
        )
        // orders
        .route(
            "/api/orders/users/:user_id",
            post(orders::place_order).get(orders::order_history),
        )
        .route("/api/orders/users/:user_id/:order_id", get(orders::order_details))
        // admin
        .route("/api/admin/dashboard", get(admin::dashboard))
        .route("/api/admin/sales", get(admin::sales_report))
        .route("/api/admin/users", get(admin::list_users))
        .route("/api/admin/users/:user_id", get(admin::user_details))
        .route("/api/admin/users/:user_id/role", put(admin::update_role))
        .route("/api/admin/inventory/low-stock", get(admin::low_stock))
        .route("/api/admin/inventory/stock", put(admin::update_stock))
        .route("/api/admin/orders", get(admin::all_orders))
        .route("/api/admin/orders/:order_id/status", put(admin::update_order_status))
        // payments
        .route(
            "/api/payments/checkout/:user_id/:order_id",
            post(payments::create_checkout_session),
        )
        .route("/api/payments/success", get(payments::success))
        .route("/api/payments/cancel", get(payments::cancel))
        .route("/api/webhooks/payment", post(payments::webhook))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::enforce_route_policy,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
