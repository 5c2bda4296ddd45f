//! Admin endpoints: dashboard, sales reporting, user/inventory/order management.

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::catalog::Product;
use crate::domain::order::OrderView;
use crate::error::Result;
use crate::http::AppState;
use crate::report::{GroupBy, SalesReport};
use crate::service::catalog::{self, StockUpdate};
use crate::service::orders::{self, Dashboard};
use crate::service::users::{self, UserResponse};
use crate::service::{Page, PageParams};

pub async fn dashboard(State(s): State<AppState>) -> Result<Json<Dashboard>> {
    Ok(Json(orders::dashboard(&s.db).await?))
}

#[derive(Debug, Deserialize)]
pub struct SalesParams {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub group_by: Option<String>,
}

pub async fn sales_report(
    State(s): State<AppState>,
    Query(params): Query<SalesParams>,
) -> Result<Json<SalesReport>> {
    let group_by: GroupBy = params
        .group_by
        .as_deref()
        .unwrap_or("day")
        .parse()
        .unwrap_or(GroupBy::Day);
    Ok(Json(
        orders::sales_report(&s.db, params.start_date, params.end_date, group_by).await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct UserListParams {
    pub role: Option<String>,
}

pub async fn list_users(
    State(s): State<AppState>,
    Query(filter): Query<UserListParams>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<UserResponse>>> {
    Ok(Json(users::list_users(&s.db, filter.role, params).await?))
}

pub async fn user_details(
    State(s): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserResponse>> {
    Ok(Json(users::get_profile(&s.db, user_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct RoleUpdate {
    pub role: String,
}

pub async fn update_role(
    State(s): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<RoleUpdate>,
) -> Result<Json<UserResponse>> {
    Ok(Json(users::update_role(&s.db, user_id, &req.role).await?))
}

#[derive(Debug, Deserialize)]
pub struct ThresholdParams {
    pub threshold: Option<i32>,
}

pub async fn low_stock(
    State(s): State<AppState>,
    Query(params): Query<ThresholdParams>,
) -> Result<Json<Vec<Product>>> {
    Ok(Json(
        catalog::low_stock_products(&s.db, params.threshold.unwrap_or(5)).await?,
    ))
}

pub async fn update_stock(
    State(s): State<AppState>,
    Json(updates): Json<Vec<StockUpdate>>,
) -> Result<Json<Vec<Product>>> {
    Ok(Json(catalog::update_stock(&s.db, updates).await?))
}

#[derive(Debug, Deserialize)]
pub struct OrderListParams {
    pub status: Option<String>,
}

pub async fn all_orders(
    State(s): State<AppState>,
    Query(filter): Query<OrderListParams>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<OrderView>>> {
    Ok(Json(orders::all_orders(&s.db, filter.status, params).await?))
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

pub async fn update_order_status(
    State(s): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<StatusUpdate>,
) -> Result<Json<OrderView>> {
    Ok(Json(
        orders::update_status(&s.db, &s.nats, order_id, &req.status).await?,
    ))
}
