//! Cart endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::cart::CartView;
use crate::error::Result;
use crate::http::AppState;
use crate::service::cart;

#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct QuantityParams {
    pub quantity: i32,
}

pub async fn get_cart(
    State(s): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<CartView>> {
    Ok(Json(cart::get_cart(&s.db, user_id).await?))
}

pub async fn add_product(
    State(s): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<AddToCartRequest>,
) -> Result<Json<CartView>> {
    Ok(Json(
        cart::add_product(&s.db, user_id, req.product_id, req.quantity).await?,
    ))
}

pub async fn update_item(
    State(s): State<AppState>,
    Path((user_id, product_id)): Path<(Uuid, Uuid)>,
    Query(params): Query<QuantityParams>,
) -> Result<Json<CartView>> {
    Ok(Json(
        cart::update_item(&s.db, user_id, product_id, params.quantity).await?,
    ))
}

pub async fn remove_product(
    State(s): State<AppState>,
    Path((user_id, product_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<CartView>> {
    Ok(Json(cart::remove_product(&s.db, user_id, product_id).await?))
}

pub async fn clear_cart(State(s): State<AppState>, Path(user_id): Path<Uuid>) -> Result<StatusCode> {
    cart::clear_cart(&s.db, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
