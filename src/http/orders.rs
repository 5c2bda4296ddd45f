//! Order endpoints: placement, history, details.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::domain::order::OrderView;
use crate::error::Result;
use crate::http::AppState;
use crate::service::orders;
use crate::service::{Page, PageParams};

pub async fn place_order(
    State(s): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<(StatusCode, Json<OrderView>)> {
    let order = orders::place_order(&s.db, &s.nats, user_id).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn order_history(
    State(s): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<OrderView>>> {
    Ok(Json(orders::order_history(&s.db, user_id, params).await?))
}

pub async fn order_details(
    State(s): State<AppState>,
    Path((user_id, order_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<OrderView>> {
    Ok(Json(orders::order_details(&s.db, user_id, order_id).await?))
}
