//! Category and product endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::domain::catalog::{Category, Product};
use crate::error::Result;
use crate::http::AppState;
use crate::service::catalog::{self, CategoryRequest, ProductRequest, ProductSearch};
use crate::service::{Page, PageParams};

pub async fn create_category(
    State(s): State<AppState>,
    Json(req): Json<CategoryRequest>,
) -> Result<(StatusCode, Json<Category>)> {
    let category = catalog::create_category(&s.db, req).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn list_categories(State(s): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(catalog::list_categories(&s.db).await?))
}

pub async fn get_category(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Category>> {
    Ok(Json(catalog::get_category(&s.db, id).await?))
}

pub async fn delete_category(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode> {
    catalog::delete_category(&s.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn products_by_category(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Product>>> {
    Ok(Json(catalog::products_by_category(&s.db, id).await?))
}

pub async fn create_product(
    State(s): State<AppState>,
    Json(req): Json<ProductRequest>,
) -> Result<(StatusCode, Json<Product>)> {
    let product = catalog::create_product(&s.db, req).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn get_product(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Product>> {
    Ok(Json(catalog::find_product(&s.db, id).await?))
}

pub async fn list_products(State(s): State<AppState>) -> Result<Json<Vec<Product>>> {
    Ok(Json(catalog::list_products(&s.db).await?))
}

pub async fn update_product(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ProductRequest>,
) -> Result<Json<Product>> {
    Ok(Json(catalog::update_product(&s.db, id, req).await?))
}

pub async fn delete_product(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode> {
    catalog::delete_product(&s.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn search_products(
    State(s): State<AppState>,
    Query(search): Query<ProductSearch>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<Product>>> {
    Ok(Json(catalog::search_products(&s.db, search, params).await?))
}
