//! User registration, login, profile, and address endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use uuid::Uuid;

use crate::domain::user::Address;
use crate::error::Result;
use crate::http::AppState;
use crate::service::users::{
    self, AddressRequest, LoginRequest, LoginResponse, ProfileUpdateRequest, RegisterRequest,
    UserResponse,
};

pub async fn register(
    State(s): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    let user = users::register(&s.db, req).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login(
    State(s): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    Ok(Json(users::login(&s.db, &s.config, req).await?))
}

pub async fn get_profile(
    State(s): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserResponse>> {
    Ok(Json(users::get_profile(&s.db, user_id).await?))
}

pub async fn update_profile(
    State(s): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<ProfileUpdateRequest>,
) -> Result<Json<UserResponse>> {
    Ok(Json(users::update_profile(&s.db, user_id, req).await?))
}

pub async fn list_addresses(
    State(s): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<Address>>> {
    Ok(Json(users::list_addresses(&s.db, user_id).await?))
}

pub async fn addresses_by_type(
    State(s): State<AppState>,
    Path((user_id, address_type)): Path<(Uuid, String)>,
) -> Result<Json<Vec<Address>>> {
    Ok(Json(
        users::addresses_by_type(&s.db, user_id, &address_type).await?,
    ))
}

/// 204 when no default is set for the type.
pub async fn default_address(
    State(s): State<AppState>,
    Path((user_id, address_type)): Path<(Uuid, String)>,
) -> Result<Response> {
    match users::default_address(&s.db, user_id, &address_type).await? {
        Some(address) => Ok(Json(address).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

pub async fn add_address(
    State(s): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<AddressRequest>,
) -> Result<(StatusCode, Json<Address>)> {
    let address = users::add_address(&s.db, user_id, req).await?;
    Ok((StatusCode::CREATED, Json(address)))
}

pub async fn update_address(
    State(s): State<AppState>,
    Path((user_id, address_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<AddressRequest>,
) -> Result<Json<Address>> {
    Ok(Json(users::update_address(&s.db, user_id, address_id, req).await?))
}

pub async fn delete_address(
    State(s): State<AppState>,
    Path((user_id, address_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode> {
    users::delete_address(&s.db, user_id, address_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
