//! User accounts: registration, login, profiles, address book, admin ops.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::auth;
use crate::config::Config;
use crate::domain::user::{Address, Role, User};
use crate::error::{Error, Result};
use crate::service::{Page, PageParams};

/// Client-facing user shape; never carries the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub user: UserResponse,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    #[validate(length(min = 1))]
    pub first_name: String,
    #[validate(length(min = 1))]
    pub last_name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProfileUpdateRequest {
    #[validate(length(min = 1))]
    pub first_name: String,
    #[validate(length(min = 1))]
    pub last_name: String,
    #[validate(length(min = 8))]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddressRequest {
    #[validate(length(min = 1))]
    pub street_address: String,
    #[validate(length(min = 1))]
    pub city: String,
    pub state: Option<String>,
    #[validate(length(min = 1))]
    pub postal_code: String,
    #[validate(length(min = 1))]
    pub country: String,
    pub phone_number: Option<String>,
    #[serde(default = "default_address_type")]
    pub address_type: String,
    #[serde(default)]
    pub is_default: bool,
}

fn default_address_type() -> String {
    "SHIPPING".to_string()
}

pub(crate) async fn find_user(
    exec: impl sqlx::PgExecutor<'_>,
    user_id: Uuid,
) -> Result<User> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(exec)
        .await?
        .ok_or_else(|| Error::NotFound(format!("user not found with id: {user_id}")))
}

/// Seed the admin account on startup so a fresh deployment has a way into
/// the admin surface. Idempotent: an existing account (by email) is left
/// untouched, and the upsert tolerates a concurrent seed from another
/// instance.
pub async fn seed_admin(pool: &PgPool, email: &str, password: &str) -> Result<()> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
        .bind(email)
        .fetch_one(pool)
        .await?;
    if exists {
        tracing::info!(email, "admin user already exists");
        return Ok(());
    }

    let password_hash = auth::hash_password(password)?;
    sqlx::query(
        "INSERT INTO users (id, email, password_hash, first_name, last_name, role) \
         VALUES ($1, $2, $3, $4, $5, $6) ON CONFLICT (email) DO NOTHING",
    )
    .bind(Uuid::now_v7())
    .bind(email)
    .bind(&password_hash)
    .bind("Admin")
    .bind("User")
    .bind(Role::Admin.as_str())
    .execute(pool)
    .await?;
    tracing::info!(email, "admin user created");
    Ok(())
}

pub async fn register(pool: &PgPool, req: RegisterRequest) -> Result<UserResponse> {
    req.validate()?;

    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(&req.email)
            .fetch_one(pool)
            .await?;
    if exists {
        return Err(Error::Conflict(format!(
            "user with email {} already exists",
            req.email
        )));
    }

    let password_hash = auth::hash_password(&req.password)?;
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (id, email, password_hash, first_name, last_name, role) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&req.email)
    .bind(&password_hash)
    .bind(&req.first_name)
    .bind(&req.last_name)
    .bind(Role::User.as_str())
    .fetch_one(pool)
    .await
    .map_err(|e| duplicate_email_error(e, &req.email))?;

    tracing::info!(user_id = %user.id, "registered new user");
    Ok(user.into())
}

/// The EXISTS probe above races with concurrent registrations; the unique
/// index on users.email is the arbiter, and losing it is a Conflict, not a
/// database failure.
fn duplicate_email_error(e: sqlx::Error, email: &str) -> Error {
    match &e {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            Error::Conflict(format!("user with email {email} already exists"))
        }
        _ => Error::from(e),
    }
}

pub async fn login(pool: &PgPool, config: &Config, req: LoginRequest) -> Result<LoginResponse> {
    req.validate()?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(&req.email)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::Unauthorized("invalid email or password".into()))?;

    if !auth::verify_password(&req.password, &user.password_hash)? {
        return Err(Error::Unauthorized("invalid email or password".into()));
    }

    let access_token = auth::issue_token(&user, &config.jwt_secret, config.jwt_ttl_secs)?;
    Ok(LoginResponse {
        access_token,
        user: user.into(),
    })
}

pub async fn get_profile(pool: &PgPool, user_id: Uuid) -> Result<UserResponse> {
    Ok(find_user(pool, user_id).await?.into())
}

pub async fn update_profile(
    pool: &PgPool,
    user_id: Uuid,
    req: ProfileUpdateRequest,
) -> Result<UserResponse> {
    req.validate()?;

    let mut tx = pool.begin().await?;
    let user = find_user(&mut *tx, user_id).await?;

    let password_hash = match req.password.as_deref() {
        Some(password) if !password.is_empty() => auth::hash_password(password)?,
        _ => user.password_hash,
    };

    let updated = sqlx::query_as::<_, User>(
        "UPDATE users SET first_name = $2, last_name = $3, password_hash = $4 \
         WHERE id = $1 RETURNING *",
    )
    .bind(user_id)
    .bind(&req.first_name)
    .bind(&req.last_name)
    .bind(&password_hash)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    Ok(updated.into())
}

// Address book

pub async fn list_addresses(pool: &PgPool, user_id: Uuid) -> Result<Vec<Address>> {
    find_user(pool, user_id).await?;
    Ok(sqlx::query_as::<_, Address>(
        "SELECT * FROM addresses WHERE user_id = $1 ORDER BY address_type, is_default DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?)
}

pub async fn addresses_by_type(
    pool: &PgPool,
    user_id: Uuid,
    address_type: &str,
) -> Result<Vec<Address>> {
    find_user(pool, user_id).await?;
    Ok(sqlx::query_as::<_, Address>(
        "SELECT * FROM addresses WHERE user_id = $1 AND address_type = $2 ORDER BY is_default DESC",
    )
    .bind(user_id)
    .bind(address_type)
    .fetch_all(pool)
    .await?)
}

/// The default address for a type, if one is set.
pub async fn default_address(
    pool: &PgPool,
    user_id: Uuid,
    address_type: &str,
) -> Result<Option<Address>> {
    find_user(pool, user_id).await?;
    Ok(sqlx::query_as::<_, Address>(
        "SELECT * FROM addresses WHERE user_id = $1 AND address_type = $2 AND is_default",
    )
    .bind(user_id)
    .bind(address_type)
    .fetch_optional(pool)
    .await?)
}

pub async fn add_address(pool: &PgPool, user_id: Uuid, req: AddressRequest) -> Result<Address> {
    req.validate()?;

    let mut tx = pool.begin().await?;
    find_user(&mut *tx, user_id).await?;

    if req.is_default {
        unset_default(&mut tx, user_id, &req.address_type).await?;
    }

    let address = sqlx::query_as::<_, Address>(
        "INSERT INTO addresses \
         (id, user_id, street_address, city, state, postal_code, country, phone_number, address_type, is_default) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(user_id)
    .bind(&req.street_address)
    .bind(&req.city)
    .bind(&req.state)
    .bind(&req.postal_code)
    .bind(&req.country)
    .bind(&req.phone_number)
    .bind(&req.address_type)
    .bind(req.is_default)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    Ok(address)
}

pub async fn update_address(
    pool: &PgPool,
    user_id: Uuid,
    address_id: Uuid,
    req: AddressRequest,
) -> Result<Address> {
    req.validate()?;

    let mut tx = pool.begin().await?;
    find_user(&mut *tx, user_id).await?;

    if req.is_default {
        unset_default(&mut tx, user_id, &req.address_type).await?;
    }

    let address = sqlx::query_as::<_, Address>(
        "UPDATE addresses SET street_address = $3, city = $4, state = $5, postal_code = $6, \
         country = $7, phone_number = $8, address_type = $9, is_default = $10 \
         WHERE id = $1 AND user_id = $2 RETURNING *",
    )
    .bind(address_id)
    .bind(user_id)
    .bind(&req.street_address)
    .bind(&req.city)
    .bind(&req.state)
    .bind(&req.postal_code)
    .bind(&req.country)
    .bind(&req.phone_number)
    .bind(&req.address_type)
    .bind(req.is_default)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| Error::NotFound(format!("address not found with id: {address_id}")))?;
    tx.commit().await?;

    Ok(address)
}

pub async fn delete_address(pool: &PgPool, user_id: Uuid, address_id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM addresses WHERE id = $1 AND user_id = $2")
        .bind(address_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!(
            "address not found with id: {address_id}"
        )));
    }
    Ok(())
}

async fn unset_default(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: Uuid,
    address_type: &str,
) -> Result<()> {
    sqlx::query(
        "UPDATE addresses SET is_default = FALSE \
         WHERE user_id = $1 AND address_type = $2 AND is_default",
    )
    .bind(user_id)
    .bind(address_type)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

// Admin operations

pub async fn list_users(
    pool: &PgPool,
    role: Option<String>,
    params: PageParams,
) -> Result<Page<UserResponse>> {
    // Reject bad role filters up front rather than silently matching nothing.
    let role = role.map(|r| r.parse::<Role>()).transpose()?;

    let (users, total) = match role {
        Some(role) => {
            let users = sqlx::query_as::<_, User>(
                "SELECT * FROM users WHERE role = $1 ORDER BY created_at LIMIT $2 OFFSET $3",
            )
            .bind(role.as_str())
            .bind(params.limit())
            .bind(params.offset())
            .fetch_all(pool)
            .await?;
            let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = $1")
                .bind(role.as_str())
                .fetch_one(pool)
                .await?;
            (users, total)
        }
        None => {
            let users = sqlx::query_as::<_, User>(
                "SELECT * FROM users ORDER BY created_at LIMIT $1 OFFSET $2",
            )
            .bind(params.limit())
            .bind(params.offset())
            .fetch_all(pool)
            .await?;
            let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
                .fetch_one(pool)
                .await?;
            (users, total)
        }
    };

    Ok(Page::new(
        users.into_iter().map(UserResponse::from).collect(),
        total,
        params,
    ))
}

pub async fn update_role(pool: &PgPool, user_id: Uuid, role: &str) -> Result<UserResponse> {
    let role: Role = role.parse()?;
    let user = sqlx::query_as::<_, User>("UPDATE users SET role = $2 WHERE id = $1 RETURNING *")
        .bind(user_id)
        .bind(role.as_str())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("user not found with id: {user_id}")))?;
    Ok(user.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    #[derive(Debug)]
    struct UniqueViolation;

    impl fmt::Display for UniqueViolation {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("duplicate key value violates unique constraint \"users_email_key\"")
        }
    }

    impl StdError for UniqueViolation {}

    impl DatabaseError for UniqueViolation {
        fn message(&self) -> &str {
            "duplicate key value violates unique constraint \"users_email_key\""
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some("23505".into())
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::UniqueViolation
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }
    }

    #[test]
    fn losing_the_email_unique_race_is_a_conflict() {
        let err = duplicate_email_error(
            sqlx::Error::Database(Box::new(UniqueViolation)),
            "jane@example.com",
        );
        match err {
            Error::Conflict(msg) => assert!(msg.contains("jane@example.com")),
            other => panic!("expected Conflict, got {other:?}"),
        }
    }

    #[test]
    fn other_database_errors_pass_through() {
        let err = duplicate_email_error(sqlx::Error::RowNotFound, "jane@example.com");
        assert!(matches!(err, Error::Database(_)));
    }
}
