//! Bearer-token authentication and the named-route authorization policy.
//!
//! Tokens are HS256 JWTs carrying the user id and role claim. Authorization
//! is a single middleware consulting [`ROUTE_POLICIES`], a longest-prefix
//! table mapping route prefixes to the minimum role they require; paths
//! with no matching entry are public.

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::user::{Role, User};
use crate::error::{Error, Result};
use crate::http::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id.
    pub sub: Uuid,
    pub role: Role,
    pub exp: i64,
}

pub fn issue_token(user: &User, secret: &str, ttl_secs: i64) -> Result<String> {
    let claims = Claims {
        sub: user.id,
        role: user.role()?,
        exp: Utc::now().timestamp() + ttl_secs,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| Error::Internal(format!("token encoding failed: {e}")))
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| Error::Unauthorized("invalid or expired token".into()))
}

pub fn hash_password(password: &str) -> Result<String> {
    Ok(bcrypt::hash(password, bcrypt::DEFAULT_COST)?)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    Ok(bcrypt::verify(password, hash)?)
}

/// The authenticated caller, extracted from the bearer token.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let claims = claims_from_parts(parts, state)?;
        Ok(AuthUser {
            id: claims.sub,
            role: claims.role,
        })
    }
}

fn claims_from_parts(parts: &Parts, state: &AppState) -> Result<Claims> {
    let header = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Error::Unauthorized("missing bearer token".into()))?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| Error::Unauthorized("malformed authorization header".into()))?;
    verify_token(token, &state.config.jwt_secret)
}

impl Role {
    /// Admins satisfy every policy; users satisfy user-level policies.
    pub fn satisfies(&self, required: Role) -> bool {
        match required {
            Role::User => true,
            Role::Admin => *self == Role::Admin,
        }
    }
}

/// Minimum role per (method, route prefix). A `None` method matches every
/// method; the longest matching prefix wins, method-specific entries
/// breaking ties. Unlisted paths are public (registration, login, catalog
/// reads, payment redirects, webhooks).
const ROUTE_POLICIES: &[(Option<&str>, &str, Option<Role>)] = &[
    (None, "/api/users/register", None),
    (None, "/api/users/login", None),
    (None, "/api/users", Some(Role::User)),
    (None, "/api/cart", Some(Role::User)),
    (None, "/api/orders", Some(Role::User)),
    (None, "/api/payments/checkout", Some(Role::User)),
    (None, "/api/admin", Some(Role::Admin)),
    (Some("POST"), "/api/products", Some(Role::Admin)),
    (Some("PUT"), "/api/products", Some(Role::Admin)),
    (Some("DELETE"), "/api/products", Some(Role::Admin)),
    (Some("POST"), "/api/categories", Some(Role::Admin)),
    (Some("DELETE"), "/api/categories", Some(Role::Admin)),
];

pub fn required_role(method: &str, path: &str) -> Option<Role> {
    ROUTE_POLICIES
        .iter()
        .filter(|(m, prefix, _)| {
            m.map_or(true, |m| m == method) && path.starts_with(prefix)
        })
        .max_by_key(|(m, prefix, _)| (prefix.len(), m.is_some()))
        .and_then(|(_, _, role)| *role)
}

/// Guard middleware applied to the whole API router.
pub async fn enforce_route_policy(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response> {
    if let Some(required) = required_role(req.method().as_str(), req.uri().path()) {
        let (mut parts, body) = req.into_parts();
        let claims = claims_from_parts(&parts, &state)?;
        if !claims.role.satisfies(required) {
            return Err(Error::Forbidden);
        }
        parts.extensions.insert(AuthUser {
            id: claims.sub,
            role: claims.role,
        });
        return Ok(next.run(Request::from_parts(parts, body)).await);
    }
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(role: &str) -> User {
        User {
            id: Uuid::new_v4(),
            email: "jane@example.com".into(),
            password_hash: String::new(),
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            role: role.into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn token_round_trip_preserves_claims() {
        let u = user("ADMIN");
        let token = issue_token(&u, "secret", 3600).unwrap();
        let claims = verify_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, u.id);
        assert_eq!(claims.role, Role::Admin);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue_token(&user("USER"), "secret", 3600).unwrap();
        assert!(matches!(
            verify_token(&token, "other").unwrap_err(),
            Error::Unauthorized(_)
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = issue_token(&user("USER"), "secret", -120).unwrap();
        assert!(verify_token(&token, "secret").is_err());
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("hunter22").unwrap();
        assert!(verify_password("hunter22", &hash).unwrap());
        assert!(!verify_password("hunter23", &hash).unwrap());
    }

    #[test]
    fn policy_table_longest_prefix_wins() {
        assert_eq!(required_role("POST", "/api/users/register"), None);
        assert_eq!(required_role("POST", "/api/users/login"), None);
        assert_eq!(
            required_role("GET", "/api/users/0f0f/addresses"),
            Some(Role::User)
        );
        assert_eq!(
            required_role("GET", "/api/users/0f0f/addresses/type/BILLING"),
            Some(Role::User)
        );
        assert_eq!(
            required_role("GET", "/api/users/0f0f/addresses/default/SHIPPING"),
            Some(Role::User)
        );
        assert_eq!(required_role("GET", "/api/admin/sales"), Some(Role::Admin));
        assert_eq!(required_role("GET", "/health"), None);
    }

    #[test]
    fn catalog_reads_are_public_but_writes_are_admin() {
        assert_eq!(required_role("GET", "/api/products"), None);
        assert_eq!(required_role("GET", "/api/products/123"), None);
        assert_eq!(required_role("POST", "/api/products"), Some(Role::Admin));
        assert_eq!(required_role("PUT", "/api/products/123"), Some(Role::Admin));
        assert_eq!(required_role("DELETE", "/api/products/123"), Some(Role::Admin));
        assert_eq!(required_role("GET", "/api/categories"), None);
        assert_eq!(required_role("POST", "/api/categories"), Some(Role::Admin));
    }

    #[test]
    fn admin_satisfies_user_policy() {
        assert!(Role::Admin.satisfies(Role::User));
        assert!(Role::Admin.satisfies(Role::Admin));
        assert!(Role::User.satisfies(Role::User));
        assert!(!Role::User.satisfies(Role::Admin));
    }
}
