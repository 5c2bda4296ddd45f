//! Environment-driven service configuration.

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Base URL used to build payment success/cancel redirects.
    pub server_url: String,
    pub jwt_secret: String,
    pub jwt_ttl_secs: i64,
    /// Shared secret the payment provider sends in the webhook signature header.
    pub webhook_secret: String,
    pub nats_url: Option<String>,
    /// Admin account seeded on startup so a fresh deployment is administrable.
    pub admin_email: String,
    pub admin_password: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is required")?;
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .context("PORT must be a number")?;
        let server_url =
            std::env::var("SERVER_URL").unwrap_or_else(|_| format!("http://localhost:{port}"));
        let jwt_secret = std::env::var("JWT_SECRET").context("JWT_SECRET is required")?;
        let jwt_ttl_secs = std::env::var("JWT_TTL_SECS")
            .unwrap_or_else(|_| "86400".to_string())
            .parse()
            .context("JWT_TTL_SECS must be a number")?;
        let webhook_secret = std::env::var("WEBHOOK_SECRET").unwrap_or_default();
        let nats_url = std::env::var("NATS_URL").ok();
        let admin_email =
            std::env::var("ADMIN_EMAIL").unwrap_or_else(|_| "admin@example.com".to_string());
        let admin_password =
            std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".to_string());

        Ok(Self {
            database_url,
            port,
            server_url,
            jwt_secret,
            jwt_ttl_secs,
            webhook_secret,
            nats_url,
            admin_email,
            admin_password,
        })
    }
}
