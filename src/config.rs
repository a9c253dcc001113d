//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use serde::Deserialize;
use std::time::Duration;

/// Signing secret used when `JWT_USER_SECRET_KEY` is not set.
///
/// Only suitable for local development; startup logs a warning when it is in effect.
pub const DEV_SECRET: &str = "devsecret";

/// Upper bound applied to `SESSION_TTL_SECS` (one year).
pub const MAX_SESSION_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Which set of database credentials a pool connects with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbRole {
    /// Full access: admin routes and migrations.
    Admin,
    /// Restricted access: public signup.
    Worker,
}

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DB_HOST`, `DB_NAME` (required): PostgreSQL location
/// - `DB_USER` / `DB_PASSWORD`: worker credentials
/// - `DB_ADMIN_USER` / `DB_ADMIN_PASSWORD`: admin credentials
/// - `REDIS_HOST` (required): `host:port` of the session cache
/// - `JWT_USER_SECRET_KEY` (optional): token signing secret
/// - `SENDGRID_API_KEY` (optional): email dispatch key
/// - `APP_PORT` (optional): HTTP server port, defaults to 3000
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub db_host: String,

    #[serde(default = "default_db_port")]
    pub db_port: u16,

    pub db_name: String,

    #[serde(default)]
    pub db_user: String,

    #[serde(default)]
    pub db_password: String,

    #[serde(default)]
    pub db_admin_user: String,

    #[serde(default)]
    pub db_admin_password: String,

    #[serde(default = "default_ssl_mode")]
    pub db_ssl_mode: String,

    #[serde(default = "default_max_connections")]
    pub db_max_connections: u32,

    pub redis_host: String,

    #[serde(default)]
    pub redis_password: Option<String>,

    #[serde(default)]
    pub redis_session_db: u8,

    /// Kept for deployment compatibility; nothing in this service reads the entity database.
    #[serde(default)]
    pub redis_entity_db: u8,

    /// Secret for guest-context tokens. No route issues these yet.
    #[serde(default)]
    pub jwt_guest_secret_key: Option<String>,

    #[serde(default)]
    pub jwt_user_secret_key: Option<String>,

    /// Session lifetime in seconds; `0` keeps sessions until evicted.
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,

    #[serde(default)]
    pub sendgrid_api_key: Option<String>,

    #[serde(default)]
    pub sendgrid_from_address: Option<String>,

    #[serde(default = "default_from_name")]
    pub sendgrid_from_name: String,

    #[serde(default = "default_port")]
    pub app_port: u16,

    #[serde(default)]
    pub cors_signup_origin: Option<String>,

    #[serde(default)]
    pub cors_signin_origin: Option<String>,

    #[serde(default)]
    pub cors_admin_origin: Option<String>,
}

fn default_db_port() -> u16 {
    5432
}

fn default_ssl_mode() -> String {
    "disable".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_session_ttl() -> u64 {
    24 * 60 * 60
}

fn default_from_name() -> String {
    "MyApp".to_string()
}

/// Default port if APP_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DB_HOST, REDIS_HOST)
    /// - Environment variable values cannot be parsed into expected types
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();

        // Field names are automatically converted: db_host -> DB_HOST
        envy::from_env::<Config>()
    }

    /// PostgreSQL connection URL for the given credential set.
    pub fn database_url(&self, role: DbRole) -> String {
        let (user, password) = match role {
            DbRole::Admin => (&self.db_admin_user, &self.db_admin_password),
            DbRole::Worker => (&self.db_user, &self.db_password),
        };

        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            user, password, self.db_host, self.db_port, self.db_name, self.db_ssl_mode
        )
    }

    /// Redis connection URL for the session database.
    pub fn redis_url(&self) -> String {
        match self.redis_password.as_deref().filter(|p| !p.is_empty()) {
            Some(password) => format!(
                "redis://:{}@{}/{}",
                password, self.redis_host, self.redis_session_db
            ),
            None => format!("redis://{}/{}", self.redis_host, self.redis_session_db),
        }
    }

    /// Secret that signs and validates user tokens, falling back to [`DEV_SECRET`].
    pub fn user_secret(&self) -> &str {
        self.jwt_user_secret_key
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(DEV_SECRET)
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.user_secret() == DEV_SECRET
    }

    /// Session lifetime, `None` when sessions do not expire. Capped at [`MAX_SESSION_TTL_SECS`].
    pub fn session_ttl(&self) -> Option<Duration> {
        (self.session_ttl_secs > 0)
            .then(|| Duration::from_secs(self.session_ttl_secs.min(MAX_SESSION_TTL_SECS)))
    }
}
