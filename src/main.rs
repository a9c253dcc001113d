//! Subscriber API - Main Application Entry Point
//!
//! A headless REST API offering public subscriber signup, passwordless
//! email-code sign-in, and session-token protected admin CRUD over subscribers.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (subscribers and their types)
//! - **Cache**: Redis (sign-in codes and sessions)
//! - **Authentication**: HS256 JWT referencing a live Redis session
//! - **Email**: SendGrid HTTP API
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create admin and worker database connection pools
//! 3. Run database migrations
//! 4. Connect to the Redis session database
//! 5. Build HTTP router with routes and middleware
//! 6. Start server on configured port

mod cache;
mod config;
mod db;
mod error;
mod handlers;
mod middleware;
mod models;
mod repository;
mod routes;
mod services;
mod state;

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::{
    cache::RedisStore,
    config::DbRole,
    repository::PgSubscriberRepository,
    routes::CorsOrigins,
    services::{auth_service::TokenKeys, email_service::SendGridMailer},
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = config::Config::from_env()?;
    tracing::info!("Configuration loaded");

    if config.uses_dev_secret() {
        tracing::warn!("JWT_USER_SECRET_KEY not set, signing tokens with the development secret");
    }
    if config.jwt_guest_secret_key.is_none() {
        tracing::debug!("JWT_GUEST_SECRET_KEY not set; guest tokens are not issued by this service");
    }

    if config.session_ttl_secs > config::MAX_SESSION_TTL_SECS {
        tracing::warn!(
            "SESSION_TTL_SECS={} exceeds the maximum, capping at {}",
            config.session_ttl_secs,
            config::MAX_SESSION_TTL_SECS
        );
    }

    let admin_pool = db::create_pool(
        &config.database_url(DbRole::Admin),
        config.db_max_connections,
    )
    .await?;
    let worker_pool = db::create_pool(
        &config.database_url(DbRole::Worker),
        config.db_max_connections,
    )
    .await?;
    tracing::info!("Database pools created");

    db::run_migrations(&admin_pool).await?;
    tracing::info!("Database migrations complete");

    let cache = RedisStore::connect(&config.redis_url()).await?;
    tracing::info!(
        "Connected to Redis on {} (session db {}, entity db {} unused)",
        config.redis_host,
        config.redis_session_db,
        config.redis_entity_db
    );

    let mailer = SendGridMailer::new(
        config.sendgrid_api_key.clone(),
        config.sendgrid_from_address.clone(),
        config.sendgrid_from_name.clone(),
    )?;
    if config.sendgrid_api_key.is_none() {
        tracing::warn!("SENDGRID_API_KEY not set, sign-in code requests will fail");
    }

    let state = AppState {
        subscribers: Arc::new(PgSubscriberRepository::new(admin_pool)),
        signup_subscribers: Arc::new(PgSubscriberRepository::new(worker_pool)),
        cache: Arc::new(cache),
        mailer: Arc::new(mailer),
        tokens: Arc::new(TokenKeys::new(config.user_secret())),
        session_ttl: config.session_ttl(),
    };

    let cors = CorsOrigins {
        signup: config.cors_signup_origin.clone(),
        signin: config.cors_signin_origin.clone(),
        admin: config.cors_admin_origin.clone(),
    };

    let app = routes::build_router(state, &cors);

    let addr = format!("0.0.0.0:{}", config.app_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Requests are served concurrently by tokio; handlers share no mutable state
    axum::serve(listener, app).await?;

    Ok(())
}
