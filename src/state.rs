//! Shared application state.
//!
//! Every external dependency is injected here once at startup and handed to
//! handlers through axum's `State` extractor. Nothing else is process-global.

use std::sync::Arc;
use std::time::Duration;

use crate::{
    cache::KeyValueStore, repository::SubscriberRepository,
    services::{auth_service::TokenKeys, email_service::CodeMailer},
};

#[derive(Clone)]
pub struct AppState {
    /// Repository on the admin connection pool.
    pub subscribers: Arc<dyn SubscriberRepository>,

    /// Repository on the restricted worker pool, used by public signup.
    pub signup_subscribers: Arc<dyn SubscriberRepository>,

    /// Sign-in codes and sessions.
    pub cache: Arc<dyn KeyValueStore>,

    pub mailer: Arc<dyn CodeMailer>,

    pub tokens: Arc<TokenKeys>,

    /// Lifetime of new sessions; `None` keeps them until evicted.
    pub session_ttl: Option<Duration>,
}
