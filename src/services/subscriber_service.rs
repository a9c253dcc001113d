//! Subscriber aggregate service - validation and overwrite rules.
//!
//! This service handles:
//! - Email and name validation (before any mutation)
//! - Creating a subscriber together with its types
//! - Three-way subscriber type updates (keep, clear, replace)
//! - Deleting a subscriber with all owned types

use regex::Regex;
use std::sync::LazyLock;

use crate::{
    error::AppError,
    models::subscriber::{
        NewSubscriber, Subscriber, SubscriberChanges, SubscriberRequest, TypesUpdate,
    },
    repository::SubscriberRepository,
};

/// Address shape: local part, `@`, domain, `.`, and a 2+ letter suffix.
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}$")
        .expect("email pattern compiles")
});

pub fn validate_email(email: &str) -> Result<(), AppError> {
    if email.is_empty() || !EMAIL_PATTERN.is_match(email) {
        return Err(AppError::InvalidRequest(
            "invalid or missing email".to_string(),
        ));
    }
    Ok(())
}

/// Validate the base fields shared by create and update.
pub fn validate_subscriber(request: &SubscriberRequest) -> Result<(), AppError> {
    validate_email(&request.email)?;

    if request.name.trim().is_empty() {
        return Err(AppError::InvalidRequest("missing name".to_string()));
    }
    Ok(())
}

/// Create a subscriber and any supplied types as one unit.
///
/// # Errors
///
/// - `InvalidRequest`: email or name invalid (nothing written)
/// - `Database`: store failure
pub async fn create_subscriber(
    repo: &dyn SubscriberRepository,
    request: SubscriberRequest,
) -> Result<Subscriber, AppError> {
    validate_subscriber(&request)?;

    let subscriber_types = request.type_names().unwrap_or_default();
    let subscriber = repo
        .insert(NewSubscriber {
            email: request.email,
            name: request.name,
            subscriber_types,
        })
        .await?;

    Ok(subscriber)
}

pub async fn get_subscriber(
    repo: &dyn SubscriberRepository,
    id: i32,
) -> Result<Subscriber, AppError> {
    repo.find(id).await?.ok_or(AppError::SubscriberNotFound)
}

pub async fn list_subscribers(repo: &dyn SubscriberRepository) -> Result<Vec<Subscriber>, AppError> {
    Ok(repo.list().await?)
}

/// Overwrite a subscriber's email and name, and its types if supplied.
///
/// # Types
///
/// - field absent: existing types untouched
/// - `[]`: all existing types removed
/// - non-empty list: existing types removed, these inserted
///
/// # Errors
///
/// - `SubscriberNotFound`: no subscriber with `id`
/// - `InvalidRequest`: email or name invalid (nothing written)
/// - `Database`: store failure
pub async fn update_subscriber(
    repo: &dyn SubscriberRepository,
    id: i32,
    request: SubscriberRequest,
) -> Result<Subscriber, AppError> {
    if repo.find(id).await?.is_none() {
        return Err(AppError::SubscriberNotFound);
    }

    validate_subscriber(&request)?;

    let subscriber_types = match request.type_names() {
        Some(names) => TypesUpdate::Replace(names),
        None => TypesUpdate::Keep,
    };

    // The row can vanish between the lookup and the write
    repo.update(
        id,
        SubscriberChanges {
            email: request.email,
            name: request.name,
            subscriber_types,
        },
    )
    .await?
    .ok_or(AppError::SubscriberNotFound)
}

/// Permanently delete a subscriber and its types.
pub async fn delete_subscriber(repo: &dyn SubscriberRepository, id: i32) -> Result<(), AppError> {
    if !repo.delete(id).await? {
        return Err(AppError::SubscriberNotFound);
    }
    Ok(())
}
