//! Subscriber HTTP handlers.
//!
//! This module implements the subscriber endpoints:
//! - POST /signup/subscribers - Public signup (worker credentials)
//! - POST /admin/subscribers - Create subscriber
//! - GET /admin/subscribers - List subscribers
//! - GET /admin/subscribers/{id} - Get subscriber by ID
//! - PUT /admin/subscribers/{id} - Update subscriber
//! - DELETE /admin/subscribers/{id} - Delete subscriber

use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::subscriber::{Subscriber, SubscriberRequest},
    services::{auth_service::SessionContext, subscriber_service},
    state::AppState,
};

/// Parse the `{id}` path segment, answering 400 (not axum's plain-text rejection) on garbage.
fn parse_id(raw: &str) -> Result<i32, AppError> {
    raw.parse()
        .map_err(|_| AppError::InvalidRequest("Invalid subscriber ID".to_string()))
}

fn actor(session: &SessionContext) -> &str {
    session.email.as_deref().unwrap_or("unknown")
}

/// Public signup.
///
/// # Request Body
///
/// ```json
/// {
///   "email": "jane@example.com",
///   "name": "Jane",
///   "subscriber_types": [{"name": "shopper"}]
/// }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: the stored subscriber with its types
/// - **Error (400)**: unparseable body, invalid email or blank name
/// - **Error (500)**: database error
pub async fn signup_subscriber(
    State(state): State<AppState>,
    payload: Result<Json<SubscriberRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload?;

    let subscriber =
        subscriber_service::create_subscriber(state.signup_subscribers.as_ref(), request).await?;

    tracing::info!("Subscriber {} signed up", subscriber.id);
    Ok((StatusCode::CREATED, Json(subscriber)))
}

/// Create a subscriber from the admin surface. Same rules as signup.
pub async fn create_subscriber(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    payload: Result<Json<SubscriberRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload?;

    let subscriber =
        subscriber_service::create_subscriber(state.subscribers.as_ref(), request).await?;

    tracing::info!("Subscriber {} created by {}", subscriber.id, actor(&session));
    Ok((StatusCode::CREATED, Json(subscriber)))
}

/// List all subscribers with their types, ordered by id.
pub async fn list_subscribers(
    State(state): State<AppState>,
) -> Result<Json<Vec<Subscriber>>, AppError> {
    let subscribers = subscriber_service::list_subscribers(state.subscribers.as_ref()).await?;

    Ok(Json(subscribers))
}

/// Get one subscriber.
///
/// # Response
///
/// - **Success (200 OK)**: subscriber with types
/// - **Error (400)**: non-integer id
/// - **Error (404)**: no such subscriber
pub async fn get_subscriber(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Subscriber>, AppError> {
    let id = parse_id(&id)?;
    let subscriber = subscriber_service::get_subscriber(state.subscribers.as_ref(), id).await?;

    Ok(Json(subscriber))
}

/// Update a subscriber.
///
/// Email and name are always overwritten. `subscriber_types` replaces the
/// existing types when present (`[]` clears them) and is ignored when absent.
///
/// # Response
///
/// - **Success (200 OK)**: refreshed subscriber with types
/// - **Error (400)**: non-integer id, unparseable body, invalid email or blank name
/// - **Error (404)**: no such subscriber
pub async fn update_subscriber(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    payload: Result<Json<SubscriberRequest>, JsonRejection>,
) -> Result<Json<Subscriber>, AppError> {
    let id = parse_id(&id)?;
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            // A missing subscriber answers 404 whatever the body looks like
            subscriber_service::get_subscriber(state.subscribers.as_ref(), id).await?;
            return Err(rejection.into());
        }
    };

    let subscriber =
        subscriber_service::update_subscriber(state.subscribers.as_ref(), id, request).await?;

    tracing::info!("Subscriber {} updated by {}", id, actor(&session));
    Ok(Json(subscriber))
}

/// Delete a subscriber and its types.
///
/// # Response
///
/// Returns 204 No Content on success, 404 if the subscriber does not exist.
pub async fn delete_subscriber(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&id)?;
    subscriber_service::delete_subscriber(state.subscribers.as_ref(), id).await?;

    tracing::info!("Subscriber {} deleted by {}", id, actor(&session));
    Ok(StatusCode::NO_CONTENT)
}
