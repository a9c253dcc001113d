//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{cache::CacheError, services::email_service::MailError};

/// Application-wide error type.
///
/// Each variant maps to a specific HTTP status code and error message.
///
/// # Error Categories
///
/// - **Validation Errors**: malformed or missing input (400)
/// - **Authentication Errors**: missing/invalid credential, session, or sign-in code (401)
/// - **Resource Errors**: requested subscriber not found (404)
/// - **Dependency Errors**: database, cache, email or token signing failure (500)
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Session cache operation failed.
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Sign-in code email could not be sent.
    #[error("Email error: {0}")]
    Email(#[from] MailError),

    /// Session record could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Bearer token could not be signed.
    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    /// Bearer token missing, malformed, expired, or not backed by a live session.
    ///
    /// The cause is deliberately not carried; every denial looks the same to the client.
    #[error("Unauthorized")]
    Unauthorized,

    /// Supplied sign-in code does not match the stored one.
    #[error("Invalid code")]
    InvalidCode,

    /// No sign-in code stored for this email (never requested or expired).
    #[error("No sign-in code found or code expired")]
    NoSignInCode,

    #[error("Subscriber not found")]
    SubscriberNotFound,

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    /// The String contains details about what was invalid.
    #[error("Invalid request")]
    InvalidRequest(String),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("Rejected request body: {}", rejection.body_text());
        AppError::InvalidRequest("Unable to parse request body".to_string())
    }
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// Dependency failures are logged with their details and reported to the
/// client as a generic internal error.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", self.to_string()),
            AppError::InvalidCode => (StatusCode::UNAUTHORIZED, "invalid_code", self.to_string()),
            AppError::NoSignInCode => (StatusCode::BAD_REQUEST, "no_code", self.to_string()),
            AppError::SubscriberNotFound => (
                StatusCode::NOT_FOUND,
                "subscriber_not_found",
                self.to_string(),
            ),
            AppError::InvalidRequest(ref msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            AppError::Database(_)
            | AppError::Cache(_)
            | AppError::Email(_)
            | AppError::Serialization(_)
            | AppError::Token(_) => {
                tracing::error!("Request failed: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
