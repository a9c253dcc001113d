//! Sign-in HTTP handlers.
//!
//! - POST /signin/request - Email a one-time code
//! - POST /signin/verify - Exchange the code for a bearer token

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};

use crate::{
    error::AppError,
    models::signin::{MessageResponse, SignInRequest, TokenResponse, VerifyRequest},
    services::signin_service,
    state::AppState,
};

/// Request a sign-in code.
///
/// # Request Body
///
/// ```json
/// { "email": "user@example.com" }
/// ```
///
/// # Response (200)
///
/// ```json
/// { "message": "A sign-in code has been emailed to you." }
/// ```
///
/// The response is the same for known and unknown addresses.
pub async fn request_code(
    State(state): State<AppState>,
    payload: Result<Json<SignInRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Json(request) = payload?;

    signin_service::request_code(state.cache.as_ref(), state.mailer.as_ref(), &request.email)
        .await?;

    Ok(Json(MessageResponse {
        message: "A sign-in code has been emailed to you.".to_string(),
    }))
}

/// Verify a sign-in code.
///
/// # Request Body
///
/// ```json
/// { "email": "user@example.com", "code": "123456" }
/// ```
///
/// # Response
///
/// - **Success (200 OK)**: `{ "token": "<jwt>" }`
/// - **Error (400)**: missing fields, or no code stored for this email
/// - **Error (401)**: code does not match
pub async fn verify_code(
    State(state): State<AppState>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, AppError> {
    let Json(request) = payload?;

    let token = signin_service::verify_code(
        state.cache.as_ref(),
        &state.tokens,
        state.session_ttl,
        &request.email,
        &request.code,
    )
    .await?;

    Ok(Json(TokenResponse { token }))
}
