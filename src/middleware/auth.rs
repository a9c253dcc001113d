//! Bearer token authentication middleware.
//!
//! This middleware intercepts every admin request to:
//! 1. Extract the token from the Authorization header
//! 2. Verify its signature and expiry
//! 3. Check that the session it references still exists
//! 4. Inject the session context into the request
//! 5. Reject everything else with the same HTTP 401

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::{error::AppError, services::auth_service, state::AppState};

/// Session token authentication middleware function.
///
/// # Headers
///
/// Expected header format:
/// ```text
/// Authorization: Bearer <jwt>
/// ```
///
/// # Returns
///
/// - `Ok(Response)` if the token references a live session (calls next handler)
/// - `Err(AppError::Unauthorized)` otherwise; the specific reason is only logged
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // A non-ASCII header value is treated as malformed rather than missing
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .map(|h| h.to_str().unwrap_or_default());

    let session = auth_service::authorize(&state.tokens, state.cache.as_ref(), header)
        .await
        .map_err(|reason| {
            tracing::warn!("Request denied: {}", reason);
            AppError::Unauthorized
        })?;

    // Route handlers can extract this using Extension<SessionContext>
    request.extensions_mut().insert(session);

    Ok(next.run(request).await)
}
