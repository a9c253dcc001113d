//! Email-code sign-in: issue a one-time code, then trade it for a session token.
//!
//! # State
//!
//! All state lives in the key-value store:
//! - `signin_code:<email>` holds a 6-digit code for 5 minutes, overwritten by each request
//! - `session:<id>` holds the signed-in profile for the configured session lifetime
//!
//! Verification consumes the code with a single compare-and-delete, so two
//! concurrent verifications of the same code cannot both succeed.

use rand::{TryRngCore, rngs::OsRng};
use std::time::Duration;

use crate::{
    cache::{ConsumeOutcome, KeyValueStore},
    error::AppError,
    services::{
        auth_service::{self, SessionProfile, TokenKeys},
        email_service::CodeMailer,
        subscriber_service,
    },
};

pub const CODE_PREFIX: &str = "signin_code:";

/// Sign-in codes are valid for 5 minutes.
pub const CODE_TTL: Duration = Duration::from_secs(5 * 60);

/// Largest multiple of 1_000_000 below `u32::MAX`; draws above it are rejected to avoid modulo bias.
const CODE_RANGE_LIMIT: u32 = 4_294_000_000;

pub fn code_key(email: &str) -> String {
    format!("{}{}", CODE_PREFIX, email)
}

/// Generate and dispatch a sign-in code for `email`.
///
/// # Process
///
/// 1. Validate the address shape (400 before anything is stored or sent)
/// 2. Generate a 6-digit code
/// 3. Store it under `signin_code:<email>` for 5 minutes, replacing any earlier code
/// 4. Email it
///
/// Succeeds the same way whether or not the address belongs to a subscriber.
///
/// # Errors
///
/// - `InvalidRequest`: email missing or malformed
/// - `Cache` / `Email`: store write or dispatch failed (no retry)
pub async fn request_code(
    store: &dyn KeyValueStore,
    mailer: &dyn CodeMailer,
    email: &str,
) -> Result<(), AppError> {
    subscriber_service::validate_email(email)?;

    let code = generate_code();
    store.set(&code_key(email), &code, Some(CODE_TTL)).await?;

    mailer.send_code(email, &code).await?;

    tracing::info!("Sign-in code issued for {}", email);
    Ok(())
}

/// Check a sign-in code and open a session.
///
/// # Process
///
/// 1. Both fields must be non-empty
/// 2. Atomically compare and delete the stored code
/// 3. Store `session:<id>` with the verified email
/// 4. Sign a token referencing the new session
///
/// # Errors
///
/// - `InvalidRequest`: email or code missing
/// - `NoSignInCode`: nothing stored (never requested, expired, or already used)
/// - `InvalidCode`: a code is stored but differs (left in place)
/// - `Serialization` / `Cache` / `Token`: session could not be encoded, stored or token signed
pub async fn verify_code(
    store: &dyn KeyValueStore,
    keys: &TokenKeys,
    session_ttl: Option<Duration>,
    email: &str,
    code: &str,
) -> Result<String, AppError> {
    if email.is_empty() || code.is_empty() {
        return Err(AppError::InvalidRequest(
            "Missing email or code".to_string(),
        ));
    }

    match store.consume_if_equal(&code_key(email), code).await? {
        ConsumeOutcome::Consumed => {}
        ConsumeOutcome::Missing => return Err(AppError::NoSignInCode),
        ConsumeOutcome::Mismatch => {
            tracing::warn!("Sign-in code mismatch for {}", email);
            return Err(AppError::InvalidCode);
        }
    }

    let session_id = generate_session_id();
    let profile = serde_json::to_string(&SessionProfile {
        email: email.to_string(),
    })?;

    store
        .set(&auth_service::session_key(&session_id), &profile, session_ttl)
        .await?;

    let token = keys.issue_token(&session_id)?;

    tracing::info!("Session opened for {}", email);
    Ok(token)
}

/// Generate a zero-padded 6-digit code from the OS random source.
///
/// If the OS source is unavailable, falls back to a code derived from the
/// clock. That keeps sign-in available but the code is guessable.
fn generate_code() -> String {
    loop {
        match OsRng.try_next_u32() {
            Ok(n) if n < CODE_RANGE_LIMIT => return format!("{:06}", n % 1_000_000),
            Ok(_) => continue,
            Err(e) => {
                tracing::error!("OS random source failed ({}), using time-based code", e);
                let nanos = chrono::Utc::now().timestamp_subsec_nanos();
                return format!("{:06}", nanos % 1_000_000);
            }
        }
    }
}

/// Opaque session id: 16 random bytes, hex encoded.
fn generate_session_id() -> String {
    let bytes: [u8; 16] = rand::random();
    hex::encode(bytes)
}
