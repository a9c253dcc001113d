//! Bearer token issuance and request authorization.
//!
//! A token is only a reference to a server-side session: it carries the
//! session id in its `session_key` claim, and a request is allowed only while
//! `session:<id>` still exists in the key-value store.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::cache::KeyValueStore;

/// Key prefix for session records in the key-value store.
pub const SESSION_PREFIX: &str = "session:";

/// Tokens expire 24 hours after issuance.
pub const TOKEN_LIFETIME_SECS: i64 = 24 * 60 * 60;

const BEARER_PREFIX: &str = "Bearer ";

pub fn session_key(session_id: &str) -> String {
    format!("{}{}", SESSION_PREFIX, session_id)
}

/// Claims carried by every issued token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub session_key: String,
    pub iat: i64,
    pub exp: i64,
}

/// Shape accepted on decode. `session_key` stays untyped so a missing or
/// non-string claim is reported separately from a bad signature.
#[derive(Debug, Clone, Deserialize)]
struct IncomingClaims {
    #[serde(default)]
    session_key: Option<serde_json::Value>,
}

/// Minimal profile stored in a session record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionProfile {
    pub email: String,
}

/// Why a request was denied. Internal diagnostic only: every variant becomes
/// the same 401 response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthDenial {
    #[error("missing header")]
    MissingHeader,
    #[error("bad format")]
    BadFormat,
    #[error("invalid or expired")]
    InvalidToken,
    #[error("no session claim")]
    NoSessionClaim,
    #[error("session not found")]
    SessionNotFound,
}

/// Session resolved for an authorized request.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session_id: String,
    /// Email from the session record, when the record parses as a profile.
    pub email: Option<String>,
}

/// Signing and verification keys for user tokens (HS256).
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Sign a token referencing `session_id`, valid for 24 hours from now.
    pub fn issue_token(&self, session_id: &str) -> Result<String, jsonwebtoken::errors::Error> {
        self.issue_token_at(session_id, chrono::Utc::now().timestamp())
    }

    fn issue_token_at(
        &self,
        session_id: &str,
        issued_at: i64,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = Claims {
            session_key: session_id.to_string(),
            iat: issued_at,
            exp: issued_at + TOKEN_LIFETIME_SECS,
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }

    /// Verify signature and expiry, returning the session id claim.
    fn verify(&self, token: &str) -> Result<String, AuthDenial> {
        let data = jsonwebtoken::decode::<IncomingClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| {
                tracing::debug!("Token verification failed: {}", e);
                AuthDenial::InvalidToken
            })?;

        match data.claims.session_key {
            Some(serde_json::Value::String(key)) if !key.is_empty() => Ok(key),
            _ => Err(AuthDenial::NoSessionClaim),
        }
    }
}

/// Decide whether a request carrying `header` (the raw `Authorization` value) may proceed.
///
/// Checks run in order and the first failure wins:
/// 1. header present
/// 2. `Bearer ` prefix
/// 3. signature and expiry
/// 4. non-empty `session_key` claim
/// 5. `session:<session_key>` exists and is non-empty
///
/// The only side effect is the session read.
pub async fn authorize(
    keys: &TokenKeys,
    store: &dyn KeyValueStore,
    header: Option<&str>,
) -> Result<SessionContext, AuthDenial> {
    let header = header.ok_or(AuthDenial::MissingHeader)?;
    let token = header
        .strip_prefix(BEARER_PREFIX)
        .ok_or(AuthDenial::BadFormat)?;

    let session_id = keys.verify(token)?;

    let record = match store.get(&session_key(&session_id)).await {
        Ok(Some(record)) if !record.is_empty() => record,
        Ok(_) => return Err(AuthDenial::SessionNotFound),
        Err(e) => {
            tracing::error!("Session lookup failed: {}", e);
            return Err(AuthDenial::SessionNotFound);
        }
    };

    let email = serde_json::from_str::<SessionProfile>(&record)
        .ok()
        .map(|profile| profile.email);

    Ok(SessionContext { session_id, email })
}
