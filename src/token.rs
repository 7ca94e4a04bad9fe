//! Session token claim decoding.
//!
//! Tokens are JWTs issued by the backend. Only the payload segment is read;
//! the signature is the server's business and is never checked here.

use crate::models::Role;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("expected 3 dot-separated segments, found {0}")]
    Segments(usize),

    #[error("payload is not valid base64url: {0}")]
    Base64(String),

    #[error("payload is not a JSON object: {0}")]
    Json(String),

    #[error("payload has no '{0}' claim")]
    MissingClaim(&'static str),

    #[error("unknown role '{0}'")]
    UnknownRole(String),
}

/// Claims the console relies on. Only `role` is mandatory; views that need
/// the user id go through `subject_from_token`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub role: Role,
    pub sub: Option<String>,
    pub issued_at: Option<i64>,
    pub expires_at: Option<i64>,
}

impl Claims {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now.timestamp())
    }

    pub fn expires_at_utc(&self) -> Option<DateTime<Utc>> {
        self.expires_at
            .and_then(|exp| DateTime::<Utc>::from_timestamp(exp, 0))
    }
}

#[derive(Deserialize)]
struct RawClaims {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    sub: Option<Value>,
    #[serde(default)]
    iat: Option<i64>,
    #[serde(default)]
    exp: Option<i64>,
}

/// Decode the claims carried by `token`
pub fn decode(token: &str) -> Result<Claims, TokenError> {
    let segments: Vec<&str> = token.trim().split('.').collect();
    if segments.len() != 3 {
        return Err(TokenError::Segments(segments.len()));
    }

    let payload = URL_SAFE_NO_PAD
        .decode(segments[1].trim_end_matches('='))
        .map_err(|e| TokenError::Base64(e.to_string()))?;
    let raw: RawClaims =
        serde_json::from_slice(&payload).map_err(|e| TokenError::Json(e.to_string()))?;

    let role = raw.role.ok_or(TokenError::MissingClaim("role"))?;
    let role = Role::parse(&role).ok_or(TokenError::UnknownRole(role))?;
    let sub = match raw.sub {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };

    Ok(Claims {
        role,
        sub,
        issued_at: raw.iat,
        expires_at: raw.exp,
    })
}

/// Role claim, or `None` when the token cannot be decoded
pub fn role_from_token(token: &str) -> Option<Role> {
    match decode(token) {
        Ok(claims) => Some(claims.role),
        Err(e) => {
            eprintln!("Warning: could not decode session token: {}", e);
            None
        }
    }
}

/// Subject (user id) claim
pub fn subject_from_token(token: &str) -> Result<String, TokenError> {
    decode(token)?.sub.ok_or(TokenError::MissingClaim("sub"))
}

/// Build an unsigned token around `payload`
#[cfg(test)]
pub(crate) fn unsigned(payload: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{}.{}.signature", header, body)
}
