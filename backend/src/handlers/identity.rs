use axum::{extract::FromRequestParts, http::request::Parts};

use crate::constants::{IDEMPOTENCY_KEY_HEADER, MEMBER_ID_HEADER};
use crate::error::AppError;
use crate::models::validate_id;

/// Caller identity forwarded by the authenticating gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberIdentity(pub String);

impl<S: Send + Sync> FromRequestParts<S> for MemberIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(MEMBER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::Unauthenticated(format!("missing {MEMBER_ID_HEADER} header")))?;

        validate_id("member", value)?;
        Ok(Self(value.to_string()))
    }
}

/// Optional `Idempotency-Key` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdempotencyKey(pub Option<String>);

impl<S: Send + Sync> FromRequestParts<S> for IdempotencyKey {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(raw) = parts.headers.get(IDEMPOTENCY_KEY_HEADER) else {
            return Ok(Self(None));
        };
        let key = raw
            .to_str()
            .map_err(|_| AppError::InvalidState("idempotency key must be ASCII".into()))?
            .trim();
        validate_id("idempotency key", key)?;
        Ok(Self(Some(key.to_string())))
    }
}
