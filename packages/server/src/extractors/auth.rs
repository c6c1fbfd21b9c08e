use axum::{extract::FromRequestParts, http::request::Parts};
use common::UserId;

use crate::error::AppError;

/// Caller identity forwarded by the gateway in the `X-User-Id` header.
///
/// Add this as a handler parameter to require an identity. The gateway
/// authenticates; this service only checks ownership.
pub struct AuthUser {
    pub user_id: UserId,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("X-User-Id")
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::IdentityMissing)?;

        let user_id = header.parse().map_err(|_| AppError::IdentityInvalid)?;

        Ok(AuthUser { user_id })
    }
}
