//! Acting-user extraction
//!
//! There is no authentication; the caller names the user it acts for.

use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::debug;

use crate::api::types::ApiError;

/// Header carrying the acting user's id
pub const USER_ID_HEADER: &str = "x-user-id";

/// User assumed when the header is absent
pub const DEFAULT_USER_ID: i64 = 1;

/// Extractor for the user an API call acts on behalf of
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActingUser(pub i64);

impl<S> FromRequestParts<S> for ActingUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(USER_ID_HEADER) else {
            return Ok(ActingUser(DEFAULT_USER_ID));
        };

        let user_id = value
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|id| *id > 0)
            .ok_or_else(|| {
                ApiError::bad_request("X-User-Id must be a positive integer")
                    .with_param(USER_ID_HEADER)
            })?;

        debug!(user_id, "Resolved acting user");
        Ok(ActingUser(user_id))
    }
}
