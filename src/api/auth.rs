//! Caller identity.
//!
//! Authentication happens upstream. The auth layer in front of this service
//! forwards the authenticated user id in a header (`x-user-id` unless
//! configured otherwise) and this extractor trusts it.

use crate::api::{AppState, error::ApiError};
use axum::{extract::FromRequestParts, http::request::Parts};

/// Id of the authenticated user making the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub i64);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(&state.user_header)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<i64>().ok())
            .filter(|id| *id > 0)
            .map(Self)
            .ok_or(ApiError::Unauthorized)
    }
}
