//! HTTP error responses.
//!
//! Every failure is rendered as `{"error": "..."}`. Internal failures are
//! logged with their cause and reported to the client only by the operation
//! that failed.

use crate::errors::Error;
use axum::{
    Json,
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

/// Errors a handler can return.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A request parameter failed validation
    #[error("{0}")]
    BadRequest(String),

    /// No authenticated user id was forwarded
    #[error("Authentication required")]
    Unauthorized,

    /// Something failed server-side
    #[error("Failed to {context}")]
    Internal {
        /// Operation that failed, e.g. `"get trend analytics"`
        context: &'static str,
        /// Underlying cause, logged but never returned
        #[source]
        source: Error,
    },
}

impl ApiError {
    /// Wraps a core error. Validation failures become 400s, everything else a 500.
    #[must_use]
    pub fn from_core(context: &'static str, source: Error) -> Self {
        match source {
            Error::InvalidInput { message } => Self::BadRequest(message),
            source => Self::Internal { context, source },
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(format!(
            "Invalid query parameters: {}",
            rejection.body_text()
        ))
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadRequest(message) => {
                warn!("Rejected request: {message}");
                StatusCode::BAD_REQUEST
            }
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Internal { context, source } => {
                error!("Failed to {context}: {source}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
