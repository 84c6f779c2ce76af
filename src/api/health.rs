//! `GET /health` - liveness plus a database round trip.

use crate::api::AppState;
use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

/// Health report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    /// `ok` or `degraded`
    pub status: &'static str,
    /// `reachable` or `unreachable`
    pub database: &'static str,
    /// When the check ran
    pub checked_at: DateTime<Utc>,
}

/// Reports 200 when the database answers and 503 otherwise.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (status_code, status, database) = match state.repository.connection().ping().await {
        Ok(()) => (StatusCode::OK, "ok", "reachable"),
        Err(e) => {
            warn!("Health check database ping failed: {e}");
            (StatusCode::SERVICE_UNAVAILABLE, "degraded", "unreachable")
        }
    };

    (
        status_code,
        Json(HealthResponse {
            status,
            database,
            checked_at: Utc::now(),
        }),
    )
}
