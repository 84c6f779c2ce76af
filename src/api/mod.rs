//! JSON HTTP interface.
//!
//! All analytics routes are `GET` and scoped to the user id forwarded by
//! the upstream auth layer. See [`auth::AuthUser`].

/// Analytics endpoint handlers
pub mod analytics;
/// Caller identity extraction
pub mod auth;
/// HTTP error responses
pub mod error;
/// Health check endpoint
pub mod health;
/// Query parameter parsing and validation
pub mod params;

use crate::{
    config::AppConfig,
    core::repository::SeaOrmRepository,
    errors::{Error, Result},
};
use axum::{Router, http::HeaderName, routing::get};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tower_http::trace::TraceLayer;
use tracing::info;

/// State shared by every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Purchase and product access
    pub repository: Arc<SeaOrmRepository>,
    /// Header carrying the authenticated user id
    pub user_header: HeaderName,
}

impl AppState {
    /// Builds the state around an open connection pool.
    ///
    /// # Errors
    /// Returns an error if `user_header` is not a valid header name.
    pub fn new(db: DatabaseConnection, user_header: &str) -> Result<Self> {
        let user_header =
            HeaderName::from_bytes(user_header.trim().as_bytes()).map_err(|e| Error::Config {
                message: format!("Invalid user header name '{user_header}': {e}"),
            })?;

        Ok(Self {
            repository: Arc::new(SeaOrmRepository::new(db)),
            user_header,
        })
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/analytics/spending", get(analytics::spending))
        .route("/analytics/categories", get(analytics::categories))
        .route("/analytics/stores", get(analytics::stores))
        .route("/analytics/trends", get(analytics::trends))
        .route("/analytics/comprehensive", get(analytics::comprehensive))
        .route("/analytics/summary", get(analytics::summary))
        .route("/analytics/export", get(analytics::export))
        .route("/analytics/insights", get(analytics::insights))
        .route("/health", get(health::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds the configured address and serves until Ctrl+C or SIGTERM.
///
/// # Errors
/// Returns an error if the configuration is invalid, the address cannot be
/// bound, or the server fails while running.
pub async fn serve(config: &AppConfig, db: DatabaseConnection) -> Result<()> {
    let state = AppState::new(db, &config.server.user_header)?;
    let app = router(state);

    let address = config.listen_address();
    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
