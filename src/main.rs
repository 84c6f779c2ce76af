use buyroll::{
    api,
    config::{self, database},
    errors::Result,
};
use dotenvy::dotenv;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load .env file before anything reads the environment
    dotenv().ok(); // Non-fatal, env vars can be set externally

    // 2. Load the main application configuration
    let app_config = config::load_app_configuration()?;

    // 3. Initialize tracing, RUST_LOG wins over the configured level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&app_config.logging.level)),
        )
        .init();
    info!("Configuration loaded, listening on {}", app_config.listen_address());

    // 4. Initialize database
    let db = database::create_connection(&app_config.database.url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Serve until shutdown
    api::serve(&app_config, db)
        .await
        .inspect_err(|e| error!("Server error: {}", e))
}
