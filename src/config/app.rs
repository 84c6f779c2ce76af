//! Application configuration loading from config.toml
//!
//! Settings are read from a TOML file (default `./config.toml`, overridable
//! with `BUYROLL_CONFIG`). Every section is optional; a missing file yields
//! the defaults. A handful of environment variables override file values so
//! container deployments can configure the service without a file.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener settings
    pub server: ServerConfig,
    /// Database connection settings
    pub database: DatabaseConfig,
    /// Log output settings
    pub logging: LoggingConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind to
    pub bind_address: String,
    /// TCP port to listen on
    pub port: u16,
    /// Header carrying the user id forwarded by the upstream auth layer
    pub user_header: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            user_header: "x-user-id".to_string(),
        }
    }
}

/// Database connection settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SeaORM` connection URL
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://data/buyroll.sqlite?mode=rwc".to_string(),
        }
    }
}

/// Log output settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Address the HTTP server should bind to, as `host:port`.
    #[must_use]
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.server.bind_address, self.server.port)
    }

    /// Applies `DATABASE_URL` and `BUYROLL_PORT` overrides from the environment.
    ///
    /// # Errors
    /// Returns an error if `BUYROLL_PORT` is set but is not a valid port number.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            debug!("DATABASE_URL overrides configured database url");
            self.database.url = url;
        }

        if let Ok(port) = std::env::var("BUYROLL_PORT") {
            self.server.port = port.parse().map_err(|e| Error::Config {
                message: format!("Invalid BUYROLL_PORT value '{port}': {e}"),
            })?;
        }

        Ok(())
    }
}

/// Parses configuration from TOML text.
///
/// # Errors
/// Returns an error if the TOML syntax is invalid or a field has the wrong type.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads configuration from a TOML file
///
/// # Arguments
/// * `path` - Path to the config.toml file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    parse_config(&contents)
}

/// Loads configuration from `BUYROLL_CONFIG` or `./config.toml`, then applies
/// environment overrides. A missing file is not an error.
///
/// # Errors
/// Returns an error if the file exists but cannot be parsed, or an
/// environment override is malformed.
pub fn load_app_configuration() -> Result<AppConfig> {
    let path = std::env::var("BUYROLL_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let mut config = if Path::new(&path).exists() {
        info!("Loading configuration from {path}");
        load_config(&path)?
    } else {
        info!("No configuration file at {path}, using defaults");
        AppConfig::default()
    };

    config.apply_env_overrides()?;
    Ok(config)
}
