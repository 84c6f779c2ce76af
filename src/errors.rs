//! Unified error types for `BuyRoll`.
//!
//! Every fallible operation in the crate returns [`Result`]. The HTTP layer
//! converts these into status codes in [`crate::api::error`].

use thiserror::Error;

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// Description of what went wrong
        message: String,
    },

    /// Any failure reported by the database layer
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Filesystem or socket failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No product exists with the given id
    #[error("Product not found: {id}")]
    ProductNotFound {
        /// The id that was looked up
        id: i64,
    },

    /// No purchase with the given id is visible to the caller
    #[error("Purchase not found: {id}")]
    PurchaseNotFound {
        /// The id that was looked up
        id: i64,
    },

    /// A price was negative, NaN or infinite
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: f64,
    },

    /// A record field failed validation
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Description of the rejected field
        message: String,
    },
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
