//! Product business logic - Creating and looking up catalog products.
//!
//! Products are normally imported from e-commerce platforms by the catalog
//! sync jobs; these functions are the single write path they use, so input
//! validation lives here.

use crate::{
    entities::{Product, product},
    errors::{Error, Result},
};
use sea_orm::{Set, prelude::*};
use tracing::info;

/// Fields needed to create a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    /// Display title
    pub title: String,
    /// Platform label, e.g. `"shopify"` or `"woocommerce"`
    pub source: String,
    /// Price in `currency` units
    pub price: f64,
    /// ISO 4217 currency code
    pub currency: String,
    /// Category, if known
    pub category: Option<String>,
    /// Identifier on the originating platform
    pub external_id: Option<String>,
}

/// Retrieves a specific product by its unique ID.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_product_by_id(
    db: &DatabaseConnection,
    product_id: i64,
) -> Result<Option<product::Model>> {
    Product::find_by_id(product_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates a new product, performing input validation.
///
/// Title and source are trimmed, the currency is upper-cased, and blank
/// categories are stored as `None`.
///
/// # Errors
/// Returns an error if:
/// - The title or source is empty or whitespace-only
/// - The price is negative or not finite (NaN, infinity)
/// - The currency is not a three-letter code
/// - The database insert operation fails
pub async fn create_product(db: &DatabaseConnection, new: NewProduct) -> Result<product::Model> {
    if new.title.trim().is_empty() {
        return Err(Error::InvalidInput {
            message: "Product title cannot be empty".to_string(),
        });
    }

    if new.source.trim().is_empty() {
        return Err(Error::InvalidInput {
            message: "Product source cannot be empty".to_string(),
        });
    }

    if !new.price.is_finite() || new.price < 0.0 {
        return Err(Error::InvalidAmount { amount: new.price });
    }

    let currency = new.currency.trim().to_ascii_uppercase();
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(Error::InvalidInput {
            message: format!("Invalid currency code '{}'", new.currency),
        });
    }

    let category = new
        .category
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());

    let product = product::ActiveModel {
        external_id: Set(new.external_id),
        source: Set(new.source.trim().to_lowercase()),
        title: Set(new.title.trim().to_string()),
        price: Set(new.price),
        currency: Set(currency),
        category: Set(category),
        created_at: Set(chrono::Utc::now().naive_utc()),
        ..Default::default()
    };
    let created = product.insert(db).await?;
    info!(
        "Created product {} '{}' from {}",
        created.id, created.title, created.source
    );
    Ok(created)
}
