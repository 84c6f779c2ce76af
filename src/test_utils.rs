//! Shared test utilities for `BuyRoll`.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.
#![allow(clippy::unwrap_used)]

use crate::{
    core::{
        product::{self, NewProduct},
        purchase::{self, NewPurchase},
    },
    entities,
    errors::Result,
};
use chrono::{DateTime, TimeZone, Utc};
use sea_orm::DatabaseConnection;
use tracing_subscriber::EnvFilter;

/// Installs a tracing subscriber that writes through the test harness.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    init_test_tracing();
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Noon UTC on the given day.
#[must_use]
pub fn ymd(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
}

/// Creates a test product with sensible defaults.
///
/// # Defaults
/// * `source`: `"shopify"`
/// * `currency`: `"USD"`
pub async fn create_test_product(
    db: &DatabaseConnection,
    title: &str,
    price: f64,
    category: Option<&str>,
) -> Result<entities::product::Model> {
    product::create_product(
        db,
        NewProduct {
            title: title.to_string(),
            source: "shopify".to_string(),
            price,
            currency: "USD".to_string(),
            category: category.map(str::to_string),
            external_id: None,
        },
    )
    .await
}

/// Records a purchase at the product's current price.
pub async fn create_test_purchase(
    db: &DatabaseConnection,
    user_id: i64,
    product_id: i64,
    store_name: &str,
    purchase_date: DateTime<Utc>,
) -> Result<entities::purchase::Model> {
    purchase::create_purchase(
        db,
        NewPurchase {
            user_id,
            product_id,
            purchase_date,
            store_name: store_name.to_string(),
            order_id: None,
            unit_price: None,
        },
    )
    .await
}
