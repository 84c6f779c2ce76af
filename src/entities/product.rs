//! Product entity - Represents a catalog item imported from an e-commerce platform.
//!
//! Products carry the price, currency, and category used to value purchases.
//! The `source` label records which platform (e.g. `shopify`, `woocommerce`)
//! the product was imported from.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Unique identifier for the product
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Identifier of the product on the originating platform, if known
    pub external_id: Option<String>,
    /// Platform the product was imported from (e.g. `"shopify"`)
    pub source: String,
    /// Display title of the product
    pub title: String,
    /// Current price in `currency` units
    pub price: f64,
    /// ISO 4217 currency code
    pub currency: String,
    /// Product category, if the platform supplied one
    pub category: Option<String>,
    /// When the product was imported
    pub created_at: DateTime,
}

/// Defines relationships between Product and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One product appears in many purchases
    #[sea_orm(has_many = "super::purchase::Entity")]
    Purchases,
}

impl Related<super::purchase::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Purchases.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
