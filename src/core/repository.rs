//! Purchase-history data access for the analytics engine.
//!
//! The aggregators never touch the database directly. They receive plain
//! records through [`PurchaseRepository`] and [`ProductRepository`], which
//! keeps the aggregation logic free of persistence concerns and lets tests
//! feed hand-built histories. [`SeaOrmRepository`] implements both traits
//! on top of the `SeaORM` entities.

use crate::{
    core::period::DateWindow,
    entities::{Product, Purchase, product, purchase},
    errors::Result,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, prelude::*};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, instrument};

/// A purchase as seen by the analytics engine.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseRecord {
    /// Purchase id
    pub id: i64,
    /// Owner of the purchase
    pub user_id: i64,
    /// Product that was bought
    pub product_id: i64,
    /// When the purchase happened
    pub purchase_date: DateTime<Utc>,
    /// Store the purchase was made at
    pub store_name: String,
    /// Order number on the originating platform
    pub order_id: Option<String>,
    /// Price captured at purchase time, if any
    pub unit_price: Option<f64>,
    /// Whether the purchase is shared with connections
    pub is_shared: bool,
}

impl From<purchase::Model> for PurchaseRecord {
    fn from(model: purchase::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            product_id: model.product_id,
            purchase_date: model.purchase_date,
            store_name: model.store_name,
            order_id: model.order_id,
            unit_price: model.unit_price,
            is_shared: model.is_shared,
        }
    }
}

/// The product fields analytics needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRecord {
    /// Product id
    pub id: i64,
    /// Current price
    pub price: f64,
    /// ISO 4217 currency code
    pub currency: String,
    /// Category, if known
    pub category: Option<String>,
    /// Platform the product came from
    pub source: String,
}

impl From<product::Model> for ProductRecord {
    fn from(model: product::Model) -> Self {
        Self {
            id: model.id,
            price: model.price,
            currency: model.currency,
            category: model.category,
            source: model.source,
        }
    }
}

/// A purchase joined with its product and valued.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedPurchase {
    /// Purchase id
    pub purchase_id: i64,
    /// Product id
    pub product_id: i64,
    /// Amount spent on this purchase
    pub amount: f64,
    /// Product category, if known
    pub category: Option<String>,
    /// Store the purchase was made at
    pub store_name: String,
    /// When the purchase happened
    pub purchase_date: DateTime<Utc>,
}

/// Source of per-user purchase history.
#[async_trait]
pub trait PurchaseRepository: Send + Sync {
    /// Returns the purchases owned by `user_id` whose date lies in `window`.
    async fn purchases_for_user(
        &self,
        user_id: i64,
        window: &DateWindow,
    ) -> Result<Vec<PurchaseRecord>>;
}

/// Lookup of product price, category and source.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Returns the products among `ids` that exist, keyed by id.
    async fn products_by_ids(&self, ids: &[i64]) -> Result<HashMap<i64, ProductRecord>>;
}

/// Loads a user's purchases in `window` and values them against the catalog.
///
/// Purchases are priced at the price captured when they were recorded, or at
/// the product's current price for rows without one. Purchases whose product
/// cannot be found are dropped.
///
/// # Errors
/// Returns an error if either repository fails.
pub async fn load_priced_purchases<S>(
    store: &S,
    user_id: i64,
    window: &DateWindow,
) -> Result<Vec<PricedPurchase>>
where
    S: PurchaseRepository + ProductRepository + ?Sized,
{
    let purchases = store.purchases_for_user(user_id, window).await?;
    let product_ids: Vec<i64> = purchases
        .iter()
        .map(|p| p.product_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let products = store.products_by_ids(&product_ids).await?;

    Ok(price_purchases(purchases, &products))
}

/// Joins purchases with products, skipping purchases without a product.
#[must_use]
pub fn price_purchases(
    purchases: Vec<PurchaseRecord>,
    products: &HashMap<i64, ProductRecord>,
) -> Vec<PricedPurchase> {
    let total = purchases.len();
    let priced: Vec<PricedPurchase> = purchases
        .into_iter()
        .filter_map(|purchase| {
            let product = products.get(&purchase.product_id)?;
            Some(PricedPurchase {
                purchase_id: purchase.id,
                product_id: purchase.product_id,
                amount: purchase.unit_price.unwrap_or(product.price),
                category: product.category.clone(),
                store_name: purchase.store_name,
                purchase_date: purchase.purchase_date,
            })
        })
        .collect();

    if priced.len() < total {
        debug!(
            "Skipped {} purchases whose product could not be resolved",
            total - priced.len()
        );
    }
    priced
}

/// `SeaORM`-backed implementation of both repositories.
#[derive(Debug, Clone)]
pub struct SeaOrmRepository {
    db: DatabaseConnection,
}

impl SeaOrmRepository {
    /// Wraps an existing connection pool.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// The underlying connection pool.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl PurchaseRepository for SeaOrmRepository {
    #[instrument(skip(self))]
    async fn purchases_for_user(
        &self,
        user_id: i64,
        window: &DateWindow,
    ) -> Result<Vec<PurchaseRecord>> {
        let mut query = Purchase::find().filter(purchase::Column::UserId.eq(user_id));
        if let Some(start) = window.start {
            query = query.filter(purchase::Column::PurchaseDate.gte(start));
        }
        if let Some(end) = window.end {
            query = query.filter(purchase::Column::PurchaseDate.lte(end));
        }

        let rows = query
            .order_by_asc(purchase::Column::PurchaseDate)
            .order_by_asc(purchase::Column::Id)
            .all(&self.db)
            .await?;
        debug!("Loaded {} purchases for user {}", rows.len(), user_id);

        Ok(rows.into_iter().map(PurchaseRecord::from).collect())
    }
}

#[async_trait]
impl ProductRepository for SeaOrmRepository {
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn products_by_ids(&self, ids: &[i64]) -> Result<HashMap<i64, ProductRecord>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = Product::find()
            .filter(product::Column::Id.is_in(ids.iter().copied()))
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|model| (model.id, ProductRecord::from(model)))
            .collect())
    }
}
