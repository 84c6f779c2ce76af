//! Purchase business logic - Recording purchases and toggling sharing.
//!
//! Purchase history is append-only: once recorded, a purchase only changes
//! when its owner shares or unshares it.

use crate::{
    entities::{Product, Purchase, purchase},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::info;

/// Fields needed to record a purchase.
#[derive(Debug, Clone)]
pub struct NewPurchase {
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
    /// Price paid; defaults to the product's current price
    pub unit_price: Option<f64>,
}

/// Records a purchase against an existing product.
///
/// When `unit_price` is not supplied the product's current price is captured,
/// so later catalog price changes do not rewrite history.
///
/// # Errors
/// Returns an error if:
/// - The store name is empty or whitespace-only
/// - The supplied unit price is negative or not finite
/// - The product does not exist
/// - The database insert operation fails
pub async fn create_purchase(db: &DatabaseConnection, new: NewPurchase) -> Result<purchase::Model> {
    if new.store_name.trim().is_empty() {
        return Err(Error::InvalidInput {
            message: "Store name cannot be empty".to_string(),
        });
    }

    if let Some(price) = new.unit_price.filter(|p| !p.is_finite() || *p < 0.0) {
        return Err(Error::InvalidAmount { amount: price });
    }

    let product = Product::find_by_id(new.product_id)
        .one(db)
        .await?
        .ok_or(Error::ProductNotFound {
            id: new.product_id,
        })?;

    let now = Utc::now();
    let purchase = purchase::ActiveModel {
        user_id: Set(new.user_id),
        product_id: Set(product.id),
        purchase_date: Set(new.purchase_date),
        store_name: Set(new.store_name.trim().to_string()),
        order_id: Set(new.order_id),
        unit_price: Set(Some(new.unit_price.unwrap_or(product.price))),
        is_shared: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let created = purchase.insert(db).await?;
    info!(
        "Recorded purchase {} of product {} for user {}",
        created.id, created.product_id, created.user_id
    );
    Ok(created)
}

/// Retrieves all purchases owned by a user, most recent first.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_purchases_for_user(
    db: &DatabaseConnection,
    user_id: i64,
) -> Result<Vec<purchase::Model>> {
    Purchase::find()
        .filter(purchase::Column::UserId.eq(user_id))
        .order_by_desc(purchase::Column::PurchaseDate)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Shares or unshares a purchase. Only the owner may change it; purchases
/// owned by someone else are reported as not found.
///
/// # Errors
/// Returns an error if the purchase does not exist, belongs to another user,
/// or the update fails.
pub async fn set_purchase_shared(
    db: &DatabaseConnection,
    purchase_id: i64,
    user_id: i64,
    shared: bool,
) -> Result<purchase::Model> {
    let existing = Purchase::find_by_id(purchase_id)
        .one(db)
        .await?
        .filter(|p| p.user_id == user_id)
        .ok_or(Error::PurchaseNotFound { id: purchase_id })?;

    if existing.is_shared == shared {
        return Ok(existing);
    }

    let mut active: purchase::ActiveModel = existing.into();
    active.is_shared = Set(shared);
    active.updated_at = Set(Utc::now());
    let updated = active.update(db).await?;
    info!(
        "Purchase {} sharing set to {} by user {}",
        purchase_id, shared, user_id
    );
    Ok(updated)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_create_purchase_captures_product_price() -> Result<()> {
        let db = setup_test_db().await?;
        let product = create_test_product(&db, "Shirt", 29.99, Some("Clothing")).await?;

        let purchase = create_test_purchase(&db, 1, product.id, " Zara ", ymd(2024, 2, 3)).await?;

        assert_eq!(purchase.unit_price, Some(29.99));
        assert_eq!(purchase.store_name, "Zara");
        assert!(!purchase.is_shared);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_purchase_with_explicit_price() -> Result<()> {
        let db = setup_test_db().await?;
        let product = create_test_product(&db, "Shirt", 29.99, None).await?;

        let purchase = create_purchase(
            &db,
            NewPurchase {
                user_id: 1,
                product_id: product.id,
                purchase_date: ymd(2024, 2, 3),
                store_name: "Outlet".to_string(),
                order_id: Some("#1001".to_string()),
                unit_price: Some(19.99),
            },
        )
        .await?;

        assert_eq!(purchase.unit_price, Some(19.99));
        assert_eq!(purchase.order_id.as_deref(), Some("#1001"));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_purchase_unknown_product() -> Result<()> {
        let db = setup_test_db().await?;
        let result = create_test_purchase(&db, 1, 42, "Nowhere", ymd(2024, 1, 1)).await;
        assert!(matches!(result, Err(Error::ProductNotFound { id: 42 })));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_purchase_rejects_blank_store() -> Result<()> {
        let db = setup_test_db().await?;
        let product = create_test_product(&db, "Shirt", 29.99, None).await?;
        let result = create_test_purchase(&db, 1, product.id, "  ", ymd(2024, 1, 1)).await;
        assert!(matches!(result, Err(Error::InvalidInput { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_get_purchases_for_user_most_recent_first() -> Result<()> {
        let db = setup_test_db().await?;
        let product = create_test_product(&db, "Coffee", 4.5, Some("Food")).await?;
        create_test_purchase(&db, 1, product.id, "Cafe", ymd(2024, 1, 1)).await?;
        create_test_purchase(&db, 1, product.id, "Cafe", ymd(2024, 3, 1)).await?;
        create_test_purchase(&db, 2, product.id, "Cafe", ymd(2024, 2, 1)).await?;

        let purchases = get_purchases_for_user(&db, 1).await?;
        assert_eq!(purchases.len(), 2);
        assert_eq!(purchases[0].purchase_date, ymd(2024, 3, 1));
        Ok(())
    }

    #[tokio::test]
    async fn test_set_purchase_shared_by_owner() -> Result<()> {
        let db = setup_test_db().await?;
        let product = create_test_product(&db, "Coffee", 4.5, None).await?;
        let purchase = create_test_purchase(&db, 1, product.id, "Cafe", ymd(2024, 1, 1)).await?;

        let shared = set_purchase_shared(&db, purchase.id, 1, true).await?;
        assert!(shared.is_shared);

        let unshared = set_purchase_shared(&db, purchase.id, 1, false).await?;
        assert!(!unshared.is_shared);
        Ok(())
    }

    #[tokio::test]
    async fn test_set_purchase_shared_rejects_other_user() -> Result<()> {
        let db = setup_test_db().await?;
        let product = create_test_product(&db, "Coffee", 4.5, None).await?;
        let purchase = create_test_purchase(&db, 1, product.id, "Cafe", ymd(2024, 1, 1)).await?;

        let result = set_purchase_shared(&db, purchase.id, 2, true).await;
        assert!(matches!(result, Err(Error::PurchaseNotFound { .. })));
        Ok(())
    }
}
