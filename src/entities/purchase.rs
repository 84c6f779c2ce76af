//! Purchase entity - One line of a user's purchase history.
//!
//! Each purchase references exactly one product. `unit_price` is the price
//! captured when the purchase was recorded; rows imported before prices were
//! captured leave it empty and are valued at the product's current price.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Purchase database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchases")]
pub struct Model {
    /// Unique identifier for the purchase
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owner of the purchase
    pub user_id: i64,
    /// Product that was bought
    pub product_id: i64,
    /// When the purchase happened
    pub purchase_date: DateTimeUtc,
    /// Name of the store the purchase was made at
    pub store_name: String,
    /// Order number on the originating platform
    pub order_id: Option<String>,
    /// Price paid, if captured at purchase time
    pub unit_price: Option<f64>,
    /// Whether the owner has shared this purchase with connections
    pub is_shared: bool,
    /// When the record was created
    pub created_at: DateTimeUtc,
    /// When the record was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Purchase and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each purchase belongs to one product
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
