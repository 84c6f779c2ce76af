//! Database configuration module for `BuyRoll`.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust
//! structs without hand-written SQL.

use crate::entities::{Product, Purchase};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};
use tracing::{debug, info};

/// Establishes a connection to the database at `database_url`.
///
/// # Errors
/// Returns an error if the URL is malformed or the database cannot be opened.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    debug!("Connecting to database at {database_url}");
    Database::connect(database_url).await.map_err(Into::into)
}

/// Creates all necessary database tables using `SeaORM`'s schema generation from entity definitions.
///
/// Existing tables are left untouched. Products are created before purchases
/// because purchases carry a foreign key to them.
///
/// # Errors
/// Returns an error if a `CREATE TABLE` statement fails.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut product_table = schema.create_table_from_entity(Product);
    product_table.if_not_exists();
    let mut purchase_table = schema.create_table_from_entity(Purchase);
    purchase_table.if_not_exists();

    db.execute(builder.build(&product_table)).await?;
    db.execute(builder.build(&purchase_table)).await?;

    info!("Database tables ensured");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{ProductModel, PurchaseModel};
    use sea_orm::{EntityTrait, QuerySelect};

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = create_connection("sqlite::memory:").await?;
        create_tables(&db).await?;

        let _: Vec<ProductModel> = Product::find().limit(1).all(&db).await?;
        let _: Vec<PurchaseModel> = Purchase::find().limit(1).all(&db).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_idempotent() -> Result<()> {
        let db = create_connection("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;

        let _: Vec<PurchaseModel> = Purchase::find().limit(1).all(&db).await?;
        Ok(())
    }
}
