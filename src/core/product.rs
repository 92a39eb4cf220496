//! Product business logic - The orderable catalog.
//!
//! Products are looked up by name ignoring case. Deactivated products keep their
//! history but are no longer returned by any lookup used for new line items. All
//! functions are async and return Result types for proper error handling.

use crate::{
    config::settings::ProductConfig,
    entities::{Product, product},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::info;

/// Retrieves all active products, ordered alphabetically by name.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_all_active_products<C>(db: &C) -> Result<Vec<product::Model>>
where
    C: ConnectionTrait,
{
    Product::find()
        .filter(product::Column::IsActive.eq(true))
        .order_by_asc(product::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds an active product by name, ignoring case. Returns None if missing or inactive.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn find_active_product_by_name<C>(db: &C, name: &str) -> Result<Option<product::Model>>
where
    C: ConnectionTrait,
{
    let wanted = name.trim().to_lowercase();
    Ok(get_all_active_products(db)
        .await?
        .into_iter()
        .find(|p| p.name.to_lowercase() == wanted))
}

/// Retrieves a specific product by its unique ID, active or not.
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

/// Creates a new active product.
///
/// The name is trimmed. Whitespace inside the name is rejected because order commands
/// separate product and quantity by whitespace.
///
/// # Errors
/// Returns an error if:
/// - The product name is empty or contains whitespace
/// - An active product with the same name (ignoring case) exists
/// - The database insert operation fails
pub async fn create_product(
    db: &DatabaseConnection,
    name: &str,
    description: Option<String>,
) -> Result<product::Model> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation {
            message: "Product name cannot be empty".to_string(),
        });
    }
    if name.chars().any(char::is_whitespace) {
        return Err(Error::Validation {
            message: format!("Product name '{name}' must be a single word"),
        });
    }

    if find_active_product_by_name(db, name).await?.is_some() {
        return Err(Error::ProductExists {
            name: name.to_string(),
        });
    }

    let now = chrono::Utc::now().naive_utc();
    let product = product::ActiveModel {
        name: Set(name.to_string()),
        description: Set(description.filter(|d| !d.trim().is_empty())),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    product.insert(db).await.map_err(Into::into)
}

/// Soft deletes a product by name, keeping it referenced by historical line items.
///
/// # Errors
/// Returns an error if:
/// - No active product with this name exists
/// - The database update operation fails
pub async fn deactivate_product(db: &DatabaseConnection, name: &str) -> Result<product::Model> {
    let mut product: product::ActiveModel = find_active_product_by_name(db, name)
        .await?
        .ok_or_else(|| Error::ProductNotFound {
            name: name.to_string(),
        })?
        .into();

    product.is_active = Set(false);
    product.updated_at = Set(chrono::Utc::now().naive_utc());

    product.update(db).await.map_err(Into::into)
}

/// Creates every configured product that has no active counterpart yet.
///
/// Returns the number of products created.
///
/// # Errors
/// Returns an error if a configured name is invalid or the database fails.
pub async fn seed_products(db: &DatabaseConnection, products: &[ProductConfig]) -> Result<usize> {
    let mut created = 0;
    for config in products {
        if find_active_product_by_name(db, &config.name).await?.is_some() {
            continue;
        }
        create_product(db, &config.name, config.description.clone()).await?;
        info!("Seeded product '{}'", config.name);
        created += 1;
    }
    Ok(created)
}
