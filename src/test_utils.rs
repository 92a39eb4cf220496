//! Shared test utilities for `OrderBuddy`.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{
        aggregate::OrderAggregate,
        order::{self, OrderItemRequest, QuantityLimits},
        period::{Cutover, OrderPeriod, compute_period},
        product, user,
    },
    entities,
    errors::Result,
};
use chrono::{DateTime, TimeZone, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a regular (non-admin) test user.
pub async fn create_test_user(
    db: &DatabaseConnection,
    external_id: &str,
    name: &str,
) -> Result<entities::user::Model> {
    user::register_user(db, external_id, name, &[]).await
}

/// Creates an active test product without description.
pub async fn create_test_product(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::product::Model> {
    product::create_product(db, name, None).await
}

/// The window opened on Wednesday 2024-05-15 10:00 UTC under the default cutover.
#[must_use]
pub fn test_period() -> OrderPeriod {
    compute_period(test_now(), &Cutover::default())
}

/// A fixed instant inside [`test_period`] (Friday 2024-05-17 12:00 UTC).
#[must_use]
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 17, 12, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Sets up a database with products `bread` and `roll` and user `u1` ("Alice").
/// Returns (db, user) for order-related tests.
pub async fn setup_with_catalog() -> Result<(DatabaseConnection, entities::user::Model)> {
    let db = setup_test_db().await?;
    create_test_product(&db, "bread").await?;
    create_test_product(&db, "roll").await?;
    let user = create_test_user(&db, "u1", "Alice").await?;
    Ok((db, user))
}

/// Adds `(product, quantity)` pairs to the user's order in [`test_period`].
pub async fn add_test_items(
    db: &DatabaseConnection,
    user_id: i64,
    pairs: &[(&str, i64)],
) -> Result<OrderAggregate> {
    let items: Vec<OrderItemRequest> = pairs
        .iter()
        .map(|(name, quantity)| OrderItemRequest::new(*name, *quantity))
        .collect();
    order::add_items(
        db,
        user_id,
        &test_period(),
        &items,
        test_now(),
        QuantityLimits::default(),
    )
    .await
}

/// Inserts an order row directly, bypassing validation.
/// Use this to place orders at exact instants around period boundaries.
pub async fn insert_raw_order(
    db: &DatabaseConnection,
    user_id: i64,
    order_date: DateTime<Utc>,
) -> Result<entities::order::Model> {
    entities::order::ActiveModel {
        user_id: Set(user_id),
        order_date: Set(order_date),
        notes: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Inserts a line item directly, bypassing validation.
pub async fn insert_raw_line_item(
    db: &DatabaseConnection,
    order_id: i64,
    product_id: i64,
    quantity: i32,
) -> Result<entities::order_line_item::Model> {
    entities::order_line_item::ActiveModel {
        order_id: Set(order_id),
        product_id: Set(product_id),
        quantity: Set(quantity),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

