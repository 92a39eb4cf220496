//! Order business logic - Adding items and removing quantities within a period.
//!
//! Every mutation runs as one database transaction: read current state, validate,
//! write, commit. Any error drops the transaction, which rolls it back, so a multi-item
//! request is either applied completely or not at all.
//!
//! Removals are two-step. [`preview_removal`] computes what the order would look like
//! without touching it; [`commit_removal`] re-validates against the then-current state
//! and applies the change, consuming the oldest order rows first when a product was
//! added several times within the period.

use crate::{
    core::{
        aggregate::{self, OrderAggregate},
        period::OrderPeriod,
        product,
    },
    entities::{OrderLineItem, order, order_line_item},
    errors::{Error, Result, Shortfall},
};
use chrono::{DateTime, Utc};
use sea_orm::{Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// One requested `(product, quantity)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemRequest {
    /// Product name, matched ignoring case
    pub product: String,
    /// Requested quantity
    pub quantity: i64,
}

impl OrderItemRequest {
    /// Convenience constructor.
    #[must_use]
    pub fn new(product: impl Into<String>, quantity: i64) -> Self {
        Self {
            product: product.into(),
            quantity,
        }
    }
}

/// Inclusive bounds for a single requested quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantityLimits {
    /// Smallest accepted quantity
    pub min: i64,
    /// Largest accepted quantity
    pub max: i64,
}

impl Default for QuantityLimits {
    fn default() -> Self {
        Self { min: 1, max: 100 }
    }
}

/// Outcome of a successful removal preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalPreview {
    /// Period the preview was computed for
    pub period: OrderPeriod,
    /// The order as it is now
    pub current: OrderAggregate,
    /// The order as it would be after the removal
    pub resulting: OrderAggregate,
    /// The removal, normalized to stored product names and merged per product
    pub approved: Vec<OrderItemRequest>,
}

/// Checks every requested quantity against `limits`.
///
/// # Errors
/// Returns `Validation` for an empty request and `InvalidQuantity` for the first
/// quantity outside the bounds.
pub fn validate_items(items: &[OrderItemRequest], limits: QuantityLimits) -> Result<()> {
    if items.is_empty() {
        return Err(Error::Validation {
            message: "No items given".to_string(),
        });
    }
    for item in items {
        if item.product.trim().is_empty() {
            return Err(Error::Validation {
                message: "Product name cannot be empty".to_string(),
            });
        }
        if item.quantity < limits.min || item.quantity > limits.max {
            return Err(Error::InvalidQuantity {
                product: item.product.clone(),
                quantity: item.quantity,
                min: limits.min,
                max: limits.max,
            });
        }
    }
    Ok(())
}

/// Adds `items` to the user's order for `period`.
///
/// Reuses the oldest order row of the period (creating one dated `placed_at` if there is
/// none) and increments or inserts one line item per product. Duplicate product names in
/// `items` are summed.
///
/// # Errors
/// - `InvalidQuantity` / `Validation` if any item is out of bounds or `placed_at` is
///   outside `period`
/// - `ProductNotFound` if any product is unknown or inactive
/// - `Conflict` / `Database` if the store fails
///
/// On any error nothing is persisted.
pub async fn add_items(
    db: &DatabaseConnection,
    user_id: i64,
    period: &OrderPeriod,
    items: &[OrderItemRequest],
    placed_at: DateTime<Utc>,
    limits: QuantityLimits,
) -> Result<OrderAggregate> {
    validate_items(items, limits)?;
    if !period.contains(placed_at) {
        return Err(Error::Validation {
            message: format!("Order time {placed_at} is outside the order period"),
        });
    }

    let txn = db.begin().await?;

    // Resolve every product before writing anything
    let active: HashMap<String, (i64, String)> = product::get_all_active_products(&txn)
        .await?
        .into_iter()
        .map(|p| (p.name.to_lowercase(), (p.id, p.name)))
        .collect();
    // product id -> (stored name, summed quantity)
    let mut per_product: BTreeMap<i64, (String, i64)> = BTreeMap::new();
    for item in items {
        let (product_id, name) = active
            .get(&item.product.trim().to_lowercase())
            .ok_or_else(|| Error::ProductNotFound {
                name: item.product.clone(),
            })?;
        per_product
            .entry(*product_id)
            .or_insert_with(|| (name.clone(), 0))
            .1 += item.quantity;
    }

    let existing = aggregate::orders_in_period(&txn, user_id, period).await?;
    let order_id = if let Some(first) = existing.first() {
        first.id
    } else {
        let created = order::ActiveModel {
            user_id: Set(user_id),
            order_date: Set(placed_at),
            notes: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        debug!(user_id, order_id = created.id, "Created order container");
        created.id
    };

    for (product_id, (name, quantity)) in per_product {
        let quantity = i32::try_from(quantity).map_err(|_| Error::InvalidQuantity {
            product: name,
            quantity,
            min: limits.min,
            max: limits.max,
        })?;

        let line_item = OrderLineItem::find()
            .filter(order_line_item::Column::OrderId.eq(order_id))
            .filter(order_line_item::Column::ProductId.eq(product_id))
            .one(&txn)
            .await?;

        if let Some(line_item) = line_item {
            OrderLineItem::update_many()
                .col_expr(
                    order_line_item::Column::Quantity,
                    Expr::col(order_line_item::Column::Quantity).add(quantity),
                )
                .filter(order_line_item::Column::Id.eq(line_item.id))
                .exec(&txn)
                .await?;
        } else {
            order_line_item::ActiveModel {
                order_id: Set(order_id),
                product_id: Set(product_id),
                quantity: Set(quantity),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }
    }

    let result = aggregate::get_aggregate(&txn, user_id, period).await?;
    txn.commit().await?;

    info!(user_id, items = items.len(), "Added items to order");
    Ok(result)
}

/// Computes the order after removing `requested` from `current`, without side effects.
///
/// Names are matched ignoring case and duplicates are merged. Every product that is
/// missing or held in a smaller quantity is reported in one `InsufficientQuantity`.
///
/// # Errors
/// Returns `Validation` for empty or non-positive requests and `InsufficientQuantity`
/// listing all shortfalls.
pub fn plan_removal(
    current: &OrderAggregate,
    requested: &[OrderItemRequest],
) -> Result<(OrderAggregate, Vec<OrderItemRequest>)> {
    if requested.is_empty() {
        return Err(Error::Validation {
            message: "No items given".to_string(),
        });
    }

    // Merge by lowercase name, keeping the first spelling and request order
    let mut merged: Vec<(String, String, i64)> = Vec::new();
    for item in requested {
        if item.quantity < 1 {
            return Err(Error::Validation {
                message: format!("Quantity for '{}' must be positive", item.product),
            });
        }
        let key = item.product.trim().to_lowercase();
        if let Some(entry) = merged.iter_mut().find(|(k, _, _)| *k == key) {
            entry.2 += item.quantity;
        } else {
            merged.push((key, item.product.trim().to_string(), item.quantity));
        }
    }

    let mut shortfalls = Vec::new();
    let mut approved = Vec::new();
    for (_, requested_name, quantity) in merged {
        match current.find_ignore_case(&requested_name) {
            Some((stored, available)) if available >= quantity => {
                approved.push(OrderItemRequest::new(stored, quantity));
            }
            Some((stored, available)) => shortfalls.push(Shortfall {
                product: stored.to_string(),
                available,
                requested: quantity,
            }),
            None => shortfalls.push(Shortfall {
                product: requested_name,
                available: 0,
                requested: quantity,
            }),
        }
    }

    if !shortfalls.is_empty() {
        return Err(Error::InsufficientQuantity { shortfalls });
    }

    let mut resulting = current.clone();
    for item in &approved {
        resulting.subtract(&item.product, item.quantity);
    }
    Ok((resulting, approved))
}

/// Previews removing `requested` from the user's order for `period`. Never mutates.
///
/// # Errors
/// See [`plan_removal`]; also propagates database errors.
pub async fn preview_removal<C>(
    db: &C,
    user_id: i64,
    period: &OrderPeriod,
    requested: &[OrderItemRequest],
) -> Result<RemovalPreview>
where
    C: ConnectionTrait,
{
    let current = aggregate::get_aggregate(db, user_id, period).await?;
    let (resulting, approved) = plan_removal(&current, requested)?;
    Ok(RemovalPreview {
        period: *period,
        current,
        resulting,
        approved,
    })
}

/// Applies a removal to the user's order for `period`.
///
/// Re-validates against the current state with the same rule as [`preview_removal`].
/// Quantities are taken from the oldest order row first; line items reaching zero are
/// deleted.
///
/// # Errors
/// Returns `InsufficientQuantity` if the order changed since the preview, or a store
/// error. Nothing is persisted on error.
pub async fn commit_removal(
    db: &DatabaseConnection,
    user_id: i64,
    period: &OrderPeriod,
    approved: &[OrderItemRequest],
) -> Result<OrderAggregate> {
    let txn = db.begin().await?;

    let items = aggregate::period_line_items(&txn, user_id, period).await?;
    let current: OrderAggregate = items
        .iter()
        .map(|item| (item.product_name.clone(), i64::from(item.line_item.quantity)))
        .collect();
    let (_, plan) = plan_removal(&current, approved)?;

    for removal in &plan {
        let mut remaining = removal.quantity;
        for item in items.iter().filter(|i| i.product_name == removal.product) {
            if remaining == 0 {
                break;
            }
            let held = i64::from(item.line_item.quantity);
            let taken = remaining.min(held);
            remaining -= taken;

            if taken == held {
                OrderLineItem::delete_by_id(item.line_item.id)
                    .exec(&txn)
                    .await?;
            } else {
                let mut model: order_line_item::ActiveModel = item.line_item.clone().into();
                model.quantity = Set(i32::try_from(held - taken)?);
                model.update(&txn).await?;
            }
        }
    }

    let result = aggregate::get_aggregate(&txn, user_id, period).await?;
    txn.commit().await?;

    info!(user_id, products = plan.len(), "Removed items from order");
    Ok(result)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{
        core::{aggregate::get_aggregate, product::deactivate_product},
        entities::{Order, OrderLineItem},
        test_utils::*,
    };
    use chrono::Duration;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn items(pairs: &[(&str, i64)]) -> Vec<OrderItemRequest> {
        pairs
            .iter()
            .map(|(name, quantity)| OrderItemRequest::new(*name, *quantity))
            .collect()
    }

    #[tokio::test]
    async fn test_add_items_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let period = test_period();
        let limits = QuantityLimits::default();

        let result = add_items(&db, 1, &period, &items(&[("roll", 0)]), test_now(), limits).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InvalidQuantity { quantity: 0, .. }
        ));

        let result = add_items(&db, 1, &period, &items(&[("roll", 101)]), test_now(), limits).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InvalidQuantity { quantity: 101, min: 1, max: 100, .. }
        ));

        let result = add_items(&db, 1, &period, &[], test_now(), limits).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { message: _ }));

        let outside = period.exclusive_end();
        let result = add_items(&db, 1, &period, &items(&[("roll", 1)]), outside, limits).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { message: _ }));

        Ok(())
    }

    #[tokio::test]
    async fn test_add_then_aggregate_sums() -> Result<()> {
        let (db, user) = setup_with_catalog().await?;
        let period = test_period();

        add_test_items(&db, user.id, &[("bread", 2)]).await?;
        let aggregate = add_test_items(&db, user.id, &[("bread", 3)]).await?;

        assert_eq!(aggregate.quantity("bread"), 5);
        assert_eq!(get_aggregate(&db, user.id, &period).await?, aggregate);
        Ok(())
    }

    #[tokio::test]
    async fn test_add_is_commutative() -> Result<()> {
        let (db, alice) = setup_with_catalog().await?;
        let bob = create_test_user(&db, "u2", "Bob").await?;

        add_test_items(&db, alice.id, &[("bread", 2), ("roll", 1)]).await?;
        let alice_result = add_test_items(&db, alice.id, &[("roll", 4)]).await?;

        add_test_items(&db, bob.id, &[("roll", 4)]).await?;
        let bob_result = add_test_items(&db, bob.id, &[("roll", 1), ("bread", 2)]).await?;

        assert_eq!(alice_result, bob_result);
        Ok(())
    }

    #[tokio::test]
    async fn test_add_merges_duplicates_and_ignores_case() -> Result<()> {
        let (db, user) = setup_with_catalog().await?;

        let aggregate = add_test_items(&db, user.id, &[("Roll", 2), ("ROLL", 3), ("bread", 1)]).await?;

        assert_eq!(aggregate.quantity("roll"), 5);
        assert_eq!(aggregate.quantity("bread"), 1);

        // One line item per (order, product)
        let rows = OrderLineItem::find().all(&db).await?;
        assert_eq!(rows.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_add_reuses_single_order_container() -> Result<()> {
        let (db, user) = setup_with_catalog().await?;

        add_test_items(&db, user.id, &[("roll", 1)]).await?;
        add_test_items(&db, user.id, &[("roll", 1), ("bread", 1)]).await?;
        add_test_items(&db, user.id, &[("bread", 1)]).await?;

        assert_eq!(Order::find().all(&db).await?.len(), 1);
        assert_eq!(OrderLineItem::find().all(&db).await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_add_unknown_product_commits_nothing() -> Result<()> {
        let (db, user) = setup_with_catalog().await?;

        let result = add_test_items(&db, user.id, &[("roll", 2), ("bagel", 1)]).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::ProductNotFound { ref name } if name == "bagel"
        ));

        assert!(Order::find().all(&db).await?.is_empty());
        assert!(get_aggregate(&db, user.id, &test_period()).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_add_overflow_names_the_product() -> Result<()> {
        let (db, user) = setup_with_catalog().await?;
        let limits = QuantityLimits {
            min: 1,
            max: i64::MAX,
        };
        let requested = items(&[("Roll", i64::from(i32::MAX)), ("roll", 1)]);

        let result = add_items(&db, user.id, &test_period(), &requested, test_now(), limits).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InvalidQuantity { ref product, .. } if product == "roll"
        ));
        assert!(Order::find().all(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_add_inactive_product_rejected() -> Result<()> {
        let (db, user) = setup_with_catalog().await?;
        add_test_items(&db, user.id, &[("roll", 2)]).await?;
        deactivate_product(&db, "bread").await?;

        let result = add_test_items(&db, user.id, &[("roll", 1), ("bread", 1)]).await;
        assert!(matches!(result.unwrap_err(), Error::ProductNotFound { name: _ }));

        let aggregate = get_aggregate(&db, user.id, &test_period()).await?;
        assert_eq!(aggregate.quantity("roll"), 2);
        assert_eq!(aggregate.len(), 1);
        Ok(())
    }

    #[test]
    fn test_plan_removal_collects_all_shortfalls() {
        let current: OrderAggregate = [("bread", 2), ("roll", 3)].into_iter().collect();

        let result = plan_removal(
            &current,
            &items(&[("bread", 5), ("roll", 1), ("bagel", 1)]),
        );
        let Err(Error::InsufficientQuantity { shortfalls }) = result else {
            panic!("expected InsufficientQuantity");
        };
        assert_eq!(
            shortfalls,
            vec![
                Shortfall {
                    product: "bread".to_string(),
                    available: 2,
                    requested: 5
                },
                Shortfall {
                    product: "bagel".to_string(),
                    available: 0,
                    requested: 1
                },
            ]
        );
    }

    #[test]
    fn test_plan_removal_merges_and_drops_zeroed_products() {
        let current: OrderAggregate = [("Bread", 2), ("roll", 3)].into_iter().collect();

        let (resulting, approved) =
            plan_removal(&current, &items(&[("bread", 1), ("BREAD", 1), ("roll", 1)])).unwrap();

        assert_eq!(approved, items(&[("Bread", 2), ("roll", 1)]));
        assert_eq!(resulting.quantity("Bread"), 0);
        assert_eq!(resulting.find_ignore_case("bread"), None);
        assert_eq!(resulting.quantity("roll"), 2);
    }

    #[test]
    fn test_plan_removal_rejects_non_positive() {
        let current: OrderAggregate = [("roll", 3)].into_iter().collect();
        let result = plan_removal(&current, &items(&[("roll", 0)]));
        assert!(matches!(result.unwrap_err(), Error::Validation { message: _ }));
    }

    #[tokio::test]
    async fn test_preview_removal_never_mutates() -> Result<()> {
        let (db, user) = setup_with_catalog().await?;
        let period = test_period();
        add_test_items(&db, user.id, &[("roll", 3), ("bread", 1)]).await?;
        let before = get_aggregate(&db, user.id, &period).await?;

        let first = preview_removal(&db, user.id, &period, &items(&[("roll", 2)])).await?;
        let second = preview_removal(&db, user.id, &period, &items(&[("roll", 2)])).await?;

        assert_eq!(first, second);
        assert_eq!(first.current, before);
        assert_eq!(first.resulting.quantity("roll"), 1);
        assert_eq!(get_aggregate(&db, user.id, &period).await?, before);
        Ok(())
    }

    #[tokio::test]
    async fn test_preview_insufficient_quantity_leaves_order() -> Result<()> {
        let (db, user) = setup_with_catalog().await?;
        let period = test_period();
        add_test_items(&db, user.id, &[("roll", 2)]).await?;

        let result = preview_removal(&db, user.id, &period, &items(&[("roll", 5)])).await;
        let Err(Error::InsufficientQuantity { shortfalls }) = result else {
            panic!("expected InsufficientQuantity");
        };
        assert_eq!(shortfalls.len(), 1);
        assert_eq!(shortfalls[0].available, 2);
        assert_eq!(shortfalls[0].requested, 5);

        assert_eq!(get_aggregate(&db, user.id, &period).await?.quantity("roll"), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_removal_round_trip() -> Result<()> {
        let (db, user) = setup_with_catalog().await?;
        let period = test_period();
        add_test_items(&db, user.id, &[("roll", 5), ("bread", 1)]).await?;

        let preview = preview_removal(&db, user.id, &period, &items(&[("roll", 5)])).await?;
        assert_eq!(preview.resulting.find_ignore_case("roll"), None);

        let committed = commit_removal(&db, user.id, &period, &preview.approved).await?;
        assert_eq!(committed, preview.resulting);

        let after = get_aggregate(&db, user.id, &period).await?;
        assert_eq!(after.find_ignore_case("roll"), None);
        assert_eq!(after.quantity("bread"), 1);

        // The emptied line item row is gone
        assert_eq!(OrderLineItem::find().all(&db).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_commit_removal_consumes_oldest_order_first() -> Result<()> {
        let (db, user) = setup_with_catalog().await?;
        let period = test_period();
        let roll = crate::core::product::find_active_product_by_name(&db, "roll")
            .await?
            .unwrap();

        let older = insert_raw_order(&db, user.id, period.start + Duration::hours(1)).await?;
        let older_item = insert_raw_line_item(&db, older.id, roll.id, 2).await?;
        let newer = insert_raw_order(&db, user.id, period.start + Duration::days(1)).await?;
        let newer_item = insert_raw_line_item(&db, newer.id, roll.id, 3).await?;

        let result = commit_removal(&db, user.id, &period, &items(&[("roll", 3)])).await?;
        assert_eq!(result.quantity("roll"), 2);

        assert!(OrderLineItem::find_by_id(older_item.id).one(&db).await?.is_none());
        let remaining = OrderLineItem::find_by_id(newer_item.id).one(&db).await?.unwrap();
        assert_eq!(remaining.quantity, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_commit_removal_revalidates_without_partial_mutation() -> Result<()> {
        let (db, user) = setup_with_catalog().await?;
        let period = test_period();
        add_test_items(&db, user.id, &[("roll", 2), ("bread", 1)]).await?;
        let before = get_aggregate(&db, user.id, &period).await?;

        let result = commit_removal(&db, user.id, &period, &items(&[("roll", 1), ("bread", 5)])).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InsufficientQuantity { shortfalls: _ }
        ));

        assert_eq!(get_aggregate(&db, user.id, &period).await?, before);
        Ok(())
    }

    #[tokio::test]
    async fn test_commit_removal_after_state_changed() -> Result<()> {
        let (db, user) = setup_with_catalog().await?;
        let period = test_period();
        add_test_items(&db, user.id, &[("roll", 4)]).await?;

        let preview = preview_removal(&db, user.id, &period, &items(&[("roll", 3)])).await?;
        // Someone removes items between preview and commit
        commit_removal(&db, user.id, &period, &items(&[("roll", 2)])).await?;

        let result = commit_removal(&db, user.id, &period, &preview.approved).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InsufficientQuantity { shortfalls: _ }
        ));
        assert_eq!(get_aggregate(&db, user.id, &period).await?.quantity("roll"), 2);
        Ok(())
    }
}
