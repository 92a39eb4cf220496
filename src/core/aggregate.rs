//! Per-user order aggregation.
//!
//! A user's weekly order is never a single row: it is the sum of every line item in
//! every order they placed inside the period. This module loads those rows and folds
//! them into an [`OrderAggregate`].

use crate::{
    core::period::OrderPeriod,
    entities::{Order, OrderLineItem, Product, order, order_line_item, product},
    errors::Result,
};
use sea_orm::{QueryOrder, prelude::*};
use std::collections::{BTreeMap, HashMap};

/// Net quantity per product name, iterated in product-name order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderAggregate {
    items: BTreeMap<String, i64>,
}

impl OrderAggregate {
    /// Creates an empty aggregate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `quantity` of `product`, creating the entry if needed.
    pub fn add(&mut self, product: &str, quantity: i64) {
        *self.items.entry(product.to_string()).or_insert(0) += quantity;
    }

    /// Quantity held for `product` (exact name), zero when absent.
    #[must_use]
    pub fn quantity(&self, product: &str) -> i64 {
        self.items.get(product).copied().unwrap_or(0)
    }

    /// Finds the stored entry whose name matches `product` ignoring case.
    #[must_use]
    pub fn find_ignore_case(&self, product: &str) -> Option<(&str, i64)> {
        let wanted = product.to_lowercase();
        self.items
            .iter()
            .find(|(name, _)| name.to_lowercase() == wanted)
            .map(|(name, quantity)| (name.as_str(), *quantity))
    }

    /// Reduces `product` by `quantity`, dropping it entirely at zero or below.
    pub(crate) fn subtract(&mut self, product: &str, quantity: i64) {
        if let Some(current) = self.items.get_mut(product) {
            *current -= quantity;
            if *current <= 0 {
                self.items.remove(product);
            }
        }
    }

    /// Whether the aggregate holds no products.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of distinct products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Sum over all products.
    #[must_use]
    pub fn total_quantity(&self) -> i64 {
        self.items.values().sum()
    }

    /// `(product, quantity)` pairs sorted by product name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.items.iter().map(|(name, quantity)| (name.as_str(), *quantity))
    }
}

impl<S: Into<String>> FromIterator<(S, i64)> for OrderAggregate {
    fn from_iter<I: IntoIterator<Item = (S, i64)>>(iter: I) -> Self {
        let mut aggregate = Self::new();
        for (name, quantity) in iter {
            aggregate.add(&name.into(), quantity);
        }
        aggregate
    }
}

/// A line item inside the period together with its order date and product name.
#[derive(Debug, Clone)]
pub(crate) struct PeriodLineItem {
    pub line_item: order_line_item::Model,
    pub product_name: String,
}

/// Loads every order of `user_id` inside `period`, oldest first (`order_date`, then id).
pub(crate) async fn orders_in_period<C>(
    db: &C,
    user_id: i64,
    period: &OrderPeriod,
) -> Result<Vec<order::Model>>
where
    C: ConnectionTrait,
{
    Order::find()
        .filter(order::Column::UserId.eq(user_id))
        .filter(order::Column::OrderDate.gte(period.start))
        .filter(order::Column::OrderDate.lt(period.exclusive_end()))
        .order_by_asc(order::Column::OrderDate)
        .order_by_asc(order::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Loads the line items of `orders` with their product names, preserving the order of
/// `orders` (and line item id within an order).
pub(crate) async fn line_items_for_orders<C>(
    db: &C,
    orders: &[order::Model],
) -> Result<Vec<PeriodLineItem>>
where
    C: ConnectionTrait,
{
    if orders.is_empty() {
        return Ok(Vec::new());
    }

    let order_ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
    let line_items = OrderLineItem::find()
        .filter(order_line_item::Column::OrderId.is_in(order_ids))
        .order_by_asc(order_line_item::Column::Id)
        .all(db)
        .await?;
    if line_items.is_empty() {
        return Ok(Vec::new());
    }

    let product_ids: Vec<i64> = line_items.iter().map(|item| item.product_id).collect();
    let product_names: HashMap<i64, String> = Product::find()
        .filter(product::Column::Id.is_in(product_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.id, p.name))
        .collect();

    let position: HashMap<i64, usize> = orders
        .iter()
        .enumerate()
        .map(|(index, o)| (o.id, index))
        .collect();

    let mut items: Vec<PeriodLineItem> = line_items
        .into_iter()
        .map(|line_item| PeriodLineItem {
            product_name: product_names
                .get(&line_item.product_id)
                .cloned()
                .unwrap_or_else(|| format!("#{}", line_item.product_id)),
            line_item,
        })
        .collect();
    items.sort_by_key(|item| {
        (
            position.get(&item.line_item.order_id).copied().unwrap_or(usize::MAX),
            item.line_item.id,
        )
    });
    Ok(items)
}

/// Loads all line items of `user_id` inside `period`, oldest order first.
pub(crate) async fn period_line_items<C>(
    db: &C,
    user_id: i64,
    period: &OrderPeriod,
) -> Result<Vec<PeriodLineItem>>
where
    C: ConnectionTrait,
{
    let orders = orders_in_period(db, user_id, period).await?;
    line_items_for_orders(db, &orders).await
}

/// Computes the aggregate of `user_id` for `period`.
///
/// Read-only. Works on plain connections as well as inside a transaction.
pub async fn get_aggregate<C>(db: &C, user_id: i64, period: &OrderPeriod) -> Result<OrderAggregate>
where
    C: ConnectionTrait,
{
    let items = period_line_items(db, user_id, period).await?;
    Ok(items
        .into_iter()
        .map(|item| (item.product_name, i64::from(item.line_item.quantity)))
        .collect())
}
