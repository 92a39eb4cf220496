//! Weekly summary across all users.
//!
//! Folds every line item of every order placed inside a period into one row per
//! product, remembering who contributed how much. This is what the bakery run is
//! planned from.

use crate::{
    core::{aggregate::line_items_for_orders, period::OrderPeriod},
    entities::{Order, User, order},
    errors::Result,
};
use sea_orm::{QueryOrder, prelude::*};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// One user's share of a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contributor {
    /// Display name of the user
    pub name: String,
    /// Net quantity the user ordered
    pub quantity: i64,
}

/// Total demand for one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRow {
    /// Product name
    pub product: String,
    /// Sum over all contributors
    pub total_quantity: i64,
    /// Who ordered it, alphabetical by name ignoring case. Users sharing a name are
    /// listed separately.
    pub contributors: Vec<Contributor>,
}

/// Summarizes all orders inside `period`.
///
/// Rows are sorted by product name ignoring case. Products whose net quantity is zero are left out,
/// and so are users with nothing left of a product.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn summarize<C>(db: &C, period: &OrderPeriod) -> Result<Vec<SummaryRow>>
where
    C: ConnectionTrait,
{
    let orders = Order::find()
        .filter(order::Column::OrderDate.gte(period.start))
        .filter(order::Column::OrderDate.lt(period.exclusive_end()))
        .order_by_asc(order::Column::OrderDate)
        .order_by_asc(order::Column::Id)
        .all(db)
        .await?;
    let user_of_order: HashMap<i64, i64> = orders.iter().map(|o| (o.id, o.user_id)).collect();
    let line_items = line_items_for_orders(db, &orders).await?;

    let names: HashMap<i64, String> = User::find()
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u.name))
        .collect();

    // lowercase product -> (stored name, user id -> quantity)
    let mut totals: BTreeMap<String, (String, HashMap<i64, i64>)> = BTreeMap::new();
    for item in line_items {
        let Some(user_id) = user_of_order.get(&item.line_item.order_id) else {
            continue;
        };
        *totals
            .entry(item.product_name.to_lowercase())
            .or_insert_with(|| (item.product_name.clone(), HashMap::new()))
            .1
            .entry(*user_id)
            .or_insert(0) += i64::from(item.line_item.quantity);
    }

    let rows: Vec<SummaryRow> = totals
        .into_values()
        .filter_map(|(product, by_user)| {
            let mut contributors: Vec<(i64, Contributor)> = by_user
                .into_iter()
                .filter(|(_, quantity)| *quantity > 0)
                .map(|(user_id, quantity)| {
                    let name = names
                        .get(&user_id)
                        .cloned()
                        .unwrap_or_else(|| format!("user #{user_id}"));
                    (user_id, Contributor { name, quantity })
                })
                .collect();
            contributors.sort_by_cached_key(|(user_id, c)| (c.name.to_lowercase(), *user_id));
            let total_quantity = contributors.iter().map(|(_, c)| c.quantity).sum();
            (total_quantity > 0).then(|| SummaryRow {
                product,
                total_quantity,
                contributors: contributors.into_iter().map(|(_, c)| c).collect(),
            })
        })
        .collect();

    debug!(rows = rows.len(), start = %period.start, "Computed weekly summary");
    Ok(rows)
}
