//! User entity - A person taking part in the weekly order.
//!
//! Users are keyed by their chat platform id, created on first interaction and never
//! hard-deleted. The flags drive who receives the daily reminder and the weekly digest.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Stable external id (Discord user id)
    #[sea_orm(unique)]
    pub external_id: String,
    /// Display name used in summaries
    pub name: String,
    /// Away users get no reminders or digests
    pub is_away: bool,
    /// Admins may manage the product catalog
    pub is_admin: bool,
    /// Whether the user receives the weekly digest
    pub receives_digest: bool,
    /// When the user was registered
    pub created_at: DateTimeUtc,
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One user has many orders
    #[sea_orm(has_many = "super::order::Entity")]
    Orders,
    /// One user has many saved order templates
    #[sea_orm(has_many = "super::saved_order::Entity")]
    SavedOrders,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl Related<super::saved_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SavedOrders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
