//! Saved order entity - A named, replayable list of items belonging to one user.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Saved order template database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "saved_orders")]
pub struct Model {
    /// Unique identifier for the template
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning user
    pub user_id: i64,
    /// Short alias, unique per user
    pub name: String,
    /// JSON-encoded list of `{ "product": .., "quantity": .. }`
    pub items: String,
    /// When the template was created
    pub created_at: DateTime,
    /// When the template was last modified
    pub updated_at: DateTime,
}

/// Defines relationships between `SavedOrder` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each template belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
