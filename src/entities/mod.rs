//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod order;
pub mod order_line_item;
pub mod product;
pub mod saved_order;
pub mod user;

// Re-export specific types to avoid conflicts
pub use order::{Column as OrderColumn, Entity as Order, Model as OrderModel};
pub use order_line_item::{
    Column as OrderLineItemColumn, Entity as OrderLineItem, Model as OrderLineItemModel,
};
pub use product::{Column as ProductColumn, Entity as Product, Model as ProductModel};
pub use saved_order::{Column as SavedOrderColumn, Entity as SavedOrder, Model as SavedOrderModel};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
