//! Core business logic - framework-agnostic order operations.
//!
//! Nothing in here knows about Discord. Functions take a database connection (or a
//! transaction) and plain values, and return domain types or structured errors.

/// Per-user order aggregation within a period
pub mod aggregate;
/// Adding and removing order items
pub mod order;
/// Weekly order window calculation
pub mod period;
/// Product catalog operations
pub mod product;
/// Pending removal proposals and their expiry
pub mod removal;
/// Next-run computation for recurring jobs
pub mod schedule;
/// Facade used by the bot layer
pub mod service;
/// Cross-user weekly summary
pub mod summary;
/// Saved order templates
pub mod template;
/// User registration and notification flags
pub mod user;

pub use service::{OrderService, ServiceSettings};
