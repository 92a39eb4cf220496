//! Discord command implementations organized by category.

#![allow(clippy::too_long_first_doc_paragraph)]

/// General utility commands
pub mod general;

/// Weekly order commands
pub mod order;

/// Product catalog commands
pub mod product;

/// Saved order commands
pub mod saved;

/// User preference commands
pub mod user;

// Export commands
pub use general::*;
pub use order::*;
pub use product::*;
pub use saved::*;
pub use user::*;
