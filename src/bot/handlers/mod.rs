//! Discord interaction handlers
//!
//! This module provides handlers for Discord interactions such as autocomplete,
//! button clicks, and other non-command interactions.

/// Autocomplete handlers for product names, saved orders and item lists
pub mod autocomplete;
/// Confirm/cancel buttons of pending removals
pub mod interactions;
