//! Admin user configuration from environment variables.
//!
//! `ADMIN_USER_IDS` holds a comma-separated list of Discord user ids. Users in the list
//! are registered as admins and may manage the product catalog.

/// Parses a comma-separated id list, dropping blanks.
#[must_use]
pub fn parse_admin_ids(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Gets the configured admin ids. Empty when `ADMIN_USER_IDS` is not set.
#[must_use]
pub fn get_admin_ids() -> Vec<String> {
    std::env::var("ADMIN_USER_IDS")
        .map(|value| parse_admin_ids(&value))
        .unwrap_or_default()
}
