//! Unified error types for `OrderBuddy`.
//!
//! Expected domain conditions (bad input, unknown products, insufficient quantities,
//! resolved proposals) are explicit variants carrying enough structure for the bot layer
//! to render a precise message. Store and framework failures travel through separate
//! generic variants so they are never mistaken for an empty order.

use crate::core::removal::ProposalState;
use sea_orm::DbErr;
use thiserror::Error;

/// One product whose requested removal exceeds what the user holds in the period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortfall {
    /// Product name as requested (or as stored, when it was found in the order)
    pub product: String,
    /// Quantity currently held in the period
    pub available: i64,
    /// Quantity the caller asked to remove
    pub requested: i64,
}

/// All errors produced by the crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input that is not tied to a quantity bound
    #[error("Validation error: {message}")]
    Validation {
        /// What was wrong with the input
        message: String,
    },

    /// A quantity outside the configured bounds
    #[error("Invalid quantity {quantity} for '{product}' (allowed {min}-{max})")]
    InvalidQuantity {
        /// Product the quantity was given for
        product: String,
        /// The offending quantity
        quantity: i64,
        /// Lower bound (inclusive)
        min: i64,
        /// Upper bound (inclusive)
        max: i64,
    },

    /// No registered user with this external id
    #[error("User not found: {user_id}")]
    UserNotFound {
        /// External (chat platform) id
        user_id: String,
    },

    /// Product is unknown or inactive
    #[error("Product not found: {name}")]
    ProductNotFound {
        /// Requested product name
        name: String,
    },

    /// An active product with the same (case-insensitive) name already exists
    #[error("Product already exists: {name}")]
    ProductExists {
        /// Conflicting name
        name: String,
    },

    /// No saved template with this name for the user
    #[error("Saved order not found: {name}")]
    TemplateNotFound {
        /// Requested template name
        name: String,
    },

    /// The user already has a template with this name
    #[error("Saved order already exists: {name}")]
    TemplateExists {
        /// Conflicting name
        name: String,
    },

    /// A removal asks for more than the user holds
    #[error("Insufficient quantity for {} product(s)", shortfalls.len())]
    InsufficientQuantity {
        /// Every offending product, in request order
        shortfalls: Vec<Shortfall>,
    },

    /// Handle does not refer to a known proposal
    #[error("Removal proposal {handle} not found")]
    ProposalNotFound {
        /// The unknown handle
        handle: u64,
    },

    /// The proposal has already been resolved
    #[error("Removal proposal is no longer active ({state:?})")]
    ProposalNotActive {
        /// The terminal state it is in
        state: ProposalState,
    },

    /// The store could not commit because of a concurrent modification; retryable
    #[error("Conflicting update, please retry: {message}")]
    Conflict {
        /// Store-provided detail
        message: String,
    },

    /// Configuration could not be read or is invalid
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Any other store failure
    #[error("Database error: {0}")]
    Database(DbErr),

    /// Template payload could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or invalid environment variable
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// Numeric conversion failure
    #[error("Conversion error: {0}")]
    TryFromInt(#[from] std::num::TryFromIntError),

    /// Discord transport failure
    #[error("Serenity/Poise framework error: {0}")]
    Framework(Box<poise::serenity_prelude::Error>),
}

impl Error {
    /// Whether the caller may retry the operation unchanged.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Whether the error describes a problem with the user's request rather than a
    /// failure of the bot or its store.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. }
                | Self::InvalidQuantity { .. }
                | Self::UserNotFound { .. }
                | Self::ProductNotFound { .. }
                | Self::ProductExists { .. }
                | Self::TemplateNotFound { .. }
                | Self::TemplateExists { .. }
                | Self::InsufficientQuantity { .. }
                | Self::ProposalNotFound { .. }
                | Self::ProposalNotActive { .. }
        )
    }
}

impl From<DbErr> for Error {
    fn from(value: DbErr) -> Self {
        if matches!(value, DbErr::RecordNotUpdated) {
            return Self::Conflict {
                message: value.to_string(),
            };
        }

        let text = value.to_string().to_lowercase();
        if text.contains("database is locked")
            || text.contains("database is busy")
            || text.contains("deadlock")
            || text.contains("could not serialize")
        {
            Self::Conflict {
                message: value.to_string(),
            }
        } else {
            Self::Database(value)
        }
    }
}

impl From<poise::serenity_prelude::Error> for Error {
    fn from(value: poise::serenity_prelude::Error) -> Self {
        Self::Framework(Box::new(value))
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
