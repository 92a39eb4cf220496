//! Rendering of core results into Discord message text.
//!
//! Everything here is pure so it can be tested without a gateway connection.

use crate::{
    core::{
        aggregate::OrderAggregate,
        order::RemovalPreview,
        period::OrderPeriod,
        removal::ProposalState,
        summary::SummaryRow,
        template::Template,
    },
    errors::{Error, Shortfall},
};
use chrono::FixedOffset;
use std::fmt::Write;

/// Embed color used for order messages (pretzel gold).
pub const ORDER_COLOR: u32 = 0x00F2_C744;

/// `• 2x roll` lines, or a placeholder for an empty order.
#[must_use]
pub fn format_aggregate(aggregate: &OrderAggregate) -> String {
    if aggregate.is_empty() {
        return "_Nothing ordered yet._".to_string();
    }
    aggregate
        .iter()
        .map(|(product, quantity)| format!("• {quantity}x {product}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// `15.05.2024 11:00 - 22.05.2024 10:59` in the given local offset.
#[must_use]
pub fn format_period(period: &OrderPeriod, offset: FixedOffset) -> String {
    format!(
        "{} - {}",
        period.start.with_timezone(&offset).format("%d.%m.%Y %H:%M"),
        period.end.with_timezone(&offset).format("%d.%m.%Y %H:%M")
    )
}

/// Before/after view of a removal awaiting confirmation.
#[must_use]
pub fn format_preview(preview: &RemovalPreview, ttl_secs: u64) -> String {
    let removing = preview
        .approved
        .iter()
        .map(|item| format!("• {}x {}", item.quantity, item.product))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "**Remove:**\n{removing}\n\n**Current order:**\n{}\n\n**After removal:**\n{}\n\n\
         Confirm within {ttl_secs} seconds.",
        format_aggregate(&preview.current),
        format_aggregate(&preview.resulting),
    )
}

/// One block per product with its contributors.
#[must_use]
pub fn format_summary(rows: &[SummaryRow]) -> String {
    if rows.is_empty() {
        return "_No orders this week._".to_string();
    }
    let mut out = String::new();
    for row in rows {
        let _ = writeln!(out, "**{}x {}**", row.total_quantity, row.product);
        for contributor in &row.contributors {
            let _ = writeln!(out, "  • {} ({})", contributor.name, contributor.quantity);
        }
    }
    out.trim_end().to_string()
}

/// Template names with their items.
#[must_use]
pub fn format_templates(templates: &[Template]) -> String {
    if templates.is_empty() {
        return "_No saved orders. Use `/saved save` to create one._".to_string();
    }
    templates
        .iter()
        .map(|t| {
            let items = t
                .items
                .iter()
                .map(|item| format!("{}x {}", item.quantity, item.product))
                .collect::<Vec<_>>()
                .join(", ");
            format!("• **{}**: {items}", t.name)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_shortfalls(shortfalls: &[Shortfall]) -> String {
    shortfalls
        .iter()
        .map(|s| {
            format!(
                "• {}: you have {}, asked to remove {}",
                s.product, s.available, s.requested
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

const fn state_label(state: ProposalState) -> &'static str {
    match state {
        ProposalState::Proposed => "still pending",
        ProposalState::Confirming => "being confirmed",
        ProposalState::Confirmed => "already confirmed",
        ProposalState::Cancelled => "cancelled",
        ProposalState::Expired => "expired",
    }
}

/// User-facing text for an error.
///
/// Domain errors get a precise message. Store and framework failures get a generic
/// one; their details go to the log, not to the channel.
#[must_use]
pub fn user_message(error: &Error) -> String {
    match error {
        Error::Validation { message } => format!("❌ {message}"),
        Error::InvalidQuantity {
            product,
            quantity,
            min,
            max,
        } => format!("❌ Quantity {quantity} for '{product}' must be between {min} and {max}."),
        Error::UserNotFound { .. } => {
            "❌ You are not registered yet. Run any order command to register.".to_string()
        }
        Error::ProductNotFound { name } => {
            format!("❌ Unknown product '{name}'. Use `/product list` to see what is available.")
        }
        Error::ProductExists { name } => format!("⚠️ A product named '{name}' already exists."),
        Error::TemplateNotFound { name } => format!("❌ No saved order named '{name}'."),
        Error::TemplateExists { name } => {
            format!("⚠️ You already have a saved order named '{name}'.")
        }
        Error::InsufficientQuantity { shortfalls } => format!(
            "❌ You cannot remove more than you ordered:\n{}",
            format_shortfalls(shortfalls)
        ),
        Error::ProposalNotFound { .. } => "❌ This removal request is no longer known.".to_string(),
        Error::ProposalNotActive { state } => {
            format!("❌ This removal request is {}.", state_label(*state))
        }
        Error::Conflict { .. } => {
            "⚠️ Someone else changed the order at the same time. Please try again.".to_string()
        }
        _ => "❌ Something went wrong. Please try again later.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{
        core::{order::OrderItemRequest, summary::Contributor},
        test_utils::test_period,
    };

    #[test]
    fn test_format_aggregate() {
        let aggregate: OrderAggregate = [("roll", 2), ("bread", 1)].into_iter().collect();
        assert_eq!(format_aggregate(&aggregate), "• 1x bread\n• 2x roll");
        assert_eq!(format_aggregate(&OrderAggregate::new()), "_Nothing ordered yet._");
    }

    #[test]
    fn test_format_period_in_local_time() {
        let offset = FixedOffset::east_opt(3600).unwrap();
        assert_eq!(
            format_period(&test_period(), offset),
            "15.05.2024 11:00 - 22.05.2024 10:59"
        );
    }

    #[test]
    fn test_format_summary() {
        let rows = vec![SummaryRow {
            product: "roll".to_string(),
            total_quantity: 5,
            contributors: vec![
                Contributor {
                    name: "Alice".to_string(),
                    quantity: 2,
                },
                Contributor {
                    name: "Bob".to_string(),
                    quantity: 3,
                },
            ],
        }];
        assert_eq!(
            format_summary(&rows),
            "**5x roll**\n  • Alice (2)\n  • Bob (3)"
        );
        assert_eq!(format_summary(&[]), "_No orders this week._");
    }

    #[test]
    fn test_format_preview_lists_before_and_after() {
        let preview = RemovalPreview {
            period: test_period(),
            current: [("roll", 3)].into_iter().collect(),
            resulting: [("roll", 1)].into_iter().collect(),
            approved: vec![OrderItemRequest::new("roll", 2)],
        };
        let text = format_preview(&preview, 30);
        assert!(text.contains("• 2x roll\n"));
        assert!(text.contains("**Current order:**\n• 3x roll"));
        assert!(text.contains("**After removal:**\n• 1x roll"));
        assert!(text.contains("30 seconds"));
    }

    #[test]
    fn test_user_message_lists_every_shortfall() {
        let error = Error::InsufficientQuantity {
            shortfalls: vec![
                Shortfall {
                    product: "roll".to_string(),
                    available: 1,
                    requested: 3,
                },
                Shortfall {
                    product: "bagel".to_string(),
                    available: 0,
                    requested: 1,
                },
            ],
        };
        let text = user_message(&error);
        assert!(text.contains("roll: you have 1, asked to remove 3"));
        assert!(text.contains("bagel: you have 0, asked to remove 1"));
    }

    #[test]
    fn test_user_message_hides_store_errors() {
        let error = Error::Database(sea_orm::DbErr::Custom("disk I/O error".to_string()));
        assert!(!user_message(&error).contains("disk"));
        assert_eq!(
            user_message(&Error::ProposalNotActive {
                state: ProposalState::Expired
            }),
            "❌ This removal request is expired."
        );
    }
}
