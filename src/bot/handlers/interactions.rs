//! Button interactions for pending removals.
//!
//! `/order remove` replies with a confirm and a cancel button whose custom ids carry the
//! proposal handle. Presses arrive here as gateway events, outside of any command
//! invocation.

use crate::{
    bot::{BotData, format},
    core::removal::ProposalHandle,
    errors::Result,
};
use poise::serenity_prelude as serenity;
use tracing::{debug, error, info};

const REMOVAL_PREFIX: &str = "remove";

/// What a removal button asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalAction {
    /// Apply the removal
    Confirm,
    /// Drop the removal
    Cancel,
}

impl RemovalAction {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Confirm => "confirm",
            Self::Cancel => "cancel",
        }
    }
}

/// Custom id for a removal button, e.g. `remove:confirm:12`.
#[must_use]
pub fn removal_button_id(action: RemovalAction, handle: ProposalHandle) -> String {
    format!("{REMOVAL_PREFIX}:{}:{handle}", action.as_str())
}

/// Parses a custom id created by [`removal_button_id`]. Ids of other components yield
/// `None`.
#[must_use]
pub fn parse_removal_action(custom_id: &str) -> Option<(RemovalAction, ProposalHandle)> {
    let mut parts = custom_id.split(':');
    if parts.next()? != REMOVAL_PREFIX {
        return None;
    }
    let action = match parts.next()? {
        "confirm" => RemovalAction::Confirm,
        "cancel" => RemovalAction::Cancel,
        _ => return None,
    };
    let handle = parts.next()?.parse::<u64>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((action, ProposalHandle(handle)))
}

/// Confirm and cancel buttons for a proposal.
#[must_use]
pub fn removal_buttons(handle: ProposalHandle) -> Vec<serenity::CreateActionRow> {
    vec![serenity::CreateActionRow::Buttons(vec![
        serenity::CreateButton::new(removal_button_id(RemovalAction::Confirm, handle))
            .label("Confirm removal")
            .style(serenity::ButtonStyle::Danger),
        serenity::CreateButton::new(removal_button_id(RemovalAction::Cancel, handle))
            .label("Cancel")
            .style(serenity::ButtonStyle::Secondary),
    ])]
}

/// Gateway event hook. Only component interactions are handled.
///
/// # Errors
/// Returns an error if responding to the interaction fails.
pub async fn handle_event(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    data: &BotData,
) -> Result<()> {
    if let serenity::FullEvent::InteractionCreate {
        interaction: serenity::Interaction::Component(component),
    } = event
    {
        handle_component(ctx, component, data).await?;
    }
    Ok(())
}

async fn handle_component(
    ctx: &serenity::Context,
    component: &serenity::ComponentInteraction,
    data: &BotData,
) -> Result<()> {
    let Some((action, handle)) = parse_removal_action(&component.data.custom_id) else {
        debug!(custom_id = %component.data.custom_id, "Ignoring unknown component");
        return Ok(());
    };
    let presser = component.user.id.to_string();

    let owner = match data.orders.proposal_owner(handle) {
        Ok(owner) => owner,
        Err(e) => return update_message(ctx, component, format::user_message(&e)).await,
    };
    if owner != presser {
        let reply = serenity::CreateInteractionResponseMessage::new()
            .content("⛔ Only the person who requested this removal can answer it.")
            .ephemeral(true);
        component
            .create_response(ctx, serenity::CreateInteractionResponse::Message(reply))
            .await?;
        return Ok(());
    }

    let text = match action {
        RemovalAction::Confirm => match data.orders.confirm_proposal(handle).await {
            Ok(aggregate) => format!(
                "✅ Removed. Your order this week:\n{}",
                format::format_aggregate(&aggregate)
            ),
            Err(e) => {
                if e.is_user_error() {
                    info!(%handle, "Removal not applied: {e}");
                } else {
                    error!(%handle, "Removal failed: {e:?}");
                }
                format::user_message(&e)
            }
        },
        RemovalAction::Cancel => match data.orders.cancel_proposal(handle) {
            Ok(()) => "↩️ Removal cancelled. Your order was not changed.".to_string(),
            Err(e) => format::user_message(&e),
        },
    };

    update_message(ctx, component, text).await
}

/// Replaces the preview with `text` and removes the buttons.
async fn update_message(
    ctx: &serenity::Context,
    component: &serenity::ComponentInteraction,
    text: String,
) -> Result<()> {
    let message = serenity::CreateInteractionResponseMessage::new()
        .content(text)
        .components(Vec::new());
    component
        .create_response(ctx, serenity::CreateInteractionResponse::UpdateMessage(message))
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_ids_parse_back() {
        let handle = ProposalHandle(42);
        assert_eq!(
            parse_removal_action(&removal_button_id(RemovalAction::Confirm, handle)),
            Some((RemovalAction::Confirm, handle))
        );
        assert_eq!(
            parse_removal_action(&removal_button_id(RemovalAction::Cancel, handle)),
            Some((RemovalAction::Cancel, handle))
        );
        assert_eq!(removal_button_id(RemovalAction::Confirm, handle), "remove:confirm:42");
    }

    #[test]
    fn test_foreign_ids_are_ignored() {
        assert_eq!(parse_removal_action("other:confirm:1"), None);
        assert_eq!(parse_removal_action("remove:undo:1"), None);
        assert_eq!(parse_removal_action("remove:confirm:x"), None);
        assert_eq!(parse_removal_action("remove:confirm:1:2"), None);
        assert_eq!(parse_removal_action("remove"), None);
    }
}
