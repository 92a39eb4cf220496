//! User Discord commands - display name and notification preferences.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, ensure_user},
        core::user,
        errors::{Error, Result},
    };

    /// Sets the name shown in the weekly summary.
    #[poise::command(slash_command)]
    pub async fn setname(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Name to show in the weekly summary"] name: String,
    ) -> Result<()> {
        let current = ensure_user(ctx).await?;
        let updated =
            user::update_user_name(ctx.data().database(), &current.external_id, &name).await?;

        ctx.say(format!("✅ You will show up as **{}**.", updated.name))
            .await?;
        Ok(())
    }

    /// Pauses or resumes reminders and the digest while you are away.
    #[poise::command(slash_command)]
    pub async fn away(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "True while you are away, false when you are back"] away: bool,
    ) -> Result<()> {
        let current = ensure_user(ctx).await?;
        user::set_away(ctx.data().database(), &current.external_id, away).await?;

        let message = if away {
            "🏖️ Marked as away. No reminders until you are back."
        } else {
            "👋 Welcome back! Reminders are on again."
        };
        ctx.say(message).await?;
        Ok(())
    }

    /// Opts in or out of the weekly order digest.
    #[poise::command(slash_command)]
    pub async fn digest(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Whether to receive the weekly digest"] enabled: bool,
    ) -> Result<()> {
        let current = ensure_user(ctx).await?;
        user::set_receives_digest(ctx.data().database(), &current.external_id, enabled).await?;

        let message = if enabled {
            "📬 You will receive the weekly digest."
        } else {
            "📭 You will no longer receive the weekly digest."
        };
        ctx.say(message).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
