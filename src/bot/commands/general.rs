//! General Discord commands - ping, help, and other utility commands.
//! This module contains simple commands that don't require database operations
//! and provide basic bot functionality and user assistance.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        errors::{Error, Result},
    };

    /// Responds with "Pong!" to test bot connectivity.
    ///
    /// This is a simple health check command that doesn't require any database operations.
    #[poise::command(slash_command, prefix_command)]
    pub async fn ping(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        ctx.say("Pong!").await?;
        Ok(())
    }

    /// Displays help information about available commands.
    #[poise::command(slash_command, prefix_command)]
    pub async fn help(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "**OrderBuddy Help**\n\
        Orders are collected per week. A new week starts every Wednesday at 10:00.\n\n\
        **Ordering**\n\
        • `/order add <items>` - Adds items, e.g. `roll 2, bread 1`.\n\
        • `/order remove <items>` - Removes items after you confirm.\n\
        • `/order show` - Shows your order for this week.\n\
        • `/order summary` - Shows everyone's orders for this week.\n\n\
        **Saved orders**\n\
        • `/saved save <name> <items>` - Saves an item list.\n\
        • `/saved apply <name>` - Adds a saved list to this week's order.\n\
        • `/saved list` / `/saved delete <name>` - Manages saved lists.\n\n\
        **Preferences**\n\
        • `/setname <name>` - Sets your name in the summary.\n\
        • `/away <true|false>` - Pauses reminders.\n\
        • `/digest <true|false>` - Toggles the weekly digest.\n\n\
        **Products**\n\
        • `/product list` - Lists what can be ordered.\n\
        • `/product add` / `/product remove` - Manages the catalog (admins).\n\n\
        • `/ping` - Checks if the bot is responsive.";

        ctx.say(help_text).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
