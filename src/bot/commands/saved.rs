//! Saved order Discord commands - named item lists that can be replayed each week.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, ensure_user, format, handlers::autocomplete, parse},
        errors::{Error, Result},
    };

    /// Parent command for saved orders.
    #[poise::command(
        slash_command,
        subcommands("saved_save", "saved_apply", "saved_list", "saved_delete")
    )]
    pub async fn saved(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Saved order commands. Available subcommands:\n\
            `/saved save` - Save an item list under a name\n\
            `/saved apply` - Add a saved list to this week's order\n\
            `/saved list` - Show your saved lists\n\
            `/saved delete` - Delete a saved list";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Saves an item list under a name.
    #[poise::command(slash_command, rename = "save")]
    pub async fn saved_save(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Name for the list (e.g. 'usual')"] name: String,
        #[description = "Items as `name quantity`, comma separated"]
        #[autocomplete = "autocomplete::autocomplete_item_list"]
        items: String,
    ) -> Result<()> {
        let user = ensure_user(ctx).await?;
        let items = parse::parse_items(&items)?;

        let template = ctx
            .data()
            .orders
            .save_template(&user.external_id, &name, &items)
            .await?;

        ctx.say(format!(
            "✅ Saved '{}'. Use `/saved apply {}` to add it to your order.",
            template.name, template.name
        ))
        .await?;
        Ok(())
    }

    /// Adds a saved list to your order for the current week.
    #[poise::command(slash_command, rename = "apply")]
    pub async fn saved_apply(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Saved list to add"]
        #[autocomplete = "autocomplete::autocomplete_template_name"]
        name: String,
    ) -> Result<()> {
        let user = ensure_user(ctx).await?;

        let aggregate = ctx
            .data()
            .orders
            .apply_template(&user.external_id, &name)
            .await?;

        ctx.say(format!(
            "✅ Added '{name}'. Your order this week:\n{}",
            format::format_aggregate(&aggregate)
        ))
        .await?;
        Ok(())
    }

    /// Lists your saved item lists.
    #[poise::command(slash_command, rename = "list")]
    pub async fn saved_list(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let user = ensure_user(ctx).await?;
        let templates = ctx.data().orders.list_templates(&user.external_id).await?;

        ctx.send(
            poise::CreateReply::default()
                .content(format::format_templates(&templates))
                .ephemeral(true),
        )
        .await?;
        Ok(())
    }

    /// Deletes a saved item list.
    #[poise::command(slash_command, rename = "delete")]
    pub async fn saved_delete(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Saved list to delete"]
        #[autocomplete = "autocomplete::autocomplete_template_name"]
        name: String,
    ) -> Result<()> {
        let user = ensure_user(ctx).await?;
        ctx.data()
            .orders
            .delete_template(&user.external_id, &name)
            .await?;

        ctx.say(format!("🗑️ Deleted '{name}'.")).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
