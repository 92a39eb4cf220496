//! Order Discord commands - `/order add`, `/order remove`, `/order show`, `/order summary`.
//!
//! Adding applies immediately. Removing only previews the change and attaches
//! confirm/cancel buttons; the actual removal happens in the button handler.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{
            BotData, ensure_user, format,
            handlers::{autocomplete, interactions},
            parse,
        },
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;

    /// Parent command for the weekly order.
    #[poise::command(
        slash_command,
        subcommands("order_add", "order_remove", "order_show", "order_summary")
    )]
    pub async fn order(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Order commands. Available subcommands:\n\
            `/order add` - Add items to your order for this week\n\
            `/order remove` - Remove items (asks for confirmation)\n\
            `/order show` - Show your order for this week\n\
            `/order summary` - Show everyone's orders for this week";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Adds items to your order for the current week.
    #[poise::command(slash_command, rename = "add")]
    pub async fn order_add(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Items as `name quantity`, comma separated (e.g. `roll 2, bread 1`)"]
        #[autocomplete = "autocomplete::autocomplete_item_list"]
        items: String,
    ) -> Result<()> {
        let user = ensure_user(ctx).await?;
        let items = parse::parse_items(&items)?;
        let orders = &ctx.data().orders;

        let aggregate = orders.add_order(&user.external_id, &items).await?;

        let added = items
            .iter()
            .map(|item| format!("• {}x {}", item.quantity, item.product))
            .collect::<Vec<_>>()
            .join("\n");
        let period = format::format_period(
            &orders.current_period(),
            orders.settings().cutover.offset,
        );
        let embed = serenity::CreateEmbed::default()
            .title(format!("🥨 {}, your order was updated", user.name))
            .color(format::ORDER_COLOR)
            .field("Added", added, false)
            .field("Your order this week", format::format_aggregate(&aggregate), false)
            .footer(serenity::CreateEmbedFooter::new(format!("Order period: {period}")));

        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Removes items from your order for the current week, after confirmation.
    #[poise::command(slash_command, rename = "remove")]
    pub async fn order_remove(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Items as `name quantity`, comma separated (e.g. `roll 1`)"]
        #[autocomplete = "autocomplete::autocomplete_item_list"]
        items: String,
    ) -> Result<()> {
        let user = ensure_user(ctx).await?;
        let items = parse::parse_items(&items)?;
        let orders = &ctx.data().orders;

        let preview = orders.preview_removal(&user.external_id, &items).await?;
        let handle = orders.propose_removal(&user.external_id, &preview).await?;

        let reply = poise::CreateReply::default()
            .content(format::format_preview(
                &preview,
                orders.settings().removal_ttl.as_secs(),
            ))
            .components(interactions::removal_buttons(handle))
            .ephemeral(true);
        ctx.send(reply).await?;
        Ok(())
    }

    /// Shows your order for the current week.
    #[poise::command(slash_command, rename = "show")]
    pub async fn order_show(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let user = ensure_user(ctx).await?;
        let orders = &ctx.data().orders;

        let aggregate = orders.get_aggregate(&user.external_id).await?;
        let period = format::format_period(
            &orders.current_period(),
            orders.settings().cutover.offset,
        );
        let embed = serenity::CreateEmbed::default()
            .title("🥨 Your order this week")
            .color(format::ORDER_COLOR)
            .description(format::format_aggregate(&aggregate))
            .footer(serenity::CreateEmbedFooter::new(format!("Order period: {period}")));

        ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
            .await?;
        Ok(())
    }

    /// Shows everyone's orders for the current week.
    #[poise::command(slash_command, rename = "summary")]
    pub async fn order_summary(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let orders = &ctx.data().orders;

        let rows = orders.get_weekly_summary().await?;
        let total: i64 = rows.iter().map(|row| row.total_quantity).sum();
        let period = format::format_period(
            &orders.current_period(),
            orders.settings().cutover.offset,
        );
        let embed = serenity::CreateEmbed::default()
            .title(format!("📋 Weekly order ({total} items)"))
            .color(format::ORDER_COLOR)
            .description(format::format_summary(&rows))
            .footer(serenity::CreateEmbedFooter::new(format!("Order period: {period}")));

        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
