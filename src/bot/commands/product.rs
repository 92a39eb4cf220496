//! Product Discord commands - `/product add`, `/product remove`, `/product list`.
//!
//! Listing is open to everyone; changing the catalog requires an admin.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, ensure_user, handlers::autocomplete},
        core::product,
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;
    use tracing::info;

    /// Lets the command run only for admins, telling everyone else why not.
    async fn is_admin(ctx: poise::Context<'_, BotData, Error>) -> Result<bool> {
        let user = ensure_user(ctx).await?;
        if !user.is_admin {
            ctx.say("⛔ Only admins can change the product catalog.")
                .await?;
        }
        Ok(user.is_admin)
    }

    /// Parent command for the product catalog.
    #[poise::command(
        slash_command,
        subcommands("product_add", "product_remove", "product_list")
    )]
    pub async fn product(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Product commands. Available subcommands:\n\
            `/product list` - List all products\n\
            `/product add` - Add a product (admin)\n\
            `/product remove` - Remove a product (admin)";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Adds a product to the catalog.
    #[poise::command(slash_command, rename = "add", check = "is_admin")]
    pub async fn product_add(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Single-word product name (e.g. 'vollkorn')"] name: String,
        #[description = "Optional description"] description: Option<String>,
    ) -> Result<()> {
        let created = product::create_product(ctx.data().database(), &name, description).await?;
        info!("Product '{}' added by {}", created.name, ctx.author().id);

        ctx.say(format!("✅ Product '{}' added.", created.name))
            .await?;
        Ok(())
    }

    /// Removes a product from the catalog. Past orders keep it.
    #[poise::command(slash_command, rename = "remove", check = "is_admin")]
    pub async fn product_remove(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Product to remove"]
        #[autocomplete = "autocomplete::autocomplete_product_name"]
        name: String,
    ) -> Result<()> {
        let removed = product::deactivate_product(ctx.data().database(), &name).await?;
        info!("Product '{}' removed by {}", removed.name, ctx.author().id);

        ctx.say(format!("🗑️ Product '{}' removed.", removed.name))
            .await?;
        Ok(())
    }

    /// Lists all products that can be ordered.
    #[poise::command(slash_command, rename = "list")]
    pub async fn product_list(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let products = product::get_all_active_products(ctx.data().database()).await?;

        if products.is_empty() {
            ctx.say("No products have been defined yet.").await?;
            return Ok(());
        }

        let embed_fields: Vec<(String, String, bool)> = products
            .into_iter()
            .map(|p| {
                let description = p.description.unwrap_or_else(|| "\u{200b}".to_string());
                (p.name, description, false)
            })
            .collect();

        let list_embed = serenity::CreateEmbed::default()
            .title("**Product List**")
            .color(crate::bot::format::ORDER_COLOR)
            .fields(embed_fields);

        ctx.send(poise::CreateReply::default().embed(list_embed))
            .await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
