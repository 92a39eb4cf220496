//! Bot layer - Discord-specific interface and command handlers
//!
//! This module provides the Discord interface for the `OrderBuddy` application,
//! including all slash commands, the removal confirmation buttons, scheduled jobs and
//! bot context management.

/// Discord command implementations (order, saved, user, product, general)
pub mod commands;
/// Message text rendering
pub mod format;
/// Discord interaction handlers (autocomplete, buttons)
pub mod handlers;
/// Daily reminder and weekly digest
pub mod jobs;
/// Item list parsing
pub mod parse;

use crate::{
    config::settings::JobSchedule,
    core::{OrderService, removal::ExpiredProposal, user},
    entities::user::Model as UserModel,
    errors::{Error, Result},
};
use poise::serenity_prelude as serenity;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, instrument, warn};

/// Shared data available to all bot commands.
/// This structure holds the order service, which owns the database connection, and
/// the configured admin ids.
pub struct BotData {
    /// Order workflow, including pending removals
    pub orders: OrderService,
    /// External ids that are registered as admins
    pub admin_ids: Vec<String>,
}

impl BotData {
    /// Creates a new `BotData` instance.
    #[must_use]
    pub fn new(orders: OrderService, admin_ids: Vec<String>) -> Self {
        Self { orders, admin_ids }
    }

    /// Database connection for user and catalog operations.
    #[must_use]
    pub fn database(&self) -> &DatabaseConnection {
        self.orders.db()
    }
}

/// Poise context with our data and error types.
pub type Context<'a> = poise::Context<'a, BotData, Error>;

/// Returns the invoking user, registering them on first use.
///
/// # Errors
/// Returns an error if the lookup or registration fails.
pub async fn ensure_user(ctx: Context<'_>) -> Result<UserModel> {
    let author = ctx.author();
    let display_name = author.global_name.as_deref().unwrap_or(&author.name);
    user::get_or_register_user(
        ctx.data().database(),
        &author.id.to_string(),
        display_name,
        &ctx.data().admin_ids,
    )
    .await
}

async fn on_error(error: poise::FrameworkError<'_, BotData, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Failed to start bot: {error:?}");
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            if error.is_user_error() {
                info!("Rejected `{}`: {error}", ctx.command().name);
            } else if error.is_retryable() {
                warn!("Conflict in command `{}`: {error}", ctx.command().name);
            } else {
                error!("Error in command `{}`: {error:?}", ctx.command().name);
            }
            if let Err(e) = ctx.say(format::user_message(&error)).await {
                error!("Failed to send error message: {e}");
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {e}");
            }
        }
    }
}

/// Tells users whose removal window closed without an answer.
async fn notify_expired(
    http: Arc<serenity::Http>,
    mut expired: mpsc::UnboundedReceiver<ExpiredProposal>,
) {
    while let Some(notice) = expired.recv().await {
        let Ok(id) = notice.external_user_id.parse::<u64>() else {
            warn!(user = %notice.external_user_id, "Cannot notify non-Discord user");
            continue;
        };
        let message = serenity::CreateMessage::new().content(
            "⌛ Your removal request expired. Your order was not changed; \
             run `/order remove` again if you still want to remove items.",
        );
        if let Err(e) = serenity::UserId::new(id)
            .direct_message(http.as_ref(), message)
            .await
        {
            warn!(handle = %notice.handle, "Failed to send expiry notice: {e}");
        }
    }
}

/// Builds the poise framework and runs the client until it stops.
///
/// # Errors
/// Returns an error if the client cannot be created or the gateway connection fails.
#[instrument(skip_all)]
pub async fn run_bot(
    token: String,
    data: BotData,
    expired: mpsc::UnboundedReceiver<ExpiredProposal>,
    schedule: JobSchedule,
) -> Result<()> {
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                commands::order(),
                commands::saved(),
                commands::product(),
                commands::setname(),
                commands::away(),
                commands::digest(),
                commands::ping(),
                commands::help(),
            ],
            on_error: |error| Box::pin(on_error(error)),
            event_handler: |ctx, event, _framework, data| {
                Box::pin(handlers::interactions::handle_event(ctx, event, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                info!("Registering commands globally...");
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                tokio::spawn(notify_expired(Arc::clone(&ctx.http), expired));
                jobs::spawn_jobs(
                    Arc::clone(&ctx.http),
                    data.orders.clone(),
                    schedule,
                );
                Ok(data)
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged();

    info!("Setting up Serenity client for Poise framework...");
    let mut client = serenity::ClientBuilder::new(&token, intents)
        .framework(framework)
        .await?;

    info!("Starting bot client...");
    client.start().await?;
    Ok(())
}
