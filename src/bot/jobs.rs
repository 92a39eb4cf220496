//! Scheduled jobs - the daily order reminder and the weekly digest.
//!
//! Each job is a Tokio task that sleeps until its next run, sends one direct message
//! per recipient and goes back to sleep. A failed message is logged and skipped; it
//! never stops the job.

use crate::{
    bot::format,
    config::settings::JobSchedule,
    core::{OrderService, aggregate, schedule::next_occurrence, summary::SummaryRow, user},
    entities::user::Model as UserModel,
    errors::Result,
};
use chrono::{FixedOffset, NaiveTime, Utc, Weekday};
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Starts both jobs in the background.
pub fn spawn_jobs(http: Arc<serenity::Http>, orders: OrderService, schedule: JobSchedule) {
    tokio::spawn(reminder_loop(Arc::clone(&http), orders.clone(), schedule));
    tokio::spawn(digest_loop(http, orders, schedule));
}

async fn sleep_until_next(weekday: Option<Weekday>, time: NaiveTime, offset: FixedOffset) {
    let now = Utc::now();
    let next = next_occurrence(now, weekday, time, offset);
    info!("Next run at {next}");
    tokio::time::sleep((next - now).to_std().unwrap_or_default()).await;
}

async fn reminder_loop(http: Arc<serenity::Http>, orders: OrderService, schedule: JobSchedule) {
    loop {
        sleep_until_next(None, schedule.reminder_time, schedule.offset).await;
        match send_reminders(&http, &orders).await {
            Ok(sent) => info!(sent, "Daily reminder done"),
            Err(e) => error!("Daily reminder failed: {e}"),
        }
    }
}

async fn digest_loop(http: Arc<serenity::Http>, orders: OrderService, schedule: JobSchedule) {
    loop {
        sleep_until_next(
            Some(schedule.digest_weekday),
            schedule.digest_time,
            schedule.offset,
        )
        .await;
        match send_digest(&http, &orders).await {
            Ok(sent) => info!(sent, "Weekly digest done"),
            Err(e) => error!("Weekly digest failed: {e}"),
        }
    }
}

/// Reminder text, including what the user already ordered this week.
#[must_use]
pub fn reminder_text(name: &str, current: &aggregate::OrderAggregate) -> String {
    format!(
        "🥐 Hi {name}, time for this week's bakery order!\n\
         Order with `/order add roll 2, bread 1`.\n\n\
         **Your order so far:**\n{}",
        format::format_aggregate(current)
    )
}

/// Digest text for the current period.
#[must_use]
pub fn digest_text(period: &str, rows: &[SummaryRow]) -> String {
    let total: i64 = rows.iter().map(|row| row.total_quantity).sum();
    format!(
        "📋 **Weekly order digest** ({period})\n{total} items in total.\n\n{}",
        format::format_summary(rows)
    )
}

async fn send_dm(http: &serenity::Http, recipient: &UserModel, text: String) -> bool {
    let Ok(id) = recipient.external_id.parse::<u64>() else {
        warn!(user = %recipient.external_id, "Skipping user without a Discord id");
        return false;
    };
    let message = serenity::CreateMessage::new().content(text);
    match serenity::UserId::new(id).direct_message(http, message).await {
        Ok(_) => true,
        Err(e) => {
            warn!(user = %recipient.external_id, "Failed to send direct message: {e}");
            false
        }
    }
}

/// Sends the daily reminder to every user who is not away. Returns the number sent.
///
/// # Errors
/// Returns an error only if the recipient list cannot be loaded.
pub async fn send_reminders(http: &serenity::Http, orders: &OrderService) -> Result<usize> {
    let recipients = user::reminder_recipients(orders.db()).await?;
    let period = orders.current_period();

    let mut sent = 0;
    for recipient in &recipients {
        let current = match aggregate::get_aggregate(orders.db(), recipient.id, &period).await {
            Ok(current) => current,
            Err(e) => {
                warn!(user = %recipient.external_id, "Failed to load order for reminder: {e}");
                continue;
            }
        };
        if send_dm(http, recipient, reminder_text(&recipient.name, &current)).await {
            sent += 1;
        }
    }
    Ok(sent)
}

/// Sends the weekly digest to every opted-in user who is not away. Returns the number
/// sent.
///
/// # Errors
/// Returns an error if the recipients or the summary cannot be loaded.
pub async fn send_digest(http: &serenity::Http, orders: &OrderService) -> Result<usize> {
    let recipients = user::digest_recipients(orders.db()).await?;
    if recipients.is_empty() {
        return Ok(0);
    }
    let rows = orders.get_weekly_summary().await?;
    let period = format::format_period(
        &orders.current_period(),
        orders.settings().cutover.offset,
    );
    let text = digest_text(&period, &rows);

    let mut sent = 0;
    for recipient in &recipients {
        if send_dm(http, recipient, text.clone()).await {
            sent += 1;
        }
    }
    Ok(sent)
}
