use dotenvy::dotenv;
use order_buddy::{
    bot::{self, BotData},
    config::{database, settings, users},
    core::{OrderService, product},
    errors::{Error, Result},
};
use std::env;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars may also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load config.toml
    let config = settings::load_default_config()
        .inspect_err(|e| error!("Failed to load configuration: {e}"))?;
    let service_settings = config.service_settings()?;
    let schedule = config.job_schedule()?;
    info!("Successfully processed application configuration.");

    // 4. Initialize database
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {e}"))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {e}"))?;

    // 5. Seed configured products
    let seeded = product::seed_products(&db, &config.products)
        .await
        .inspect_err(|e| error!("Failed to seed products: {e}"))?;
    info!("Seeded {seeded} product(s).");

    // 6. Run the bot
    let token = env::var("DISCORD_BOT_TOKEN")
        .inspect_err(|e| error!("DISCORD_BOT_TOKEN not found: {e}"))
        .map_err(Error::EnvVar)?;

    let (orders, expired) = OrderService::new(db, service_settings);
    let data = BotData::new(orders, users::get_admin_ids());
    bot::run_bot(token, data, expired, schedule).await
}
