use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;
use tracing::{info, warn};

use storefront_bot::bot;
use storefront_bot::bot::TurnLockManager;
use storefront_bot::catalog::CatalogSnapshot;
use storefront_bot::config::BotConfig;
use storefront_bot::db;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    info!("Starting storefront funnel bot");

    // Load environment variables from .env file
    dotenv::dotenv().ok();
    let config = BotConfig::from_env()?;

    info!("Initializing database at: {}", config.database_url);
    let pool = db::connect(&config.database_url).await?;
    db::init_database_schema(&pool).await?;

    // Name snapshot for literal matching, captured once per process
    let snapshot = Arc::new(CatalogSnapshot::load(&pool).await?);
    info!(
        categories = snapshot.category_names.len(),
        items = snapshot.item_names.len(),
        "Catalog snapshot loaded"
    );
    if snapshot.category_names.is_empty() {
        warn!("Catalog is empty; run the seed binary before first contact");
    }

    let bot = Bot::new(&config.bot_token);
    let locks = Arc::new(TurnLockManager::new());
    let send_timeout = Duration::from_secs(config.send_timeout_secs);

    info!("Bot initialized, starting dispatcher");

    // Set up the dispatcher with shared pool, snapshot and lock map
    let handler = dptree::entry().branch(Update::filter_message().endpoint({
        let pool = pool.clone();
        let snapshot = Arc::clone(&snapshot);
        let locks = Arc::clone(&locks);
        move |bot: Bot, msg: Message| {
            let pool = pool.clone();
            let snapshot = Arc::clone(&snapshot);
            let locks = Arc::clone(&locks);
            async move {
                bot::message_handler(bot, msg, pool, snapshot, locks, send_timeout).await
            }
        }
    }));

    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
