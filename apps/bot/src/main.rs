use std::sync::Arc;

use dotenv::dotenv;
use teloxide::prelude::*;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod messenger;
mod router;

use conversation_cell::{ConversationController, ServiceContext};
use messenger::TelegramMessenger;
use shared_config::AppConfig;
use shared_database::BookingStore;
use shared_utils::SystemClock;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Doctomed call bot");

    // Load configuration
    let config = Arc::new(AppConfig::from_env());
    if !config.is_configured() {
        error!("Bot token or storage credentials are missing, refusing to start");
        anyhow::bail!("incomplete configuration: check TELEGRAM_BOT_TOKEN and the storage settings");
    }

    let store = shared_database::connect(&config);
    if let Err(e) = store.ping().await {
        warn!("Storage is not reachable yet: {}", e);
    }

    let bot = Bot::new(config.telegram_bot_token.clone());
    let messenger = TelegramMessenger::new(bot.clone());

    let ctx = Arc::new(ServiceContext::new(
        store,
        Arc::new(messenger.clone()),
        config.clone(),
        Arc::new(SystemClock),
    ));
    let seeded = ctx.admin.seed_admins(&config.admin_ids).await?;
    info!("Seeded {} administrators from configuration", seeded);

    let controller = Arc::new(ConversationController::new(ctx));

    info!("Dispatching Telegram updates");
    Dispatcher::builder(bot, router::create_router())
        .dependencies(dptree::deps![controller, messenger])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Bot stopped");
    Ok(())
}
