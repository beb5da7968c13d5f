use teloxide::{prelude::*, utils::command::BotCommands};

mod catalog;
mod context;
mod database;
mod entities;
mod errors;
mod handlers;
mod scheduler;
mod texts;

use crate::context::{AppContext, Config};
use crate::database::Database;
use crate::handlers::commands::Command;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Загружаем .env и инициализируем логирование
    dotenvy::dotenv().ok();
    env_logger::init();
    log::info!("Starting paperwork bot with PostgreSQL...");

    let config = Config::from_env()?;
    let db = Database::new(&config.database_url).await?;
    db.init().await?;
    log::info!("✅ Database initialized");

    let ctx = AppContext::new(db, config);
    let bot = Bot::from_env();

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        log::error!("failed to publish command list: {}", e);
    }

    // Напоминания о встречах, назначенных до перезапуска
    scheduler::recover_pending(&bot, &ctx).await?;

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(handlers::commands::handle_command),
        )
        .branch(Update::filter_message().endpoint(handlers::messages::handle_message))
        .branch(Update::filter_callback_query().endpoint(handlers::callbacks::handle_callback));

    log::info!("🚀 Starting dispatcher...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![ctx])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
