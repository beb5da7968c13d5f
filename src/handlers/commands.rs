use std::error::Error;
use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::ReplyMarkup;
use teloxide::utils::command::BotCommands;

use crate::context::AppContext;
use crate::entities::{Operator, TgUser};
use crate::texts;

use super::utils;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "snake_case")]
pub enum Command {
    #[command(description = "начать работу с ботом")]
    Start,
    #[command(description = "помощь")]
    Help,
    #[command(description = "запросить доступ оператора")]
    Operator,
    #[command(description = "все операторы")]
    AllOperators,
}

/// Top-level command endpoint; failures turn into an apology in the chat.
pub async fn handle_command(
    bot: Bot,
    ctx: Arc<AppContext>,
    msg: Message,
    cmd: Command,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let chat_id = msg.chat.id;
    let result = match cmd {
        Command::Start => start(&bot, ctx, msg).await,
        Command::Help => help(&bot, ctx, msg).await,
        Command::Operator => request_operator_access(&bot, ctx, msg).await,
        Command::AllOperators => list_operators(&bot, ctx, msg).await,
    };
    if let Err(e) = result {
        log::error!("command handler failed in chat {}: {}", chat_id, e);
        if let Err(e) = bot.send_message(chat_id, texts::SOMETHING_WENT_WRONG_TEXT).await {
            log::error!("failed to send apology to chat {}: {}", chat_id, e);
        }
    }
    Ok(())
}

async fn start(
    bot: &Bot,
    ctx: Arc<AppContext>,
    msg: Message,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let Some(user) = &msg.from else {
        return Ok(());
    };
    TgUser::register(ctx.cache.pool(), user.id.0 as i64, user.username.as_deref()).await?;
    ctx.clear_chat_state(msg.chat.id).await;
    log::info!("user {} started the bot", user.id.0);

    bot.send_message(msg.chat.id, texts::START_TEXT)
        .reply_markup(utils::products_keyboard())
        .await?;
    Ok(())
}

async fn help(
    bot: &Bot,
    ctx: Arc<AppContext>,
    msg: Message,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let is_admin = msg
        .from
        .as_ref()
        .is_some_and(|user| ctx.is_admin(user.id.0 as i64));
    let text = if is_admin {
        format!("{}\n\n{}", texts::HELP_TEXT, texts::HELP_FOR_ADMIN_TEXT)
    } else {
        texts::HELP_TEXT.to_string()
    };
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

/// Forwards an operator-access request to every admin with a section picker.
async fn request_operator_access(
    bot: &Bot,
    ctx: Arc<AppContext>,
    msg: Message,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let Some(user) = &msg.from else {
        return Ok(());
    };
    let tg_id = user.id.0 as i64;
    TgUser::register(ctx.cache.pool(), tg_id, user.username.as_deref()).await?;

    let display = ctx.cache.user(tg_id).await.display_name().await?;
    let text = format!("Запрос на доступ оператора от: {display} (id {tg_id})");
    for admin_id in &ctx.config.admin_tg_ids {
        if let Err(e) = bot
            .send_message(ChatId(*admin_id), &text)
            .reply_markup(utils::section_choice_keyboard(tg_id))
            .await
        {
            log::error!("failed to notify admin {}: {}", admin_id, e);
        }
    }
    log::info!("operator access requested by {}", tg_id);

    bot.send_message(msg.chat.id, texts::OPERATOR_REQUEST_SENT_TEXT)
        .reply_markup(ReplyMarkup::kb_remove())
        .await?;
    Ok(())
}

/// Admin-only: all operators as delete buttons.
async fn list_operators(
    bot: &Bot,
    ctx: Arc<AppContext>,
    msg: Message,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let Some(user) = &msg.from else {
        return Ok(());
    };
    if !ctx.is_admin(user.id.0 as i64) {
        bot.send_message(msg.chat.id, texts::FALLBACK_TEXT).await?;
        return Ok(());
    }

    let mut entries = Vec::new();
    for operator_id in Operator::all_ids(ctx.cache.pool()).await? {
        let operator = ctx.cache.operator(operator_id).await;
        let name = operator.name().await?;
        let section = operator.section().await?;
        entries.push((operator_id, format!("{} | {}", name, section.as_str())));
    }

    if entries.is_empty() {
        bot.send_message(msg.chat.id, "Операторов пока нет").await?;
        return Ok(());
    }
    bot.send_message(msg.chat.id, "Операторы (нажмите, чтобы удалить):")
        .reply_markup(utils::operators_keyboard(&entries))
        .await?;
    Ok(())
}
