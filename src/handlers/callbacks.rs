//! Inline-button dispatch. Every callback payload decodes into a
//! [`CallbackAction`]; unknown or stale payloads are acknowledged and logged.

use std::error::Error;
use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::ReplyMarkup;

use crate::catalog::{product, DocAction, ProductKey, Section};
use crate::context::{AppContext, ChatState};
use crate::entities::{Operator, Service, TgUser};
use crate::errors::DomainError;
use crate::texts;

use super::callback_data::CallbackAction;
use super::executor;
use super::messages::send_form_prompt;
use super::payment_control;
use super::utils;

/// Top-level callback endpoint. Failures are logged and apologized for in
/// the originating chat instead of bubbling to the dispatcher.
pub async fn handle_callback(
    bot: Bot,
    ctx: Arc<AppContext>,
    q: CallbackQuery,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let chat_id = chat_of(&q).unwrap_or(ChatId(q.from.id.0 as i64));
    let query_id = q.id.clone();
    if let Err(e) = process_callback(bot.clone(), ctx, q).await {
        log::error!("callback handler failed in chat {}: {}", chat_id, e);
        // Stop the button spinner even if the handler died before answering.
        let _ = bot.answer_callback_query(query_id).await;
        if let Err(e) = bot.send_message(chat_id, texts::SOMETHING_WENT_WRONG_TEXT).await {
            log::error!("failed to send apology to chat {}: {}", chat_id, e);
        }
    }
    Ok(())
}

async fn process_callback(
    bot: Bot,
    ctx: Arc<AppContext>,
    q: CallbackQuery,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let tg_id = q.from.id.0 as i64;
    if TgUser::is_banned(ctx.cache.pool(), tg_id).await? {
        log::warn!("ignoring callback from banned user {}", tg_id);
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    }

    let action = q.data.as_deref().and_then(CallbackAction::parse);
    let Some(action) = action else {
        log::warn!("unparseable callback data: {:?}", q.data);
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };

    match action {
        CallbackAction::Begin(kind) => begin_service(&bot, &ctx, &q, kind).await,
        CallbackAction::Doc { kind, action, service_id } => {
            doc_action(&bot, &ctx, &q, kind, action, service_id).await
        }
        CallbackAction::MakeOperator { tg_id, section } => {
            make_operator(&bot, &ctx, &q, tg_id, section).await
        }
        CallbackAction::DeleteOperator { operator_id } => {
            delete_operator(&bot, &ctx, &q, operator_id).await
        }
        CallbackAction::PaymentOk { service_id } => {
            payment_control::handle_payment_decision(&bot, &ctx, &q, service_id, true).await
        }
        CallbackAction::PaymentReject { service_id } => {
            payment_control::handle_payment_decision(&bot, &ctx, &q, service_id, false).await
        }
        CallbackAction::Take { service_id } => executor::handle_take(&bot, &ctx, &q, service_id).await,
        CallbackAction::Refuse { service_id } => {
            executor::handle_refuse(&bot, &ctx, &q, service_id).await
        }
        CallbackAction::CustomerPlace { service_id, index } => {
            customer_place(&bot, &ctx, &q, service_id, index).await
        }
        CallbackAction::CustomerHour { service_id, hour } => {
            customer_hour(&bot, &ctx, &q, service_id, hour).await
        }
        CallbackAction::OperatorPlace { service_id, index } => {
            executor::handle_operator_place(&bot, &ctx, &q, service_id, index).await
        }
        CallbackAction::OperatorDate { service_id, date } => {
            executor::handle_operator_date(&bot, &ctx, &q, service_id, date).await
        }
    }
}

fn chat_of(q: &CallbackQuery) -> Option<ChatId> {
    q.message.as_ref().map(|m| m.chat().id)
}

/// "Начать оформление": ask who the service is for, offering to resume any
/// unfinished request of this user by its customer name.
async fn begin_service(
    bot: &Bot,
    ctx: &Arc<AppContext>,
    q: &CallbackQuery,
    kind: ProductKey,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let chat_id = chat_of(q).unwrap_or(ChatId(q.from.id.0 as i64));
    let tg_id = q.from.id.0 as i64;

    let names = Service::uncompleted_customer_names(ctx.cache.pool(), kind, tg_id).await?;
    ctx.set_chat_state(chat_id, ChatState::AwaitingCustomerName { kind }).await;

    if names.is_empty() {
        bot.send_message(chat_id, texts::WAITING_CUSTOMER_NAME_TEXT)
            .reply_markup(ReplyMarkup::kb_remove())
            .await?;
    } else {
        let text = format!(
            "{}{}",
            texts::WAITING_CUSTOMER_NAME_TEXT,
            texts::CUSTOMER_NAME_EXIST_TEXT
        );
        bot.send_message(chat_id, text)
            .reply_markup(utils::customer_names_keyboard(&names))
            .await?;
    }
    bot.answer_callback_query(q.id.clone()).await?;
    Ok(())
}

async fn doc_action(
    bot: &Bot,
    ctx: &Arc<AppContext>,
    q: &CallbackQuery,
    kind: ProductKey,
    action: DocAction,
    service_id: i64,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let Some(chat_id) = chat_of(q) else {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };
    let service = ctx.cache.service_of_kind(service_id, kind).await;
    // Stale or forwarded buttons must not touch someone else's request.
    if service.user_tg_id().await? != q.from.id.0 as i64 {
        log::warn!(
            "doc action on service {} by non-owner {}",
            service_id,
            q.from.id.0
        );
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    }
    let product = product(kind);

    match action {
        DocAction::FillForm => {
            // Re-filling restarts the form from the first field.
            service.form_incomplete().await?;
            ctx.set_chat_state(chat_id, ChatState::FillingForm { service_id, kind, index: 0 })
                .await;
            bot.send_message(chat_id, texts::START_FORM_FILLING_TEXT).await?;
            send_form_prompt(bot, chat_id, &product.form()[0]).await?;
        }
        DocAction::SendPassport => {
            service.passport_incomplete().await?;
            ctx.set_chat_state(chat_id, ChatState::AwaitingPassport { service_id, kind })
                .await;
            bot.send_message(chat_id, texts::WAITING_PASSPORT_TEXT).await?;
        }
        DocAction::SendVisa => {
            if kind != ProductKey::DriverLicense {
                log::warn!("visa action on service {} of kind {}", service_id, kind.as_str());
                bot.answer_callback_query(q.id.clone()).await?;
                return Ok(());
            }
            service.visa_incomplete().await?;
            ctx.set_chat_state(chat_id, ChatState::AwaitingVisa { service_id }).await;
            bot.send_message(chat_id, texts::WAITING_EVISA_TEXT).await?;
        }
        DocAction::ChooseMeeting => {
            bot.send_message(chat_id, texts::CHOSE_MEETING_PLACE_TEXT.trim_start())
                .reply_markup(utils::places_keyboard(product, service_id, false))
                .await?;
        }
    }
    bot.answer_callback_query(q.id.clone()).await?;
    Ok(())
}

/// Admin verdict on an operator-access request.
async fn make_operator(
    bot: &Bot,
    ctx: &Arc<AppContext>,
    q: &CallbackQuery,
    tg_id: i64,
    section: Option<Section>,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    if !ctx.is_admin(q.from.id.0 as i64) {
        bot.answer_callback_query(q.id.clone())
            .text(texts::FALLBACK_TEXT)
            .await?;
        return Ok(());
    }

    let Some(section) = section else {
        // Dismissed: drop the request message.
        if let Some(message) = &q.message {
            let _ = bot.delete_message(message.chat().id, message.id()).await;
        }
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };

    let name = ctx.cache.user(tg_id).await.display_name().await?;
    match Operator::new(ctx.cache.pool(), tg_id, section, &name).await {
        Ok(operator_id) => {
            log::info!("operator {} ({}) granted section {}", operator_id, tg_id, section.as_str());
            if let Some(message) = &q.message {
                let _ = bot
                    .edit_message_text(
                        message.chat().id,
                        message.id(),
                        format!("Оператор назначен: {} | {}", name, section.as_str()),
                    )
                    .await;
            }
            bot.send_message(
                ChatId(tg_id),
                format!("Вам выдан доступ оператора: {}", section.as_str()),
            )
            .await?;
            bot.answer_callback_query(q.id.clone()).await?;
        }
        Err(DomainError::OperatorAlreadySet(_)) => {
            bot.answer_callback_query(q.id.clone())
                .text(texts::OPERATOR_ALREADY_SET_TEXT)
                .await?;
        }
        Err(e) => {
            log::error!("failed to grant operator access to {}: {}", tg_id, e);
            bot.answer_callback_query(q.id.clone())
                .text(texts::OPERATOR_ASSIGN_FAILED_TEXT)
                .await?;
        }
    }
    Ok(())
}

async fn delete_operator(
    bot: &Bot,
    ctx: &Arc<AppContext>,
    q: &CallbackQuery,
    operator_id: i64,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    if !ctx.is_admin(q.from.id.0 as i64) {
        bot.answer_callback_query(q.id.clone())
            .text(texts::FALLBACK_TEXT)
            .await?;
        return Ok(());
    }

    match Operator::delete(ctx.cache.pool(), operator_id).await {
        Ok(()) => {
            ctx.cache.forget_operator(operator_id).await;
            log::info!("operator {} deleted", operator_id);
            if let Some(message) = &q.message {
                let _ = bot
                    .edit_message_text(message.chat().id, message.id(), "Оператор удален")
                    .await;
            }
            bot.answer_callback_query(q.id.clone()).await?;
        }
        Err(DomainError::OperatorNotFound(_)) => {
            bot.answer_callback_query(q.id.clone())
                .text(texts::SOMETHING_WENT_WRONG_TEXT)
                .await?;
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

/// Driver-license customer picked where to meet.
async fn customer_place(
    bot: &Bot,
    ctx: &Arc<AppContext>,
    q: &CallbackQuery,
    service_id: i64,
    index: usize,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let service = ctx.cache.service(service_id).await?;
    if service.user_tg_id().await? != q.from.id.0 as i64 {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    }
    let product = product(service.kind());
    let Some(place) = product.place(index) else {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };
    service.set_meeting_place(place.address).await?;
    log::info!("service {}: meeting place '{}'", service_id, place.name);

    if let Some(message) = &q.message {
        bot.edit_message_text(
            message.chat().id,
            message.id(),
            format!("Место: {}{}", place.name, texts::CHOSE_MEETING_TIME_TEXT),
        )
        .reply_markup(utils::hours_keyboard(service_id))
        .await?;
    }
    bot.answer_callback_query(q.id.clone()).await?;
    Ok(())
}

/// Driver-license customer picked the meeting hour. The date stays open
/// until the executor confirms it after checking the documents.
async fn customer_hour(
    bot: &Bot,
    ctx: &Arc<AppContext>,
    q: &CallbackQuery,
    service_id: i64,
    hour: u32,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let service = ctx.cache.service(service_id).await?;
    if service.user_tg_id().await? != q.from.id.0 as i64 {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    }
    let Some(time) = executor::placeholder_hour(hour, ctx.config.client_utc_offset) else {
        bot.answer_callback_query(q.id.clone())
            .text(texts::SOMETHING_WENT_WRONG_TEXT)
            .await?;
        return Ok(());
    };
    service.set_meeting_time(time).await?;
    log::info!("service {}: meeting hour {}:00", service_id, hour);

    if let Some(message) = &q.message {
        bot.edit_message_text(
            message.chat().id,
            message.id(),
            format!("Время: {:02}:00{}", hour, texts::MEETING_DATE_CHOSEN_BY_OPERATOR_TEXT),
        )
        .await?;
    }
    bot.answer_callback_query(q.id.clone()).await?;
    executor::check_readiness_and_handoff(bot, ctx, service_id).await?;
    Ok(())
}
