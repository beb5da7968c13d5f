//! Plain-message routing. What a text or photo means depends entirely on
//! what the bot asked for last, tracked per chat in [`ChatState`].

use std::error::Error;
use std::sync::Arc;

use chrono::Utc;
use teloxide::prelude::*;
use teloxide::types::ReplyMarkup;

use crate::catalog::forms::{FieldType, FormField};
use crate::catalog::{product, product_by_name, ProductKey};
use crate::context::{AppContext, ChatState};
use crate::entities::{Service, TgUser};
use crate::texts;

use super::executor;
use super::payment_control;
use super::utils;

/// Top-level message endpoint. One chat's failure becomes an apology in
/// that chat, never a dead session or a killed dispatcher.
pub async fn handle_message(
    bot: Bot,
    ctx: Arc<AppContext>,
    msg: Message,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let chat_id = msg.chat.id;
    if let Err(e) = process_message(bot.clone(), ctx, msg).await {
        log::error!("message handler failed in chat {}: {}", chat_id, e);
        if let Err(e) = bot.send_message(chat_id, texts::SOMETHING_WENT_WRONG_TEXT).await {
            log::error!("failed to send apology to chat {}: {}", chat_id, e);
        }
    }
    Ok(())
}

async fn process_message(
    bot: Bot,
    ctx: Arc<AppContext>,
    msg: Message,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    if let Some(user) = &msg.from {
        let tg_id = user.id.0 as i64;
        if TgUser::is_banned(ctx.cache.pool(), tg_id).await? {
            log::warn!("ignoring message from banned user {}", tg_id);
            return Ok(());
        }
    }
    if msg.photo().is_some() || msg.document().is_some() {
        return handle_upload(bot, ctx, msg).await;
    }
    if msg.text().is_some() {
        return handle_text(bot, ctx, msg).await;
    }
    bot.send_message(msg.chat.id, texts::FALLBACK_TEXT).await?;
    Ok(())
}

async fn handle_text(
    bot: Bot,
    ctx: Arc<AppContext>,
    msg: Message,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let Some(text) = msg.text() else {
        return Ok(());
    };

    // Product buttons on the bottom keyboard work from any state and reset
    // whatever was in progress.
    if let Some(product) = product_by_name(text) {
        ctx.clear_chat_state(msg.chat.id).await;
        bot.send_message(msg.chat.id, product.terms)
            .reply_markup(utils::begin_keyboard(product))
            .await?;
        return Ok(());
    }

    match ctx.chat_state(msg.chat.id).await {
        ChatState::AwaitingCustomerName { kind } => {
            got_customer_name(&bot, &ctx, &msg, kind, text).await
        }
        ChatState::FillingForm { service_id, kind, index } => {
            got_form_answer(&bot, &ctx, &msg, service_id, kind, index, text).await
        }
        ChatState::AwaitingPaymentPhoto { .. } => {
            bot.send_message(msg.chat.id, "Пришлите скриншот перевода, пожалуйста")
                .await?;
            Ok(())
        }
        ChatState::AwaitingPassport { .. } => {
            bot.send_message(msg.chat.id, texts::WAITING_PASSPORT_TEXT).await?;
            Ok(())
        }
        ChatState::AwaitingVisa { .. } => {
            bot.send_message(msg.chat.id, texts::WAITING_EVISA_TEXT).await?;
            Ok(())
        }
        ChatState::Idle => {
            bot.send_message(msg.chat.id, texts::FALLBACK_TEXT).await?;
            Ok(())
        }
    }
}

/// Customer named the person the paperwork is for. Resumes their unfinished
/// request under that name or opens a new one, then asks for payment.
async fn got_customer_name(
    bot: &Bot,
    ctx: &Arc<AppContext>,
    msg: &Message,
    kind: ProductKey,
    name: &str,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let Some(user) = &msg.from else {
        return Ok(());
    };
    let name = name.trim();
    if name.is_empty() {
        bot.send_message(msg.chat.id, texts::WAITING_CUSTOMER_NAME_TEXT).await?;
        return Ok(());
    }

    let today = Utc::now()
        .with_timezone(&ctx.config.client_utc_offset)
        .date_naive();
    let service_id = Service::get_or_create(
        ctx.cache.pool(),
        kind,
        user.id.0 as i64,
        name,
        today,
    )
    .await?;
    log::info!("service {} ({}) for customer '{}'", service_id, kind.as_str(), name);

    bot.send_message(msg.chat.id, texts::GOT_CUSTOMER_NAME_TEXT)
        .reply_markup(ReplyMarkup::kb_remove())
        .await?;

    // A resumed request that is already paid goes straight back to
    // collecting documents.
    let product = product(kind);
    let service = ctx.cache.service_of_kind(service_id, kind).await;
    if service.is_paid().await? {
        ctx.clear_chat_state(msg.chat.id).await;
        bot.send_message(msg.chat.id, product.preparation)
            .reply_markup(utils::doc_actions_keyboard(product, service_id))
            .await?;
        return Ok(());
    }

    ctx.set_chat_state(msg.chat.id, ChatState::AwaitingPaymentPhoto { service_id })
        .await;
    bot.send_message(
        msg.chat.id,
        texts::payment_request_text(product.name, product.payment_amount, &ctx.config.payment_details),
    )
    .await?;
    Ok(())
}

async fn got_form_answer(
    bot: &Bot,
    ctx: &Arc<AppContext>,
    msg: &Message,
    service_id: i64,
    kind: ProductKey,
    index: usize,
    answer: &str,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let form = product(kind).form();
    let Some(field) = form.get(index) else {
        // Stale state pointing past the form; start over.
        ctx.clear_chat_state(msg.chat.id).await;
        bot.send_message(msg.chat.id, texts::FALLBACK_TEXT).await?;
        return Ok(());
    };

    let Some(value) = utils::validate_answer(field.field_type, answer) else {
        let complaint = match field.field_type {
            FieldType::YesNo => texts::ANSWER_SHOULD_BE_YES_NO_TEXT,
            FieldType::Count => texts::ANSWER_SHOULD_BE_COUNT_TEXT,
            _ => texts::FALLBACK_TEXT,
        };
        bot.send_message(msg.chat.id, complaint).await?;
        send_form_prompt(bot, msg.chat.id, field).await?;
        return Ok(());
    };

    let service = ctx.cache.service_of_kind(service_id, kind).await;
    service.put_form_value(field.id, value).await?;

    if index + 1 < form.len() {
        ctx.set_chat_state(
            msg.chat.id,
            ChatState::FillingForm {
                service_id,
                kind,
                index: index + 1,
            },
        )
        .await;
        send_form_prompt(bot, msg.chat.id, &form[index + 1]).await?;
        return Ok(());
    }

    // Last answer stored, the form is done.
    service.form_complete().await?;
    ctx.clear_chat_state(msg.chat.id).await;
    bot.send_message(msg.chat.id, texts::FORM_IS_END_TEXT)
        .reply_markup(ReplyMarkup::kb_remove())
        .await?;
    executor::check_readiness_and_handoff(bot, ctx, service_id).await?;
    Ok(())
}

pub(super) async fn send_form_prompt(
    bot: &Bot,
    chat_id: ChatId,
    field: &FormField,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let prompt = texts::form_field_prompt(field.label, field.field_type.description());
    let request = bot.send_message(chat_id, prompt);
    if field.field_type == FieldType::YesNo {
        request.reply_markup(utils::yes_no_keyboard()).await?;
    } else {
        request.reply_markup(ReplyMarkup::kb_remove()).await?;
    }
    Ok(())
}

async fn handle_upload(
    bot: Bot,
    ctx: Arc<AppContext>,
    msg: Message,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let Some(file_id) = utils::file_id_from_message(&msg) else {
        bot.send_message(msg.chat.id, texts::FALLBACK_TEXT).await?;
        return Ok(());
    };

    match ctx.chat_state(msg.chat.id).await {
        ChatState::AwaitingPaymentPhoto { service_id } => {
            let service = ctx.cache.service(service_id).await?;
            service.set_payment_photo(&file_id.0).await?;
            ctx.clear_chat_state(msg.chat.id).await;
            log::info!("service {}: payment screenshot received", service_id);

            bot.send_message(msg.chat.id, texts::GOT_PAYMENT_SCREENSHOT_TEXT).await?;
            payment_control::send_payment_to_control(&bot, &ctx, service_id).await?;

            // The customer can collect documents while the payment is
            // being reviewed.
            let product = product(service.kind());
            bot.send_message(msg.chat.id, product.preparation)
                .reply_markup(utils::doc_actions_keyboard(product, service_id))
                .await?;
        }
        ChatState::AwaitingPassport { service_id, kind } => {
            let service = ctx.cache.service_of_kind(service_id, kind).await;
            service.set_passport(&file_id.0).await?;
            service.passport_complete().await?;
            ctx.clear_chat_state(msg.chat.id).await;
            log::info!("service {}: passport received", service_id);

            bot.send_message(msg.chat.id, texts::PASSPORT_RECEIVED_TEXT).await?;
            executor::check_readiness_and_handoff(&bot, &ctx, service_id).await?;
        }
        ChatState::AwaitingVisa { service_id } => {
            let service = ctx.cache.service(service_id).await?;
            service.set_e_visa(&file_id.0).await?;
            service.visa_complete().await?;
            ctx.clear_chat_state(msg.chat.id).await;
            log::info!("service {}: e-visa received", service_id);

            bot.send_message(msg.chat.id, texts::EVISA_RECEIVED_TEXT).await?;
            executor::check_readiness_and_handoff(&bot, &ctx, service_id).await?;
        }
        _ => {
            bot.send_message(msg.chat.id, texts::FALLBACK_TEXT).await?;
        }
    }
    Ok(())
}
