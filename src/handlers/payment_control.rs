//! Payment screenshot review. The screenshot is forwarded to every operator
//! of the PAYMENT_CONTROL section with approve/reject buttons; the verdict
//! flips `is_paid` and notifies the customer.

use std::error::Error;
use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{FileId, InputFile};

use crate::catalog::{product, Section};
use crate::context::AppContext;
use crate::entities::Operator;
use crate::texts;

use super::executor;
use super::utils;

/// Sends the stored screenshot to every payment-control operator.
pub async fn send_payment_to_control(
    bot: &Bot,
    ctx: &Arc<AppContext>,
    service_id: i64,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let service = ctx.cache.service(service_id).await?;
    let Some(photo) = service.payment_photo().await? else {
        log::warn!("service {} has no payment photo to review", service_id);
        return Ok(());
    };

    let product = product(service.kind());
    let user = ctx.cache.user(service.user_tg_id().await?).await;
    let caption = texts::payment_control_caption(
        product.name,
        product.payment_amount,
        &user.display_name().await?,
    );

    let reviewer_ids = Operator::ids_in_section(ctx.cache.pool(), Section::PaymentControl).await?;
    if reviewer_ids.is_empty() {
        log::error!("no payment control operators to review service {}", service_id);
        return Ok(());
    }
    for operator_id in reviewer_ids {
        let operator = ctx.cache.operator(operator_id).await;
        let chat = ChatId(operator.tg_id().await?);
        let sent = bot
            .send_photo(chat, InputFile::file_id(FileId(photo.clone())))
            .caption(&caption)
            .reply_markup(utils::payment_decision_keyboard(service_id))
            .await;
        if let Err(e) = sent {
            log::error!(
                "failed to send payment of service {} to operator {}: {}",
                service_id,
                operator_id,
                e
            );
        }
    }
    log::info!("payment of service {} sent for review", service_id);
    Ok(())
}

/// Approve or reject a reviewed payment. Only payment-control operators may
/// decide; the verdict message under the screenshot is rewritten so a second
/// reviewer sees it is settled.
pub async fn handle_payment_decision(
    bot: &Bot,
    ctx: &Arc<AppContext>,
    q: &CallbackQuery,
    service_id: i64,
    approved: bool,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let reviewer_tg_id = q.from.id.0 as i64;
    let is_reviewer =
        Operator::find_for(ctx.cache.pool(), reviewer_tg_id, Section::PaymentControl)
            .await?
            .is_some();
    if !is_reviewer {
        log::warn!(
            "payment decision on service {} by non-reviewer {}",
            service_id,
            reviewer_tg_id
        );
        bot.answer_callback_query(q.id.clone())
            .text(texts::FALLBACK_TEXT)
            .await?;
        return Ok(());
    }

    let service = ctx.cache.service(service_id).await?;
    if approved {
        service.confirm_payment().await?;
    } else {
        service.cancel_payment().await?;
    }
    log::info!(
        "payment of service {} {} by operator tg {}",
        service_id,
        if approved { "confirmed" } else { "rejected" },
        reviewer_tg_id
    );

    // Rewrite the review message so the verdict is visible in place.
    if let Some(message) = &q.message {
        let verdict = if approved {
            utils::PAYMENT_OK_LABEL
        } else {
            utils::PAYMENT_REJECT_LABEL
        };
        if let Err(e) = bot
            .edit_message_caption(message.chat().id, message.id())
            .caption(format!("Платеж по заявке {service_id}: {verdict}"))
            .await
        {
            log::error!("failed to edit payment review message: {}", e);
        }
    }

    let customer_chat = ChatId(service.user_tg_id().await?);
    if approved {
        bot.send_message(customer_chat, texts::PAYMENT_CONFIRMED_TEXT).await?;
        executor::check_readiness_and_handoff(bot, ctx, service_id).await?;
    } else {
        bot.send_message(customer_chat, texts::PAYMENT_CANCELED_TEXT).await?;
    }

    bot.answer_callback_query(q.id.clone()).await?;
    Ok(())
}
