//! Handoff to fulfilment operators and the meeting flows they drive.
//!
//! Once every required artifact of a service is in place, the request is
//! announced once to all operators of the product's section; the first
//! operator to press "Взять клиента" becomes its executor. Bank-card
//! executors then pick the meeting place and date (time is fixed by the
//! bank's schedule); driver-license executors only pick the date, merging
//! in the hour the customer chose earlier.

use std::error::Error;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use teloxide::prelude::*;

use crate::catalog::{product, ProductKey};
use crate::context::AppContext;
use crate::entities::{is_service_ready, Operator};
use crate::errors::DomainResult;
use crate::scheduler;
use crate::texts;

use super::utils;

/// Bank meetings always start at 07:40 local.
const BANK_CARD_MEETING_HOUR: u32 = 7;
const BANK_CARD_MEETING_MINUTE: u32 = 40;

/// How many dates an executor may choose from, starting tomorrow.
const MEETING_WINDOW_DAYS: u64 = 3;

/// A customer-chosen hour is stored on this date until the executor picks
/// the real one.
const PLACEHOLDER_YEAR: i32 = 2020;

// ----------------------------------------------------------- time plumbing

fn combine_local(
    date: NaiveDate,
    hour: u32,
    minute: u32,
    offset: FixedOffset,
) -> Option<DateTime<Utc>> {
    let naive = date.and_hms_opt(hour, minute, 0)?;
    Some(naive.and_local_timezone(offset).single()?.with_timezone(&Utc))
}

/// Stores a bare hour choice as a placeholder instant.
pub fn placeholder_hour(hour: u32, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let date = NaiveDate::from_ymd_opt(PLACEHOLDER_YEAR, 1, 1)?;
    combine_local(date, hour, 0, offset)
}

/// Replaces the placeholder date with the executor's pick, keeping the
/// customer's hour and minute.
fn merge_date_with_stored_hour(
    date: NaiveDate,
    stored: DateTime<Utc>,
    offset: FixedOffset,
) -> Option<DateTime<Utc>> {
    use chrono::Timelike;
    let local = stored.with_timezone(&offset);
    combine_local(date, local.hour(), local.minute(), offset)
}

fn today_local(offset: FixedOffset) -> NaiveDate {
    Utc::now().with_timezone(&offset).date_naive()
}

// ----------------------------------------------------------------- handoff

/// Re-evaluates readiness after an artifact-completing event and, the first
/// time the service becomes ready, announces it to the section's operators.
pub async fn check_readiness_and_handoff(
    bot: &Bot,
    ctx: &Arc<AppContext>,
    service_id: i64,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let service = ctx.cache.service(service_id).await?;
    let snapshot = service.readiness_snapshot().await?;
    if !is_service_ready(service.kind(), &snapshot) {
        log::debug!("service {} not ready yet: {:?}", service_id, snapshot);
        return Ok(());
    }
    // The latch is a DB compare-and-set: two artifact-completing events can
    // pass the readiness check concurrently, only one wins the flag flip.
    if !service.try_mark_sent_to_executor().await? {
        return Ok(());
    }
    log::info!("service {} is ready, announcing to operators", service_id);

    bot.send_message(
        ChatId(service.user_tg_id().await?),
        texts::DOCUMENTS_ARE_READY_TEXT,
    )
    .await?;

    let product = product(service.kind());
    let customer_name = service.customer_name().await?;
    let announcement = format!(
        "Новый клиент\nУслуга: {}\nКлиент: {}\nЗаявка от: {}",
        product.name,
        customer_name,
        service.request_date().await?.format("%d.%m.%Y")
    );
    let operator_ids = Operator::ids_in_section(ctx.cache.pool(), product.section).await?;
    if operator_ids.is_empty() {
        log::error!("no operators in section {} for service {}", product.section.as_str(), service_id);
        return Ok(());
    }
    for operator_id in operator_ids {
        let operator = ctx.cache.operator(operator_id).await;
        let chat = ChatId(operator.tg_id().await?);
        if let Err(e) = bot
            .send_message(chat, &announcement)
            .reply_markup(utils::take_refuse_keyboard(service_id))
            .await
        {
            log::error!(
                "failed to announce service {} to operator {}: {}",
                service_id,
                operator_id,
                e
            );
        }
    }
    Ok(())
}

async fn operator_in_service_section(
    ctx: &Arc<AppContext>,
    service_id: i64,
    tg_id: i64,
) -> DomainResult<Option<i64>> {
    let service = ctx.cache.service(service_id).await?;
    let section = product(service.kind()).section;
    Operator::find_for(ctx.cache.pool(), tg_id, section).await
}

/// Is the caller the assigned executor of the service?
async fn is_executor(ctx: &Arc<AppContext>, service_id: i64, tg_id: i64) -> DomainResult<bool> {
    let service = ctx.cache.service(service_id).await?;
    let Some(operator_id) = service.executor_id().await? else {
        return Ok(false);
    };
    let operator = ctx.cache.operator(operator_id).await;
    Ok(operator.tg_id().await? == tg_id)
}

pub async fn handle_take(
    bot: &Bot,
    ctx: &Arc<AppContext>,
    q: &CallbackQuery,
    service_id: i64,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let tg_id = q.from.id.0 as i64;
    let Some(operator_id) = operator_in_service_section(ctx, service_id, tg_id).await? else {
        log::warn!("take of service {} by non-section user {}", service_id, tg_id);
        bot.answer_callback_query(q.id.clone())
            .text(texts::FALLBACK_TEXT)
            .await?;
        return Ok(());
    };

    let service = ctx.cache.service(service_id).await?;
    if !service.try_assign_executor(operator_id).await? {
        bot.answer_callback_query(q.id.clone())
            .text(texts::SERVICE_ALREADY_TAKEN_TEXT)
            .await?;
        if let Some(message) = &q.message {
            let _ = bot
                .edit_message_reply_markup(message.chat().id, message.id())
                .await;
        }
        return Ok(());
    }
    log::info!("service {} taken by operator {}", service_id, operator_id);
    bot.answer_callback_query(q.id.clone()).await?;

    let operator_chat = match &q.message {
        Some(message) => {
            let _ = bot
                .edit_message_reply_markup(message.chat().id, message.id())
                .await;
            message.chat().id
        }
        None => ChatId(tg_id),
    };

    send_documents_to_executor(bot, ctx, service_id, operator_chat).await?;

    // Next step depends on the product: bank-card executors pick the place
    // first, license executors go straight to the date.
    match service.kind() {
        ProductKey::BankCard => {
            bot.send_message(operator_chat, texts::CHOSE_MEETING_PLACE_TEXT.trim_start())
                .reply_markup(utils::places_keyboard(product(service.kind()), service_id, true))
                .await?;
        }
        ProductKey::DriverLicense => {
            let dates = utils::upcoming_days(today_local(ctx.config.client_utc_offset), MEETING_WINDOW_DAYS);
            bot.send_message(operator_chat, texts::CHOSE_MEETING_DATE_TEXT.trim_start())
                .reply_markup(utils::dates_keyboard(service_id, &dates))
                .await?;
        }
    }
    Ok(())
}

pub async fn handle_refuse(
    bot: &Bot,
    ctx: &Arc<AppContext>,
    q: &CallbackQuery,
    service_id: i64,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let tg_id = q.from.id.0 as i64;
    if operator_in_service_section(ctx, service_id, tg_id).await?.is_none() {
        bot.answer_callback_query(q.id.clone())
            .text(texts::FALLBACK_TEXT)
            .await?;
        return Ok(());
    }
    // Only this operator's copy of the announcement loses its buttons; the
    // request stays open for the others.
    if let Some(message) = &q.message {
        let _ = bot
            .edit_message_reply_markup(message.chat().id, message.id())
            .await;
    }
    bot.answer_callback_query(q.id.clone()).await?;
    log::info!("service {} refused by operator tg {}", service_id, tg_id);
    Ok(())
}

/// Everything the customer collected, delivered to the executor's chat.
async fn send_documents_to_executor(
    bot: &Bot,
    ctx: &Arc<AppContext>,
    service_id: i64,
    operator_chat: ChatId,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let service = ctx.cache.service(service_id).await?;
    let product = product(service.kind());
    let customer_name = service.customer_name().await?;

    let entries = service.form_entries().await?;
    let title = format!("{} | {}", product.name, customer_name);
    bot.send_message(operator_chat, texts::form_summary_text(&title, &entries))
        .await?;

    if let Some(passport) = service.passport().await? {
        utils::send_file(bot, operator_chat, &passport, "Паспорт").await?;
    }
    if service.kind() == ProductKey::DriverLicense {
        if let Some(visa) = service.e_visa().await? {
            utils::send_file(bot, operator_chat, &visa, "Электронная виза").await?;
        }
        if let Some(address) = service.meeting_place().await? {
            let place = product.place_by_address(&address);
            bot.send_message(
                operator_chat,
                format!("Место встречи: {}", place.map(|p| p.name).unwrap_or(&address)),
            )
            .await?;
        }
    }
    Ok(())
}

// ------------------------------------------------------- executor meetings

pub async fn handle_operator_place(
    bot: &Bot,
    ctx: &Arc<AppContext>,
    q: &CallbackQuery,
    service_id: i64,
    index: usize,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let tg_id = q.from.id.0 as i64;
    if !is_executor(ctx, service_id, tg_id).await? {
        bot.answer_callback_query(q.id.clone())
            .text(texts::FALLBACK_TEXT)
            .await?;
        return Ok(());
    }

    let service = ctx.cache.service(service_id).await?;
    let product = product(service.kind());
    let Some(place) = product.place(index) else {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };
    service.set_meeting_place(place.address).await?;
    bot.answer_callback_query(q.id.clone()).await?;

    if let Some(message) = &q.message {
        bot.edit_message_text(
            message.chat().id,
            message.id(),
            format!("Место: {}{}", place.name, texts::CHOSE_MEETING_DATE_TEXT),
        )
        .reply_markup(utils::dates_keyboard(
            service_id,
            &utils::upcoming_days(today_local(ctx.config.client_utc_offset), MEETING_WINDOW_DAYS),
        ))
        .await?;
    }
    Ok(())
}

pub async fn handle_operator_date(
    bot: &Bot,
    ctx: &Arc<AppContext>,
    q: &CallbackQuery,
    service_id: i64,
    date: NaiveDate,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let tg_id = q.from.id.0 as i64;
    if !is_executor(ctx, service_id, tg_id).await? {
        bot.answer_callback_query(q.id.clone())
            .text(texts::FALLBACK_TEXT)
            .await?;
        return Ok(());
    }

    let service = ctx.cache.service(service_id).await?;
    let offset = ctx.config.client_utc_offset;
    let meeting_time = match service.kind() {
        ProductKey::BankCard => {
            combine_local(date, BANK_CARD_MEETING_HOUR, BANK_CARD_MEETING_MINUTE, offset)
        }
        ProductKey::DriverLicense => match service.meeting_time().await? {
            Some(stored) => merge_date_with_stored_hour(date, stored, offset),
            None => None,
        },
    };
    let Some(meeting_time) = meeting_time else {
        log::error!("service {} has no hour to merge with date {}", service_id, date);
        bot.answer_callback_query(q.id.clone())
            .text(texts::SOMETHING_WENT_WRONG_TEXT)
            .await?;
        return Ok(());
    };
    service.set_meeting_time(meeting_time).await?;
    bot.answer_callback_query(q.id.clone()).await?;

    if let Some(message) = &q.message {
        let _ = bot
            .edit_message_text(
                message.chat().id,
                message.id(),
                format!(
                    "Встреча назначена: {}",
                    texts::format_local_time(meeting_time, offset)
                ),
            )
            .await;
    }

    finalize_meeting(bot, ctx, service_id, meeting_time).await?;
    Ok(())
}

/// Sends the final meeting card to the customer and arms the reminder.
async fn finalize_meeting(
    bot: &Bot,
    ctx: &Arc<AppContext>,
    service_id: i64,
    meeting_time: DateTime<Utc>,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let service = ctx.cache.service(service_id).await?;
    let product = product(service.kind());
    let address = service.meeting_place().await?.unwrap_or_default();
    let place = product.place_by_address(&address);
    let operator_name = service
        .executor_name()
        .await?
        .unwrap_or_else(|| "—".to_string());

    let text = texts::meeting_text(
        product.name,
        &service.customer_name().await?,
        &operator_name,
        place.map(|p| p.name).unwrap_or(&address),
        &texts::format_local_time(meeting_time, ctx.config.client_utc_offset),
        place.map(|p| p.map_link),
    );
    bot.send_message(ChatId(service.user_tg_id().await?), text).await?;

    scheduler::schedule_meeting_reminder(bot.clone(), Arc::clone(ctx), service_id);
    log::info!("meeting of service {} scheduled", service_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bali() -> FixedOffset {
        FixedOffset::east_opt(8 * 3600).unwrap()
    }

    #[test]
    fn bank_card_meeting_is_at_0740_local() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let t = combine_local(date, BANK_CARD_MEETING_HOUR, BANK_CARD_MEETING_MINUTE, bali()).unwrap();
        // 07:40 UTC+8 is 23:40 UTC the day before.
        assert_eq!(t, Utc.with_ymd_and_hms(2026, 3, 9, 23, 40, 0).unwrap());
    }

    #[test]
    fn stored_hour_survives_the_date_pick() {
        let stored = placeholder_hour(12, bali()).unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 3, 11).unwrap();
        let merged = merge_date_with_stored_hour(date, stored, bali()).unwrap();
        assert_eq!(merged, Utc.with_ymd_and_hms(2026, 3, 11, 4, 0, 0).unwrap());
    }

    #[test]
    fn placeholder_keeps_the_local_hour() {
        use chrono::Timelike;
        let stored = placeholder_hour(9, bali()).unwrap();
        assert_eq!(stored.with_timezone(&bali()).hour(), 9);
    }
}
