//! Meeting reminders. A reminder fires at 21:00 local time on the evening
//! before the meeting and goes to both the customer and the executor. The
//! `meeting` table is the job store: pending reminders are re-armed from it
//! at startup, so a restart loses nothing.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};
use sqlx::Row;
use teloxide::prelude::*;

use crate::catalog::product;
use crate::context::AppContext;
use crate::errors::DomainResult;
use crate::texts;

/// When to remind about a meeting: the evening before, 21:00 local.
pub fn reminder_instant(meeting_time: DateTime<Utc>, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let local = meeting_time.with_timezone(&offset);
    let evening_before = local.date_naive().pred_opt()?.and_hms_opt(21, 0, 0)?;
    Some(evening_before.and_local_timezone(offset).single()?.with_timezone(&Utc))
}

/// Arms a reminder for a fully scheduled meeting. If the reminder moment has
/// already passed but the meeting has not, the reminder is sent right away.
pub fn schedule_meeting_reminder(bot: Bot, ctx: Arc<AppContext>, service_id: i64) {
    tokio::spawn(async move {
        let meeting_time = match ctx.cache.service(service_id).await {
            Ok(service) => service.meeting_time().await,
            Err(e) => Err(e),
        };
        let meeting_time = match meeting_time {
            Ok(Some(t)) => t,
            Ok(None) => {
                log::warn!("reminder for service {} skipped: no meeting time", service_id);
                return;
            }
            Err(e) => {
                log::error!("reminder for service {} failed to load: {}", service_id, e);
                return;
            }
        };

        let Some(fire_at) = reminder_instant(meeting_time, ctx.config.client_utc_offset) else {
            log::warn!("reminder for service {} skipped: time out of range", service_id);
            return;
        };
        let wait = (fire_at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        log::info!(
            "reminder for service {} armed, fires in {}s",
            service_id,
            wait.as_secs()
        );
        tokio::time::sleep(wait).await;

        if let Err(e) = send_meeting_reminder(&bot, &ctx, service_id).await {
            log::error!("reminder for service {} failed: {}", service_id, e);
        }
    });
}

/// Re-arms reminders for every future meeting that already has an executor.
pub async fn recover_pending(bot: &Bot, ctx: &Arc<AppContext>) -> DomainResult<()> {
    let rows = sqlx::query(
        r#"
        SELECT m.service_id
        FROM meeting m
        JOIN service s ON s.service_id = m.service_id
        WHERE m.meeting_time IS NOT NULL
          AND m.meeting_time > NOW()
          AND s.service_executor IS NOT NULL
        "#,
    )
    .fetch_all(ctx.cache.pool())
    .await?;

    log::info!("recovered {} pending meeting reminders", rows.len());
    for row in rows {
        let service_id: i64 = row.get("service_id");
        schedule_meeting_reminder(bot.clone(), Arc::clone(ctx), service_id);
    }
    Ok(())
}

async fn send_meeting_reminder(
    bot: &Bot,
    ctx: &Arc<AppContext>,
    service_id: i64,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let service = ctx.cache.service(service_id).await?;
    let Some(meeting_time) = service.meeting_time().await? else {
        return Ok(());
    };
    let Some(address) = service.meeting_place().await? else {
        return Ok(());
    };

    let product = product(service.kind());
    let place = product.place_by_address(&address);
    let customer_name = service.customer_name().await?;
    let operator_name = service
        .executor_name()
        .await?
        .unwrap_or_else(|| "—".to_string());
    let text = texts::meeting_text(
        product.name,
        &customer_name,
        &operator_name,
        place.map(|p| p.name).unwrap_or(&address),
        &texts::format_local_time(meeting_time, ctx.config.client_utc_offset),
        place.map(|p| p.map_link),
    );

    let user_tg_id = service.user_tg_id().await?;
    bot.send_message(ChatId(user_tg_id), &text).await?;

    if let Some(operator_id) = service.executor_id().await? {
        let operator = ctx.cache.operator(operator_id).await;
        let operator_tg_id = operator.tg_id().await?;
        bot.send_message(ChatId(operator_tg_id), &text).await?;
    }
    log::info!("reminder for service {} delivered", service_id);
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
    fn reminder_fires_the_evening_before_in_local_time() {
        // Meeting 10.03.2026 07:40 local (UTC+8) = 09.03 23:40 UTC.
        let meeting = Utc.with_ymd_and_hms(2026, 3, 9, 23, 40, 0).unwrap();
        let fire_at = reminder_instant(meeting, bali()).unwrap();
        // 09.03.2026 21:00 local = 13:00 UTC.
        assert_eq!(fire_at, Utc.with_ymd_and_hms(2026, 3, 9, 13, 0, 0).unwrap());
    }

    #[test]
    fn reminder_respects_the_offset_not_utc_midnight() {
        // Meeting 01.06.2026 09:00 local (UTC+8) = 01:00 UTC same day.
        let meeting = Utc.with_ymd_and_hms(2026, 6, 1, 1, 0, 0).unwrap();
        let fire_at = reminder_instant(meeting, bali()).unwrap();
        assert_eq!(fire_at, Utc.with_ymd_and_hms(2026, 5, 31, 13, 0, 0).unwrap());
    }
}
