//! Keyboard builders, input validation and small telegram helpers shared by
//! the handler modules.

use chrono::{Days, NaiveDate};
use teloxide::prelude::*;
use teloxide::types::{
    FileId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, KeyboardButton, KeyboardMarkup,
    Message,
};

use crate::catalog::forms::{FieldType, FieldValue};
use crate::catalog::{Product, Section, PRODUCTS};

use super::callback_data::CallbackAction;

pub const YES_LABEL: &str = "Да";
pub const NO_LABEL: &str = "Нет";
pub const IGNORE_LABEL: &str = "ИГНОР";
pub const BEGIN_LABEL: &str = "Начать оформление";
pub const TAKE_LABEL: &str = "Взять клиента";
pub const REFUSE_LABEL: &str = "Отказаться";
pub const PAYMENT_OK_LABEL: &str = "Подтвердить платеж";
pub const PAYMENT_REJECT_LABEL: &str = "Платеж не верный";

// --------------------------------------------------------------- keyboards

/// Persistent bottom keyboard with one button per product.
pub fn products_keyboard() -> KeyboardMarkup {
    let rows = PRODUCTS
        .iter()
        .map(|p| vec![KeyboardButton::new(p.name)])
        .collect::<Vec<_>>();
    KeyboardMarkup::new(rows).resize_keyboard()
}

/// Resume buttons with the customer names of uncompleted requests.
pub fn customer_names_keyboard(names: &[String]) -> KeyboardMarkup {
    let rows = names
        .iter()
        .map(|name| vec![KeyboardButton::new(name.clone())])
        .collect::<Vec<_>>();
    KeyboardMarkup::new(rows).resize_keyboard()
}

pub fn yes_no_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new([[KeyboardButton::new(YES_LABEL), KeyboardButton::new(NO_LABEL)]])
        .resize_keyboard()
}

pub fn begin_keyboard(product: &Product) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([[InlineKeyboardButton::callback(
        BEGIN_LABEL,
        CallbackAction::Begin(product.key).encode(),
    )]])
}

/// Document-collection menu of a product, one action per row.
pub fn doc_actions_keyboard(product: &Product, service_id: i64) -> InlineKeyboardMarkup {
    let rows = product
        .actions
        .iter()
        .map(|(action, label)| {
            vec![InlineKeyboardButton::callback(
                *label,
                CallbackAction::Doc {
                    kind: product.key,
                    action: *action,
                    service_id,
                }
                .encode(),
            )]
        })
        .collect::<Vec<_>>();
    InlineKeyboardMarkup::new(rows)
}

pub fn payment_decision_keyboard(service_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([[
        InlineKeyboardButton::callback(
            PAYMENT_OK_LABEL,
            CallbackAction::PaymentOk { service_id }.encode(),
        ),
        InlineKeyboardButton::callback(
            PAYMENT_REJECT_LABEL,
            CallbackAction::PaymentReject { service_id }.encode(),
        ),
    ]])
}

pub fn take_refuse_keyboard(service_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([[
        InlineKeyboardButton::callback(TAKE_LABEL, CallbackAction::Take { service_id }.encode()),
        InlineKeyboardButton::callback(REFUSE_LABEL, CallbackAction::Refuse { service_id }.encode()),
    ]])
}

/// Section picker shown to admins for an operator candidate, plus a dismiss
/// button.
pub fn section_choice_keyboard(tg_id: i64) -> InlineKeyboardMarkup {
    let mut rows = Section::ALL
        .iter()
        .map(|section| {
            vec![InlineKeyboardButton::callback(
                section.as_str(),
                CallbackAction::MakeOperator {
                    tg_id,
                    section: Some(*section),
                }
                .encode(),
            )]
        })
        .collect::<Vec<_>>();
    rows.push(vec![InlineKeyboardButton::callback(
        IGNORE_LABEL,
        CallbackAction::MakeOperator { tg_id, section: None }.encode(),
    )]);
    InlineKeyboardMarkup::new(rows)
}

/// One delete button per operator, labelled "name | section".
pub fn operators_keyboard(operators: &[(i64, String)]) -> InlineKeyboardMarkup {
    let rows = operators
        .iter()
        .map(|(operator_id, label)| {
            vec![InlineKeyboardButton::callback(
                label.clone(),
                CallbackAction::DeleteOperator {
                    operator_id: *operator_id,
                }
                .encode(),
            )]
        })
        .collect::<Vec<_>>();
    InlineKeyboardMarkup::new(rows)
}

/// Meeting place picker. The same places feed two flows with different
/// payloads: customers of the license flow and executors of the card flow.
pub fn places_keyboard(product: &Product, service_id: i64, for_operator: bool) -> InlineKeyboardMarkup {
    let rows = product
        .places
        .iter()
        .enumerate()
        .map(|(index, place)| {
            let data = if for_operator {
                CallbackAction::OperatorPlace { service_id, index }
            } else {
                CallbackAction::CustomerPlace { service_id, index }
            };
            vec![InlineKeyboardButton::callback(place.name, data.encode())]
        })
        .collect::<Vec<_>>();
    InlineKeyboardMarkup::new(rows)
}

pub fn hours_keyboard(service_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([[
        InlineKeyboardButton::callback("09:00", CallbackAction::CustomerHour { service_id, hour: 9 }.encode()),
        InlineKeyboardButton::callback("12:00", CallbackAction::CustomerHour { service_id, hour: 12 }.encode()),
    ]])
}

pub fn dates_keyboard(service_id: i64, dates: &[NaiveDate]) -> InlineKeyboardMarkup {
    let rows = dates
        .iter()
        .map(|date| {
            vec![InlineKeyboardButton::callback(
                date.format("%d.%m.%Y").to_string(),
                CallbackAction::OperatorDate {
                    service_id,
                    date: *date,
                }
                .encode(),
            )]
        })
        .collect::<Vec<_>>();
    InlineKeyboardMarkup::new(rows)
}

/// The dates offered for a meeting: `count` days starting tomorrow.
pub fn upcoming_days(today: NaiveDate, count: u64) -> Vec<NaiveDate> {
    (1..=count)
        .filter_map(|n| today.checked_add_days(Days::new(n)))
        .collect()
}

// -------------------------------------------------------------- validation

/// Turns a customer's text answer into a typed form value, or `None` when
/// the answer does not fit the field.
pub fn validate_answer(field_type: FieldType, answer: &str) -> Option<FieldValue> {
    let answer = answer.trim();
    if answer.is_empty() {
        return None;
    }
    match field_type {
        FieldType::Text | FieldType::EnText | FieldType::Phone => {
            Some(FieldValue::Text(answer.to_string()))
        }
        FieldType::Email => {
            if answer.contains('@') {
                Some(FieldValue::Text(answer.to_string()))
            } else {
                None
            }
        }
        FieldType::Count => {
            let n: i32 = answer.parse().ok()?;
            if n > 0 {
                Some(FieldValue::Count(n))
            } else {
                None
            }
        }
        FieldType::YesNo => match answer.to_lowercase().as_str() {
            "да" => Some(FieldValue::YesNo(true)),
            "нет" => Some(FieldValue::YesNo(false)),
            _ => None,
        },
    }
}

// ---------------------------------------------------------------- telegram

/// The file id of a photo (largest size) or an attached document.
pub fn file_id_from_message(msg: &Message) -> Option<FileId> {
    if let Some(sizes) = msg.photo() {
        return sizes.last().map(|size| size.file.id.clone());
    }
    msg.document().map(|doc| doc.file.id.clone())
}

/// Re-sends a stored file id. Tries a photo first; a file id that came from
/// a document upload is re-sent as a document.
pub async fn send_file(
    bot: &Bot,
    chat_id: ChatId,
    file_id: &str,
    caption: &str,
) -> Result<(), teloxide::RequestError> {
    let as_photo = bot
        .send_photo(chat_id, InputFile::file_id(FileId(file_id.to_string())))
        .caption(caption)
        .await;
    if as_photo.is_ok() {
        return Ok(());
    }
    bot.send_document(chat_id, InputFile::file_id(FileId(file_id.to_string())))
        .caption(caption)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meeting_window_starts_tomorrow() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        let days = upcoming_days(today, 3);
        assert_eq!(
            days,
            vec![
                NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
                NaiveDate::from_ymd_opt(2026, 3, 11).unwrap(),
                NaiveDate::from_ymd_opt(2026, 3, 12).unwrap(),
            ]
        );
    }

    #[test]
    fn meeting_window_crosses_month_boundary() {
        let today = NaiveDate::from_ymd_opt(2026, 2, 27).unwrap();
        let days = upcoming_days(today, 3);
        assert_eq!(days[0], NaiveDate::from_ymd_opt(2026, 2, 28).unwrap());
        assert_eq!(days[1], NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
    }

    #[test]
    fn yes_no_accepts_only_the_buttons() {
        assert_eq!(validate_answer(FieldType::YesNo, "Да"), Some(FieldValue::YesNo(true)));
        assert_eq!(validate_answer(FieldType::YesNo, "нет"), Some(FieldValue::YesNo(false)));
        assert_eq!(validate_answer(FieldType::YesNo, "может быть"), None);
    }

    #[test]
    fn count_requires_a_positive_integer() {
        assert_eq!(validate_answer(FieldType::Count, "178"), Some(FieldValue::Count(178)));
        assert_eq!(validate_answer(FieldType::Count, "сто"), None);
        assert_eq!(validate_answer(FieldType::Count, "-5"), None);
        assert_eq!(validate_answer(FieldType::Count, "0"), None);
    }

    #[test]
    fn email_needs_an_at_sign() {
        assert!(validate_answer(FieldType::Email, "user@mail.com").is_some());
        assert!(validate_answer(FieldType::Email, "user.mail.com").is_none());
    }

    #[test]
    fn text_answers_are_trimmed_and_non_empty() {
        assert_eq!(
            validate_answer(FieldType::EnText, "  John Doe  "),
            Some(FieldValue::Text("John Doe".to_string()))
        );
        assert_eq!(validate_answer(FieldType::Text, "   "), None);
    }
}
