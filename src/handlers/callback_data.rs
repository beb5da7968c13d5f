//! Inline-button payloads. Encoded as short colon-separated strings to stay
//! well under Telegram's 64-byte callback-data limit.

use chrono::NaiveDate;

use crate::catalog::{DocAction, ProductKey, Section};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    /// Customer pressed "Начать оформление" under the product terms.
    Begin(ProductKey),
    /// Customer picked a document-collection action.
    Doc {
        kind: ProductKey,
        action: DocAction,
        service_id: i64,
    },
    /// Admin grants a section to an operator candidate; `None` dismisses.
    MakeOperator {
        tg_id: i64,
        section: Option<Section>,
    },
    /// Admin revokes an operator.
    DeleteOperator { operator_id: i64 },
    PaymentOk { service_id: i64 },
    PaymentReject { service_id: i64 },
    /// Executor takes the customer.
    Take { service_id: i64 },
    Refuse { service_id: i64 },
    /// Driver-license customer picks a meeting place.
    CustomerPlace { service_id: i64, index: usize },
    /// Driver-license customer picks the meeting hour.
    CustomerHour { service_id: i64, hour: u32 },
    /// Bank-card executor picks the meeting place.
    OperatorPlace { service_id: i64, index: usize },
    /// Executor picks the meeting date.
    OperatorDate { service_id: i64, date: NaiveDate },
}

const IGNORE: &str = "ignore";

impl CallbackAction {
    pub fn encode(self) -> String {
        match self {
            CallbackAction::Begin(kind) => format!("begin:{}", kind.as_str()),
            CallbackAction::Doc { kind, action, service_id } => {
                format!("doc:{}:{}:{}", kind.as_str(), action.as_str(), service_id)
            }
            CallbackAction::MakeOperator { tg_id, section } => {
                let section = section.map(Section::as_str).unwrap_or(IGNORE);
                format!("mkop:{}:{}", tg_id, section)
            }
            CallbackAction::DeleteOperator { operator_id } => format!("delop:{}", operator_id),
            CallbackAction::PaymentOk { service_id } => format!("pay:ok:{}", service_id),
            CallbackAction::PaymentReject { service_id } => format!("pay:no:{}", service_id),
            CallbackAction::Take { service_id } => format!("take:{}", service_id),
            CallbackAction::Refuse { service_id } => format!("refuse:{}", service_id),
            CallbackAction::CustomerPlace { service_id, index } => {
                format!("place:{}:{}", service_id, index)
            }
            CallbackAction::CustomerHour { service_id, hour } => {
                format!("hour:{}:{}", service_id, hour)
            }
            CallbackAction::OperatorPlace { service_id, index } => {
                format!("opplace:{}:{}", service_id, index)
            }
            CallbackAction::OperatorDate { service_id, date } => {
                format!("opdate:{}:{}", service_id, date.format("%Y-%m-%d"))
            }
        }
    }

    pub fn parse(data: &str) -> Option<CallbackAction> {
        let mut parts = data.split(':');
        let tag = parts.next()?;
        let action = match tag {
            "begin" => CallbackAction::Begin(ProductKey::parse(parts.next()?)?),
            "doc" => CallbackAction::Doc {
                kind: ProductKey::parse(parts.next()?)?,
                action: DocAction::parse(parts.next()?)?,
                service_id: parts.next()?.parse().ok()?,
            },
            "mkop" => {
                let tg_id = parts.next()?.parse().ok()?;
                let raw = parts.next()?;
                let section = if raw == IGNORE {
                    None
                } else {
                    Some(Section::parse(raw)?)
                };
                CallbackAction::MakeOperator { tg_id, section }
            }
            "delop" => CallbackAction::DeleteOperator {
                operator_id: parts.next()?.parse().ok()?,
            },
            "pay" => {
                let verdict = parts.next()?;
                let service_id = parts.next()?.parse().ok()?;
                match verdict {
                    "ok" => CallbackAction::PaymentOk { service_id },
                    "no" => CallbackAction::PaymentReject { service_id },
                    _ => return None,
                }
            }
            "take" => CallbackAction::Take {
                service_id: parts.next()?.parse().ok()?,
            },
            "refuse" => CallbackAction::Refuse {
                service_id: parts.next()?.parse().ok()?,
            },
            "place" => CallbackAction::CustomerPlace {
                service_id: parts.next()?.parse().ok()?,
                index: parts.next()?.parse().ok()?,
            },
            "hour" => CallbackAction::CustomerHour {
                service_id: parts.next()?.parse().ok()?,
                hour: parts.next()?.parse().ok()?,
            },
            "opplace" => CallbackAction::OperatorPlace {
                service_id: parts.next()?.parse().ok()?,
                index: parts.next()?.parse().ok()?,
            },
            "opdate" => CallbackAction::OperatorDate {
                service_id: parts.next()?.parse().ok()?,
                date: NaiveDate::parse_from_str(parts.next()?, "%Y-%m-%d").ok()?,
            },
            _ => return None,
        };
        if parts.next().is_some() {
            return None;
        }
        Some(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_action_survives_encode_parse() {
        let actions = [
            CallbackAction::Begin(ProductKey::DriverLicense),
            CallbackAction::Doc {
                kind: ProductKey::BankCard,
                action: DocAction::SendPassport,
                service_id: 42,
            },
            CallbackAction::MakeOperator {
                tg_id: 123456789,
                section: Some(Section::PaymentControl),
            },
            CallbackAction::MakeOperator { tg_id: 5, section: None },
            CallbackAction::DeleteOperator { operator_id: 7 },
            CallbackAction::PaymentOk { service_id: 1 },
            CallbackAction::PaymentReject { service_id: 2 },
            CallbackAction::Take { service_id: 3 },
            CallbackAction::Refuse { service_id: 4 },
            CallbackAction::CustomerPlace { service_id: 8, index: 1 },
            CallbackAction::CustomerHour { service_id: 9, hour: 12 },
            CallbackAction::OperatorPlace { service_id: 10, index: 0 },
            CallbackAction::OperatorDate {
                service_id: 11,
                date: NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
            },
        ];
        for action in actions {
            let encoded = action.encode();
            assert!(encoded.len() <= 64, "{} too long", encoded);
            assert_eq!(CallbackAction::parse(&encoded), Some(action), "{}", encoded);
        }
    }

    #[test]
    fn garbage_does_not_parse() {
        for data in ["", "take", "take:abc", "pay:maybe:1", "doc:bank_card:form", "x:1", "take:1:2"] {
            assert_eq!(CallbackAction::parse(data), None, "{}", data);
        }
    }

    #[test]
    fn dismiss_button_encodes_as_ignore() {
        let action = CallbackAction::MakeOperator { tg_id: 77, section: None };
        assert_eq!(action.encode(), "mkop:77:ignore");
    }
}
