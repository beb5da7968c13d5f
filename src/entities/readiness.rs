//! Readiness policy: decides when a service may be handed to a fulfilment
//! operator. Pure and side-effect-free; the orchestrator re-runs it after
//! every artifact-completing event.

use crate::catalog::ProductKey;

/// Completion flags of a service, loaded in one query.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadinessSnapshot {
    pub is_paid: bool,
    pub is_form_complete: bool,
    pub is_passport_complete: bool,
    /// Driver license only; stays false for bank card.
    pub is_visa_complete: bool,
    pub has_meeting_place: bool,
    pub has_meeting_time: bool,
}

/// Bank card: payment, form and passport.
/// Driver license: additionally the e-visa and a fully chosen meeting —
/// the meeting row alone is not enough, both place and time must be set.
pub fn is_service_ready(kind: ProductKey, snapshot: &ReadinessSnapshot) -> bool {
    let base = snapshot.is_paid && snapshot.is_form_complete && snapshot.is_passport_complete;
    match kind {
        ProductKey::BankCard => base,
        ProductKey::DriverLicense => {
            base && snapshot.is_visa_complete && snapshot.has_meeting_place && snapshot.has_meeting_time
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_set() -> ReadinessSnapshot {
        ReadinessSnapshot {
            is_paid: true,
            is_form_complete: true,
            is_passport_complete: true,
            is_visa_complete: true,
            has_meeting_place: true,
            has_meeting_time: true,
        }
    }

    #[test]
    fn fresh_service_is_not_ready() {
        let snapshot = ReadinessSnapshot::default();
        assert!(!is_service_ready(ProductKey::BankCard, &snapshot));
        assert!(!is_service_ready(ProductKey::DriverLicense, &snapshot));
    }

    #[test]
    fn bank_card_needs_payment_form_and_passport() {
        let mut snapshot = ReadinessSnapshot {
            is_paid: true,
            is_form_complete: true,
            is_passport_complete: true,
            ..Default::default()
        };
        assert!(is_service_ready(ProductKey::BankCard, &snapshot));

        snapshot.is_form_complete = false;
        assert!(!is_service_ready(ProductKey::BankCard, &snapshot));
    }

    #[test]
    fn bank_card_ignores_visa_and_meeting() {
        let snapshot = ReadinessSnapshot {
            is_paid: true,
            is_form_complete: true,
            is_passport_complete: true,
            is_visa_complete: false,
            has_meeting_place: false,
            has_meeting_time: false,
        };
        assert!(is_service_ready(ProductKey::BankCard, &snapshot));
    }

    #[test]
    fn driver_license_requires_both_meeting_fields() {
        let mut snapshot = all_set();
        snapshot.has_meeting_place = false;
        assert!(!is_service_ready(ProductKey::DriverLicense, &snapshot));

        snapshot.has_meeting_place = true;
        snapshot.has_meeting_time = false;
        assert!(!is_service_ready(ProductKey::DriverLicense, &snapshot));

        snapshot.has_meeting_time = true;
        assert!(is_service_ready(ProductKey::DriverLicense, &snapshot));
    }

    #[test]
    fn readiness_is_per_field_not_latched() {
        let mut snapshot = all_set();
        assert!(is_service_ready(ProductKey::DriverLicense, &snapshot));

        // Flipping any artifact back to incomplete makes the service
        // not ready again.
        snapshot.is_paid = false;
        assert!(!is_service_ready(ProductKey::DriverLicense, &snapshot));
        snapshot.is_paid = true;
        snapshot.is_visa_complete = false;
        assert!(!is_service_ready(ProductKey::DriverLicense, &snapshot));
    }
}
