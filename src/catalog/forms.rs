//! Intake form schemas. Field order here is the order the bot walks the
//! customer through; the last field of a slice completes the form.

/// What kind of answer a form field expects. The description is shown to the
/// customer under the field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    EnText,
    Count,
    Phone,
    Email,
    YesNo,
}

impl FieldType {
    pub fn description(self) -> &'static str {
        match self {
            FieldType::Text => "текст",
            FieldType::EnText => "текст на английском",
            FieldType::Count => "целое число",
            FieldType::Phone => "номер телефона",
            FieldType::Email => "email адрес",
            FieldType::YesNo => "да / нет",
        }
    }
}

/// Columns of `bank_card_service` fillable through the intake form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BankCardField {
    FullName,
    MotherName,
    MaritalStatus,
    LastEducation,
    IndonesianPhoneNumber,
    OverseasPhoneNumber,
    IndonesianAddress,
    OverseasAddress,
    AddressEmail,
    Occupation,
    CompanyName,
    BusinessTypeCompany,
    AddressCompany,
}

impl BankCardField {
    pub fn column(self) -> &'static str {
        match self {
            BankCardField::FullName => "full_name",
            BankCardField::MotherName => "mother_name",
            BankCardField::MaritalStatus => "marital_status",
            BankCardField::LastEducation => "last_education",
            BankCardField::IndonesianPhoneNumber => "indonesian_phone_number",
            BankCardField::OverseasPhoneNumber => "overseas_phone_number",
            BankCardField::IndonesianAddress => "indonesian_address",
            BankCardField::OverseasAddress => "overseas_address",
            BankCardField::AddressEmail => "address_email",
            BankCardField::Occupation => "occupation",
            BankCardField::CompanyName => "company_name",
            BankCardField::BusinessTypeCompany => "business_type_company",
            BankCardField::AddressCompany => "address_company",
        }
    }
}

/// Columns of `driver_license_service` fillable through the intake form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverLicenseField {
    BloodType,
    HeightCm,
    CategoryA,
    CategoryB,
    International,
}

impl DriverLicenseField {
    pub fn column(self) -> &'static str {
        match self {
            DriverLicenseField::BloodType => "blood_type",
            DriverLicenseField::HeightCm => "height_cm",
            DriverLicenseField::CategoryA => "category_a",
            DriverLicenseField::CategoryB => "category_b",
            DriverLicenseField::International => "international",
        }
    }
}

/// Closed set of form-fillable columns across all products. The entity layer
/// matches on this exhaustively; there is no string-name dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldId {
    BankCard(BankCardField),
    DriverLicense(DriverLicenseField),
}

impl FieldId {
    pub fn column(self) -> &'static str {
        match self {
            FieldId::BankCard(f) => f.column(),
            FieldId::DriverLicense(f) => f.column(),
        }
    }
}

/// A typed answer produced from customer input according to [`FieldType`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Count(i32),
    YesNo(bool),
}

/// One question of an intake form.
#[derive(Debug, Clone, Copy)]
pub struct FormField {
    pub id: FieldId,
    pub field_type: FieldType,
    pub label: &'static str,
}

const fn bank(field: BankCardField, field_type: FieldType, label: &'static str) -> FormField {
    FormField { id: FieldId::BankCard(field), field_type, label }
}

const fn drive(field: DriverLicenseField, field_type: FieldType, label: &'static str) -> FormField {
    FormField { id: FieldId::DriverLicense(field), field_type, label }
}

pub static BANK_CARD_FORM: [FormField; 13] = [
    bank(BankCardField::FullName, FieldType::EnText, "full name"),
    bank(BankCardField::MotherName, FieldType::EnText, "mother name"),
    bank(BankCardField::MaritalStatus, FieldType::EnText, "marital status"),
    bank(BankCardField::LastEducation, FieldType::EnText, "last education"),
    bank(BankCardField::IndonesianPhoneNumber, FieldType::Phone, "indonesian phone number"),
    bank(BankCardField::OverseasPhoneNumber, FieldType::Phone, "overseas phone number"),
    bank(BankCardField::IndonesianAddress, FieldType::EnText, "indonesian address"),
    bank(BankCardField::OverseasAddress, FieldType::EnText, "overseas address"),
    bank(BankCardField::AddressEmail, FieldType::Email, "address email"),
    bank(BankCardField::Occupation, FieldType::EnText, "occupation"),
    bank(BankCardField::CompanyName, FieldType::EnText, "company name"),
    bank(BankCardField::BusinessTypeCompany, FieldType::EnText, "business type company"),
    bank(BankCardField::AddressCompany, FieldType::EnText, "address company"),
];

pub static DRIVER_LICENSE_FORM: [FormField; 5] = [
    drive(DriverLicenseField::BloodType, FieldType::Text, "группа крови"),
    drive(DriverLicenseField::HeightCm, FieldType::Count, "рост в сантиметрах"),
    drive(DriverLicenseField::CategoryA, FieldType::YesNo, "нужна категория A (мото)"),
    drive(DriverLicenseField::CategoryB, FieldType::YesNo, "нужна категория B (авто)"),
    drive(DriverLicenseField::International, FieldType::YesNo, "нужна международная версия"),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn bank_card_form_has_thirteen_text_like_fields() {
        assert_eq!(BANK_CARD_FORM.len(), 13);
        for field in &BANK_CARD_FORM {
            assert_ne!(field.field_type, FieldType::YesNo, "{}", field.label);
            assert!(matches!(field.id, FieldId::BankCard(_)));
        }
    }

    #[test]
    fn driver_license_form_order_matches_schema() {
        let types: Vec<FieldType> = DRIVER_LICENSE_FORM.iter().map(|f| f.field_type).collect();
        assert_eq!(
            types,
            vec![
                FieldType::Text,
                FieldType::Count,
                FieldType::YesNo,
                FieldType::YesNo,
                FieldType::YesNo,
            ]
        );
    }

    #[test]
    fn column_names_are_unique_per_form() {
        let bank: HashSet<_> = BANK_CARD_FORM.iter().map(|f| f.id.column()).collect();
        assert_eq!(bank.len(), BANK_CARD_FORM.len());
        let drive: HashSet<_> = DRIVER_LICENSE_FORM.iter().map(|f| f.id.column()).collect();
        assert_eq!(drive.len(), DRIVER_LICENSE_FORM.len());
    }
}
