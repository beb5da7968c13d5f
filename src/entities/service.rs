use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::catalog::forms::{BankCardField, DriverLicenseField, FieldId, FieldValue};
use crate::catalog::ProductKey;
use crate::errors::{DomainError, DomainResult};

use super::readiness::ReadinessSnapshot;
use super::user::TgUser;

/// Handle to one service instance: a base `service` row plus the subtype row
/// named by `kind` and an owned `meeting` row. Mutators persist immediately;
/// there is no write buffering.
#[derive(Debug)]
pub struct Service {
    service_id: i64,
    kind: ProductKey,
    pool: PgPool,
}

fn subtype_table(kind: ProductKey) -> &'static str {
    match kind {
        ProductKey::BankCard => "bank_card_service",
        ProductKey::DriverLicense => "driver_license_service",
    }
}

impl Service {
    pub(super) fn attach(pool: PgPool, service_id: i64, kind: ProductKey) -> Service {
        Service { service_id, kind, pool }
    }

    /// Figures out which product a stored service belongs to by probing the
    /// subtype tables.
    pub async fn resolve_kind(pool: &PgPool, service_id: i64) -> DomainResult<ProductKey> {
        for kind in [ProductKey::BankCard, ProductKey::DriverLicense] {
            let query = format!(
                "SELECT EXISTS(SELECT service_id FROM {} WHERE service_id = $1)",
                subtype_table(kind)
            );
            let row = sqlx::query(&query).bind(service_id).fetch_one(pool).await?;
            if row.get::<bool, _>(0) {
                return Ok(kind);
            }
        }
        Err(DomainError::ServiceNotFound(service_id))
    }

    /// Inserts the base row, the subtype row and the (empty) meeting row.
    pub async fn create(
        pool: &PgPool,
        kind: ProductKey,
        tg_id: i64,
        customer_name: &str,
        request_date: NaiveDate,
    ) -> DomainResult<i64> {
        if !TgUser::exists(pool, tg_id).await? {
            return Err(DomainError::UserNotFound(tg_id));
        }

        let mut tx = pool.begin().await?;
        let row = sqlx::query(
            r#"
            INSERT INTO service (user_tg_id, customer_name, request_date)
            VALUES ($1, $2, $3)
            RETURNING service_id
            "#,
        )
        .bind(tg_id)
        .bind(customer_name)
        .bind(request_date)
        .fetch_one(&mut *tx)
        .await?;
        let service_id: i64 = row.get("service_id");

        let insert_subtype = format!(
            "INSERT INTO {} (service_id) VALUES ($1)",
            subtype_table(kind)
        );
        sqlx::query(&insert_subtype)
            .bind(service_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO meeting (service_id) VALUES ($1) ON CONFLICT DO NOTHING")
            .bind(service_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(service_id)
    }

    /// Resumes an uncompleted service (no executor yet) with the same
    /// customer name, or creates a fresh one. Lets one user run several
    /// in-flight requests for different named customers.
    pub async fn get_or_create(
        pool: &PgPool,
        kind: ProductKey,
        tg_id: i64,
        customer_name: &str,
        request_date: NaiveDate,
    ) -> DomainResult<i64> {
        let query = format!(
            r#"
            SELECT s.service_id
            FROM service s
            JOIN {} sub ON sub.service_id = s.service_id
            WHERE s.user_tg_id = $1
              AND s.customer_name = $2
              AND s.service_executor IS NULL
            ORDER BY s.service_id DESC
            LIMIT 1
            "#,
            subtype_table(kind)
        );
        let existing = sqlx::query(&query)
            .bind(tg_id)
            .bind(customer_name)
            .fetch_optional(pool)
            .await?;
        if let Some(row) = existing {
            return Ok(row.get("service_id"));
        }
        Service::create(pool, kind, tg_id, customer_name, request_date).await
    }

    /// Customer names of this user's in-flight requests for a product,
    /// offered as resume buttons during customer naming.
    pub async fn uncompleted_customer_names(
        pool: &PgPool,
        kind: ProductKey,
        tg_id: i64,
    ) -> DomainResult<Vec<String>> {
        let query = format!(
            r#"
            SELECT s.customer_name
            FROM service s
            JOIN {} sub ON sub.service_id = s.service_id
            WHERE s.user_tg_id = $1 AND s.service_executor IS NULL
            ORDER BY s.service_id
            "#,
            subtype_table(kind)
        );
        let rows = sqlx::query(&query).bind(tg_id).fetch_all(pool).await?;
        Ok(rows.iter().map(|r| r.get("customer_name")).collect())
    }

    pub fn kind(&self) -> ProductKey {
        self.kind
    }

    // ------------------------------------------------------------ base row

    async fn base_row(&self) -> DomainResult<sqlx::postgres::PgRow> {
        sqlx::query(
            r#"
            SELECT user_tg_id, customer_name, request_date, payment_photo,
                   is_paid, service_executor, is_sent_to_executor
            FROM service
            WHERE service_id = $1
            "#,
        )
        .bind(self.service_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DomainError::ServiceNotFound(self.service_id))
    }

    pub async fn user_tg_id(&self) -> DomainResult<i64> {
        Ok(self.base_row().await?.get("user_tg_id"))
    }

    pub async fn customer_name(&self) -> DomainResult<String> {
        Ok(self.base_row().await?.get("customer_name"))
    }

    pub async fn request_date(&self) -> DomainResult<NaiveDate> {
        Ok(self.base_row().await?.get("request_date"))
    }

    pub async fn payment_photo(&self) -> DomainResult<Option<String>> {
        Ok(self.base_row().await?.get("payment_photo"))
    }

    pub async fn is_paid(&self) -> DomainResult<bool> {
        Ok(self.base_row().await?.get("is_paid"))
    }

    pub async fn executor_id(&self) -> DomainResult<Option<i64>> {
        Ok(self.base_row().await?.get("service_executor"))
    }

    pub async fn is_sent_to_executor(&self) -> DomainResult<bool> {
        Ok(self.base_row().await?.get("is_sent_to_executor"))
    }

    pub async fn set_payment_photo(&self, file_id: &str) -> DomainResult<()> {
        sqlx::query("UPDATE service SET payment_photo = $1 WHERE service_id = $2")
            .bind(file_id)
            .bind(self.service_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn confirm_payment(&self) -> DomainResult<()> {
        self.set_paid(true).await
    }

    pub async fn cancel_payment(&self) -> DomainResult<()> {
        self.set_paid(false).await
    }

    async fn set_paid(&self, paid: bool) -> DomainResult<()> {
        sqlx::query("UPDATE service SET is_paid = $1 WHERE service_id = $2")
            .bind(paid)
            .bind(self.service_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// First-accept-wins: sets the executor only while none is assigned.
    /// Returns false when another operator got there first.
    pub async fn try_assign_executor(&self, operator_id: i64) -> DomainResult<bool> {
        if !super::operator::Operator::exists(&self.pool, operator_id).await? {
            return Err(DomainError::OperatorNotFound(operator_id));
        }
        let result = sqlx::query(
            r#"
            UPDATE service
            SET service_executor = $1
            WHERE service_id = $2 AND service_executor IS NULL
            "#,
        )
        .bind(operator_id)
        .bind(self.service_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Latches the one-shot handoff. Compare-and-set like
    /// [`Service::try_assign_executor`]: concurrent readiness re-checks race
    /// here, and only the caller that flipped the flag may announce the
    /// service to operators.
    pub async fn try_mark_sent_to_executor(&self) -> DomainResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE service
            SET is_sent_to_executor = TRUE
            WHERE service_id = $1 AND is_sent_to_executor = FALSE
            "#,
        )
        .bind(self.service_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn executor_name(&self) -> DomainResult<Option<String>> {
        let row = sqlx::query(
            r#"
            SELECT o.name
            FROM service s
            JOIN operator o ON o.operator_id = s.service_executor
            WHERE s.service_id = $1
            "#,
        )
        .bind(self.service_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.get("name")))
    }

    // --------------------------------------------------------- subtype row

    /// Writes one intake-form answer. The field set is closed: a field of
    /// the other product, or a value of the wrong shape, is a catalog error.
    pub async fn put_form_value(&self, field: FieldId, value: FieldValue) -> DomainResult<()> {
        log::info!("service {}: {} = {:?}", self.service_id, field.column(), value);
        match (self.kind, field) {
            (ProductKey::BankCard, FieldId::BankCard(f)) => {
                let FieldValue::Text(text) = value else {
                    return Err(DomainError::FieldNotFound(f.column()));
                };
                let query = format!(
                    "UPDATE bank_card_service SET {} = $1 WHERE service_id = $2",
                    f.column()
                );
                sqlx::query(&query)
                    .bind(text)
                    .bind(self.service_id)
                    .execute(&self.pool)
                    .await?;
                Ok(())
            }
            (ProductKey::DriverLicense, FieldId::DriverLicense(f)) => {
                let query = format!(
                    "UPDATE driver_license_service SET {} = $1 WHERE service_id = $2",
                    f.column()
                );
                let query = sqlx::query(&query);
                let query = match (f, value) {
                    (DriverLicenseField::BloodType, FieldValue::Text(text)) => query.bind(text),
                    (DriverLicenseField::HeightCm, FieldValue::Count(n)) => query.bind(n),
                    (DriverLicenseField::CategoryA, FieldValue::YesNo(b))
                    | (DriverLicenseField::CategoryB, FieldValue::YesNo(b))
                    | (DriverLicenseField::International, FieldValue::YesNo(b)) => query.bind(b),
                    _ => return Err(DomainError::FieldNotFound(f.column())),
                };
                query.bind(self.service_id).execute(&self.pool).await?;
                Ok(())
            }
            (_, field) => Err(DomainError::FieldNotFound(field.column())),
        }
    }

    pub async fn form_complete(&self) -> DomainResult<()> {
        self.set_subtype_flag("is_form_complete", true).await
    }

    pub async fn form_incomplete(&self) -> DomainResult<()> {
        self.set_subtype_flag("is_form_complete", false).await
    }

    pub async fn set_passport(&self, file_id: &str) -> DomainResult<()> {
        let query = format!(
            "UPDATE {} SET passport = $1 WHERE service_id = $2",
            subtype_table(self.kind)
        );
        sqlx::query(&query)
            .bind(file_id)
            .bind(self.service_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn passport_complete(&self) -> DomainResult<()> {
        self.set_subtype_flag("is_passport_complete", true).await
    }

    pub async fn passport_incomplete(&self) -> DomainResult<()> {
        self.set_subtype_flag("is_passport_complete", false).await
    }

    pub async fn passport(&self) -> DomainResult<Option<String>> {
        let query = format!(
            "SELECT passport FROM {} WHERE service_id = $1",
            subtype_table(self.kind)
        );
        let row = sqlx::query(&query)
            .bind(self.service_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DomainError::ServiceNotFound(self.service_id))?;
        Ok(row.get("passport"))
    }

    pub async fn set_e_visa(&self, file_id: &str) -> DomainResult<()> {
        self.require_driver_license("e_visa")?;
        sqlx::query("UPDATE driver_license_service SET e_visa = $1 WHERE service_id = $2")
            .bind(file_id)
            .bind(self.service_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn visa_complete(&self) -> DomainResult<()> {
        self.require_driver_license("is_visa_complete")?;
        self.set_subtype_flag("is_visa_complete", true).await
    }

    pub async fn visa_incomplete(&self) -> DomainResult<()> {
        self.require_driver_license("is_visa_complete")?;
        self.set_subtype_flag("is_visa_complete", false).await
    }

    pub async fn e_visa(&self) -> DomainResult<Option<String>> {
        self.require_driver_license("e_visa")?;
        let row = sqlx::query("SELECT e_visa FROM driver_license_service WHERE service_id = $1")
            .bind(self.service_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DomainError::ServiceNotFound(self.service_id))?;
        Ok(row.get("e_visa"))
    }

    fn require_driver_license(&self, column: &'static str) -> DomainResult<()> {
        if self.kind != ProductKey::DriverLicense {
            return Err(DomainError::FieldNotFound(column));
        }
        Ok(())
    }

    async fn set_subtype_flag(&self, column: &'static str, value: bool) -> DomainResult<()> {
        let query = format!(
            "UPDATE {} SET {} = $1 WHERE service_id = $2",
            subtype_table(self.kind),
            column
        );
        sqlx::query(&query)
            .bind(value)
            .bind(self.service_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// The filled form as (label, rendered value) pairs, in form order.
    /// Shown to the executor after they take the customer.
    pub async fn form_entries(&self) -> DomainResult<Vec<(&'static str, String)>> {
        fn render_text(value: Option<String>) -> String {
            value.unwrap_or_else(|| "—".to_string())
        }
        fn render_bool(value: Option<bool>) -> String {
            match value {
                Some(true) => "Да".to_string(),
                Some(false) => "Нет".to_string(),
                None => "—".to_string(),
            }
        }

        match self.kind {
            ProductKey::BankCard => {
                let row = sqlx::query(
                    r#"
                    SELECT full_name, mother_name, marital_status, last_education,
                           indonesian_phone_number, overseas_phone_number,
                           indonesian_address, overseas_address, address_email,
                           occupation, company_name, business_type_company,
                           address_company
                    FROM bank_card_service
                    WHERE service_id = $1
                    "#,
                )
                .bind(self.service_id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or(DomainError::ServiceNotFound(self.service_id))?;

                Ok(crate::catalog::forms::BANK_CARD_FORM
                    .iter()
                    .map(|field| {
                        let value: Option<String> = row.get(field.id.column());
                        (field.label, render_text(value))
                    })
                    .collect())
            }
            ProductKey::DriverLicense => {
                let row = sqlx::query(
                    r#"
                    SELECT blood_type, height_cm, category_a, category_b, international
                    FROM driver_license_service
                    WHERE service_id = $1
                    "#,
                )
                .bind(self.service_id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or(DomainError::ServiceNotFound(self.service_id))?;

                let blood_type: Option<String> = row.get("blood_type");
                let height_cm: Option<i32> = row.get("height_cm");
                let form = &crate::catalog::forms::DRIVER_LICENSE_FORM;
                Ok(vec![
                    (form[0].label, render_text(blood_type)),
                    (
                        form[1].label,
                        height_cm.map(|h| h.to_string()).unwrap_or_else(|| "—".to_string()),
                    ),
                    (form[2].label, render_bool(row.get("category_a"))),
                    (form[3].label, render_bool(row.get("category_b"))),
                    (form[4].label, render_bool(row.get("international"))),
                ])
            }
        }
    }

    // -------------------------------------------------------- meeting row

    pub async fn set_meeting_place(&self, address: &str) -> DomainResult<()> {
        sqlx::query("UPDATE meeting SET meeting_address = $1 WHERE service_id = $2")
            .bind(address)
            .bind(self.service_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_meeting_time(&self, time: DateTime<Utc>) -> DomainResult<()> {
        sqlx::query("UPDATE meeting SET meeting_time = $1 WHERE service_id = $2")
            .bind(time)
            .bind(self.service_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn meeting_place(&self) -> DomainResult<Option<String>> {
        let row = sqlx::query("SELECT meeting_address FROM meeting WHERE service_id = $1")
            .bind(self.service_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DomainError::ServiceNotFound(self.service_id))?;
        Ok(row.get("meeting_address"))
    }

    pub async fn meeting_time(&self) -> DomainResult<Option<DateTime<Utc>>> {
        let row = sqlx::query("SELECT meeting_time FROM meeting WHERE service_id = $1")
            .bind(self.service_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DomainError::ServiceNotFound(self.service_id))?;
        Ok(row.get("meeting_time"))
    }

    // ----------------------------------------------------------- readiness

    /// All completion flags in one query.
    pub async fn readiness_snapshot(&self) -> DomainResult<ReadinessSnapshot> {
        match self.kind {
            ProductKey::BankCard => {
                let row = sqlx::query(
                    r#"
                    SELECT s.is_paid, b.is_form_complete, b.is_passport_complete
                    FROM service s
                    JOIN bank_card_service b ON b.service_id = s.service_id
                    WHERE s.service_id = $1
                    "#,
                )
                .bind(self.service_id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or(DomainError::ServiceNotFound(self.service_id))?;
                Ok(ReadinessSnapshot {
                    is_paid: row.get("is_paid"),
                    is_form_complete: row.get("is_form_complete"),
                    is_passport_complete: row.get("is_passport_complete"),
                    ..Default::default()
                })
            }
            ProductKey::DriverLicense => {
                let row = sqlx::query(
                    r#"
                    SELECT s.is_paid, d.is_form_complete, d.is_passport_complete,
                           d.is_visa_complete,
                           m.meeting_address IS NOT NULL AS has_place,
                           m.meeting_time IS NOT NULL AS has_time
                    FROM service s
                    JOIN driver_license_service d ON d.service_id = s.service_id
                    LEFT JOIN meeting m ON m.service_id = s.service_id
                    WHERE s.service_id = $1
                    "#,
                )
                .bind(self.service_id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or(DomainError::ServiceNotFound(self.service_id))?;
                Ok(ReadinessSnapshot {
                    is_paid: row.get("is_paid"),
                    is_form_complete: row.get("is_form_complete"),
                    is_passport_complete: row.get("is_passport_complete"),
                    is_visa_complete: row.get("is_visa_complete"),
                    has_meeting_place: row.get("has_place"),
                    has_meeting_time: row.get("has_time"),
                })
            }
        }
    }
}

// Run with `cargo test -- --ignored` against a scratch database.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Section;
    use crate::database::Database;
    use crate::entities::operator::Operator;

    async fn test_pool() -> PgPool {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a test database");
        let db = Database::new(&url).await.expect("connect");
        db.init().await.expect("init schema");
        db.pool
    }

    fn unique_name(prefix: &str) -> String {
        format!("{}-{}", prefix, chrono::Utc::now().timestamp_micros())
    }

    async fn seed_operator(pool: &PgPool, tg_id: i64, section: Section) -> i64 {
        TgUser::register(pool, tg_id, Some("test_operator")).await.expect("register");
        match Operator::new(pool, tg_id, section, "test operator").await {
            Ok(id) => id,
            Err(crate::errors::DomainError::OperatorAlreadySet(_)) => {
                Operator::find_for(pool, tg_id, section)
                    .await
                    .expect("lookup")
                    .expect("operator exists for section")
            }
            Err(e) => panic!("seed operator: {e}"),
        }
    }

    #[tokio::test]
    #[ignore]
    async fn get_or_create_resumes_until_executor_is_assigned() {
        let pool = test_pool().await;
        let tg_id = 910_000_001;
        TgUser::register(&pool, tg_id, Some("resume_user")).await.expect("register");

        let today = chrono::Utc::now().date_naive();
        let name = unique_name("customer");
        let first = Service::get_or_create(&pool, ProductKey::BankCard, tg_id, &name, today)
            .await
            .expect("create");
        let second = Service::get_or_create(&pool, ProductKey::BankCard, tg_id, &name, today)
            .await
            .expect("resume");
        assert_eq!(first, second, "same name must resume the open request");

        // A different product under the same name is its own instance.
        let other_kind = Service::get_or_create(&pool, ProductKey::DriverLicense, tg_id, &name, today)
            .await
            .expect("other product");
        assert_ne!(first, other_kind);

        // Once an executor holds the request, the name starts a fresh one.
        let operator_id = seed_operator(&pool, 910_000_002, Section::BankCard).await;
        let service = Service::attach(pool.clone(), first, ProductKey::BankCard);
        assert!(service.try_assign_executor(operator_id).await.expect("assign"));
        let third = Service::get_or_create(&pool, ProductKey::BankCard, tg_id, &name, today)
            .await
            .expect("new instance");
        assert_ne!(first, third);
    }

    #[tokio::test]
    #[ignore]
    async fn handoff_latch_flips_exactly_once() {
        let pool = test_pool().await;
        let tg_id = 910_000_003;
        TgUser::register(&pool, tg_id, Some("latch_user")).await.expect("register");

        let today = chrono::Utc::now().date_naive();
        let service_id =
            Service::create(&pool, ProductKey::BankCard, tg_id, &unique_name("latch"), today)
                .await
                .expect("create");
        let service = Service::attach(pool.clone(), service_id, ProductKey::BankCard);

        assert!(!service.is_sent_to_executor().await.expect("flag"));
        assert!(service.try_mark_sent_to_executor().await.expect("first claim"));
        // The loser of the race observes a spent latch and must stay silent.
        assert!(!service.try_mark_sent_to_executor().await.expect("second claim"));
        assert!(service.is_sent_to_executor().await.expect("flag"));
    }

    #[tokio::test]
    #[ignore]
    async fn service_reports_its_creator_as_owner() {
        let pool = test_pool().await;
        let tg_id = 910_000_004;
        TgUser::register(&pool, tg_id, Some("owner_user")).await.expect("register");

        let today = chrono::Utc::now().date_naive();
        let service_id =
            Service::create(&pool, ProductKey::DriverLicense, tg_id, &unique_name("owner"), today)
                .await
                .expect("create");
        let service = Service::attach(pool.clone(), service_id, ProductKey::DriverLicense);
        assert_eq!(service.user_tg_id().await.expect("owner"), tg_id);
    }
}
