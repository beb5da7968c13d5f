use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .min_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(1800))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        Ok(Database { pool })
    }

    pub async fn init(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tg_user (
                tg_id BIGINT PRIMARY KEY,
                tg_username TEXT,
                is_banned BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS operator (
                operator_id BIGSERIAL PRIMARY KEY,
                tg_id BIGINT NOT NULL UNIQUE REFERENCES tg_user (tg_id),
                name TEXT NOT NULL,
                operation_section TEXT NOT NULL,
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS service (
                service_id BIGSERIAL PRIMARY KEY,
                user_tg_id BIGINT NOT NULL REFERENCES tg_user (tg_id),
                customer_name TEXT NOT NULL,
                request_date DATE NOT NULL,
                payment_photo TEXT,
                is_paid BOOLEAN NOT NULL DEFAULT FALSE,
                service_executor BIGINT REFERENCES operator (operator_id),
                is_sent_to_executor BOOLEAN NOT NULL DEFAULT FALSE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS bank_card_service (
                service_id BIGINT PRIMARY KEY REFERENCES service (service_id),
                full_name TEXT,
                mother_name TEXT,
                marital_status TEXT,
                last_education TEXT,
                indonesian_phone_number TEXT,
                overseas_phone_number TEXT,
                indonesian_address TEXT,
                overseas_address TEXT,
                address_email TEXT,
                occupation TEXT,
                company_name TEXT,
                business_type_company TEXT,
                address_company TEXT,
                is_form_complete BOOLEAN NOT NULL DEFAULT FALSE,
                passport TEXT,
                is_passport_complete BOOLEAN NOT NULL DEFAULT FALSE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS driver_license_service (
                service_id BIGINT PRIMARY KEY REFERENCES service (service_id),
                blood_type TEXT,
                height_cm INTEGER,
                category_a BOOLEAN,
                category_b BOOLEAN,
                international BOOLEAN,
                is_form_complete BOOLEAN NOT NULL DEFAULT FALSE,
                passport TEXT,
                is_passport_complete BOOLEAN NOT NULL DEFAULT FALSE,
                e_visa TEXT,
                is_visa_complete BOOLEAN NOT NULL DEFAULT FALSE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS meeting (
                service_id BIGINT PRIMARY KEY REFERENCES service (service_id),
                meeting_time TIMESTAMP WITH TIME ZONE,
                meeting_address TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_service_user_tg_id ON service (user_tg_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_service_executor ON service (service_executor)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_operator_section ON operator (operation_section)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_meeting_time ON meeting (meeting_time)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
