use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::catalog::Section;
use crate::errors::{DomainError, DomainResult};

use super::user::TgUser;

/// Handle to one `operator` row. An operator belongs to exactly one section;
/// the UNIQUE constraint on `tg_id` enforces one role per telegram user.
#[derive(Debug)]
pub struct Operator {
    operator_id: i64,
    pool: PgPool,
}

impl Operator {
    pub(super) fn attach(pool: PgPool, operator_id: i64) -> Operator {
        Operator { operator_id, pool }
    }

    /// Creates an operator row for an existing telegram user.
    pub async fn new(pool: &PgPool, tg_id: i64, section: Section, name: &str) -> DomainResult<i64> {
        if !TgUser::exists(pool, tg_id).await? {
            return Err(DomainError::UserNotFound(tg_id));
        }
        let result = sqlx::query(
            r#"
            INSERT INTO operator (tg_id, operation_section, name)
            VALUES ($1, $2, $3)
            RETURNING operator_id
            "#,
        )
        .bind(tg_id)
        .bind(section.as_str())
        .bind(name)
        .fetch_one(pool)
        .await;

        match result {
            Ok(row) => Ok(row.get("operator_id")),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(DomainError::OperatorAlreadySet(tg_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn delete(pool: &PgPool, operator_id: i64) -> DomainResult<()> {
        let result = sqlx::query("DELETE FROM operator WHERE operator_id = $1")
            .bind(operator_id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DomainError::OperatorNotFound(operator_id));
        }
        Ok(())
    }

    pub async fn exists(pool: &PgPool, operator_id: i64) -> DomainResult<bool> {
        let row = sqlx::query("SELECT EXISTS(SELECT operator_id FROM operator WHERE operator_id = $1)")
            .bind(operator_id)
            .fetch_one(pool)
            .await?;
        Ok(row.get::<bool, _>(0))
    }

    pub async fn ids_in_section(pool: &PgPool, section: Section) -> DomainResult<Vec<i64>> {
        let rows = sqlx::query("SELECT operator_id FROM operator WHERE operation_section = $1")
            .bind(section.as_str())
            .fetch_all(pool)
            .await?;
        Ok(rows.iter().map(|r| r.get("operator_id")).collect())
    }

    pub async fn all_ids(pool: &PgPool) -> DomainResult<Vec<i64>> {
        let rows = sqlx::query("SELECT operator_id FROM operator ORDER BY operator_id")
            .fetch_all(pool)
            .await?;
        Ok(rows.iter().map(|r| r.get("operator_id")).collect())
    }

    /// Authorization check: the operator id of `tg_id` if they serve `section`.
    pub async fn find_for(pool: &PgPool, tg_id: i64, section: Section) -> DomainResult<Option<i64>> {
        let row = sqlx::query(
            "SELECT operator_id FROM operator WHERE tg_id = $1 AND operation_section = $2",
        )
        .bind(tg_id)
        .bind(section.as_str())
        .fetch_optional(pool)
        .await?;
        Ok(row.map(|r| r.get("operator_id")))
    }

    pub async fn tg_id(&self) -> DomainResult<i64> {
        let row = self.row().await?;
        Ok(row.get("tg_id"))
    }

    pub async fn name(&self) -> DomainResult<String> {
        let row = self.row().await?;
        Ok(row.get("name"))
    }

    pub async fn section(&self) -> DomainResult<Section> {
        let row = self.row().await?;
        let raw: String = row.get("operation_section");
        // The column is only ever written from Section::as_str.
        Section::parse(&raw).ok_or(DomainError::OperatorNotFound(self.operator_id))
    }

    async fn row(&self) -> DomainResult<sqlx::postgres::PgRow> {
        sqlx::query("SELECT tg_id, name, operation_section FROM operator WHERE operator_id = $1")
            .bind(self.operator_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DomainError::OperatorNotFound(self.operator_id))
    }
}
