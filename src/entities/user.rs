use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::errors::{DomainError, DomainResult};

/// Handle to one `tg_user` row. Every accessor is a single query so that
/// concurrent handlers always observe the stored value, not a stale copy.
#[derive(Debug)]
pub struct TgUser {
    tg_id: i64,
    pool: PgPool,
}

impl TgUser {
    pub(super) fn attach(pool: PgPool, tg_id: i64) -> TgUser {
        TgUser { tg_id, pool }
    }

    /// Upsert on `/start`: keeps the username current, never duplicates.
    pub async fn register(pool: &PgPool, tg_id: i64, username: Option<&str>) -> DomainResult<()> {
        sqlx::query(
            r#"
            INSERT INTO tg_user (tg_id, tg_username)
            VALUES ($1, $2)
            ON CONFLICT (tg_id)
            DO UPDATE SET tg_username = EXCLUDED.tg_username
            "#,
        )
        .bind(tg_id)
        .bind(username)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn exists(pool: &PgPool, tg_id: i64) -> DomainResult<bool> {
        let row = sqlx::query("SELECT EXISTS(SELECT tg_id FROM tg_user WHERE tg_id = $1)")
            .bind(tg_id)
            .fetch_one(pool)
            .await?;
        Ok(row.get::<bool, _>(0))
    }

    /// Username if the user has one, otherwise the numeric id.
    pub async fn display_name(&self) -> DomainResult<String> {
        let row = sqlx::query("SELECT tg_username FROM tg_user WHERE tg_id = $1")
            .bind(self.tg_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DomainError::UserNotFound(self.tg_id))?;
        let username: Option<String> = row.get("tg_username");
        Ok(username.unwrap_or_else(|| self.tg_id.to_string()))
    }

    /// Ban gate for incoming updates. An unregistered user is not banned.
    pub async fn is_banned(pool: &PgPool, tg_id: i64) -> DomainResult<bool> {
        let row = sqlx::query("SELECT is_banned FROM tg_user WHERE tg_id = $1")
            .bind(tg_id)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(|r| r.get("is_banned")).unwrap_or(false))
    }
}
