use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

const SESSION_COLUMNS: &str =
    "id, user_id, token_hash, created_at, last_used_at, expires_at, revoked_at";

/// A login session. Only the SHA-256 of the bearer token is stored.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AuthSession {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(skip)]
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl AuthSession {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && self.expires_at > now
    }

    pub async fn create(
        pool: &SqlitePool,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        let id = Uuid::new_v4();
        sqlx::query_as::<_, AuthSession>(&format!(
            "INSERT INTO auth_sessions (id, user_id, token_hash, expires_at)
            VALUES (?, ?, ?, ?)
            RETURNING {SESSION_COLUMNS}"
        ))
        .bind(id)
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_token_hash(
        pool: &SqlitePool,
        token_hash: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, AuthSession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM auth_sessions WHERE token_hash = ?"
        ))
        .bind(token_hash)
        .fetch_optional(pool)
        .await
    }

    pub async fn touch(pool: &SqlitePool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE auth_sessions SET last_used_at = datetime('now', 'subsec') WHERE id = ?",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn revoke(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE auth_sessions SET revoked_at = datetime('now', 'subsec')
            WHERE id = ? AND revoked_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Remove revoked sessions and sessions that expired before `now`.
    pub async fn delete_inactive(
        pool: &SqlitePool,
        now: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM auth_sessions WHERE revoked_at IS NOT NULL OR expires_at < ?",
        )
        .bind(now)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
