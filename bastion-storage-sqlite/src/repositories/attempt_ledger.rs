//! SQLite implementation of the login attempt ledger.

use async_trait::async_trait;
use bastion_core::{
    Error, error::utilities::StorageResultExt, repositories::AttemptLedgerRepository,
    storage::LoginAttempt,
};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

pub struct SqliteAttemptLedgerRepository {
    pool: SqlitePool,
}

impl SqliteAttemptLedgerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SqliteLoginAttempt {
    id: i64,
    username: String,
    client_address: String,
    attempted_at: i64,
    succeeded: bool,
}

impl From<SqliteLoginAttempt> for LoginAttempt {
    fn from(row: SqliteLoginAttempt) -> Self {
        LoginAttempt {
            id: row.id,
            username: row.username,
            client_address: row.client_address,
            attempted_at: DateTime::from_timestamp(row.attempted_at, 0).unwrap_or_default(),
            succeeded: row.succeeded,
        }
    }
}

#[async_trait]
impl AttemptLedgerRepository for SqliteAttemptLedgerRepository {
    async fn record_attempt(
        &self,
        username: &str,
        client_address: &str,
        succeeded: bool,
        attempted_at: DateTime<Utc>,
    ) -> Result<LoginAttempt, Error> {
        let row = sqlx::query_as::<_, SqliteLoginAttempt>(
            r#"
            INSERT INTO login_attempts (username, client_address, attempted_at, succeeded)
            VALUES (?, ?, ?, ?)
            RETURNING id, username, client_address, attempted_at, succeeded
            "#,
        )
        .bind(username)
        .bind(client_address)
        .bind(attempted_at.timestamp())
        .bind(succeeded)
        .fetch_one(&self.pool)
        .await
        .map_storage_err("Failed to record login attempt")?;

        Ok(row.into())
    }

    async fn count_failures_since(
        &self,
        username: &str,
        client_address: &str,
        since: DateTime<Utc>,
    ) -> Result<u32, Error> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM login_attempts
            WHERE succeeded = 0
              AND attempted_at >= ?
              AND (username = ? OR client_address = ?)
            "#,
        )
        .bind(since.timestamp())
        .bind(username)
        .bind(client_address)
        .fetch_one(&self.pool)
        .await
        .map_storage_err("Failed to count failed login attempts")?;

        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn cleanup_attempts_before(&self, before: DateTime<Utc>) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM login_attempts WHERE attempted_at < ?")
            .bind(before.timestamp())
            .execute(&self.pool)
            .await
            .map_storage_err("Failed to clean up login attempts")?;

        Ok(result.rows_affected())
    }
}
