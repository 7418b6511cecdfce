//! SQLite implementation of the verification code repository.

use async_trait::async_trait;
use bastion_core::{
    AccountId, Error,
    error::utilities::StorageResultExt,
    repositories::VerificationCodeRepository,
    storage::{NewVerificationCode, VerificationCode},
};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

pub struct SqliteVerificationCodeRepository {
    pool: SqlitePool,
}

impl SqliteVerificationCodeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SqliteVerificationCode {
    id: i64,
    account_id: String,
    code_hash: Vec<u8>,
    salt: Vec<u8>,
    created_at: i64,
    used: bool,
    attempt_count: i64,
    max_attempts: i64,
}

impl From<SqliteVerificationCode> for VerificationCode {
    fn from(row: SqliteVerificationCode) -> Self {
        VerificationCode {
            id: row.id,
            account_id: AccountId::new(&row.account_id),
            code_hash: row.code_hash,
            salt: row.salt,
            created_at: DateTime::from_timestamp(row.created_at, 0).unwrap_or_default(),
            used: row.used,
            attempt_count: row.attempt_count as u32,
            max_attempts: row.max_attempts as u32,
        }
    }
}

const COLUMNS: &str = "id, account_id, code_hash, salt, created_at, used, attempt_count, max_attempts";

#[async_trait]
impl VerificationCodeRepository for SqliteVerificationCodeRepository {
    async fn create_code(&self, code: NewVerificationCode) -> Result<VerificationCode, Error> {
        let row = sqlx::query_as::<_, SqliteVerificationCode>(&format!(
            r#"
            INSERT INTO verification_codes (account_id, code_hash, salt, created_at, max_attempts)
            VALUES (?, ?, ?, ?, ?)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(code.account_id.as_str())
        .bind(&code.code_hash)
        .bind(&code.salt)
        .bind(code.created_at.timestamp())
        .bind(i64::from(code.max_attempts))
        .fetch_one(&self.pool)
        .await
        .map_storage_err("Failed to create verification code")?;

        Ok(row.into())
    }

    async fn latest_for_account(
        &self,
        account_id: &AccountId,
    ) -> Result<Option<VerificationCode>, Error> {
        let row = sqlx::query_as::<_, SqliteVerificationCode>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM verification_codes
            WHERE account_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#
        ))
        .bind(account_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_storage_err("Failed to load verification code")?;

        Ok(row.map(Into::into))
    }

    async fn find_code(&self, id: i64) -> Result<Option<VerificationCode>, Error> {
        let row = sqlx::query_as::<_, SqliteVerificationCode>(&format!(
            "SELECT {COLUMNS} FROM verification_codes WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_storage_err("Failed to load verification code")?;

        Ok(row.map(Into::into))
    }

    async fn register_attempt(&self, id: i64) -> Result<Option<u32>, Error> {
        let count: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE verification_codes
            SET attempt_count = attempt_count + 1
            WHERE id = ? AND used = 0 AND attempt_count < max_attempts
            RETURNING attempt_count
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_storage_err("Failed to register verification attempt")?;

        Ok(count.map(|c| c as u32))
    }

    async fn mark_used(&self, id: i64) -> Result<bool, Error> {
        let result = sqlx::query("UPDATE verification_codes SET used = 1 WHERE id = ? AND used = 0")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_storage_err("Failed to mark verification code used")?;

        Ok(result.rows_affected() == 1)
    }

    async fn cleanup_codes_before(&self, before: DateTime<Utc>) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM verification_codes WHERE created_at < ?")
            .bind(before.timestamp())
            .execute(&self.pool)
            .await
            .map_storage_err("Failed to clean up verification codes")?;

        Ok(result.rows_affected())
    }
}
