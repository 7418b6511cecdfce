//! SQLite implementation of the password reset token repository.

use async_trait::async_trait;
use bastion_core::{
    AccountId, Error, error::utilities::StorageResultExt, repositories::ResetTokenRepository,
    storage::ResetToken,
};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

pub struct SqliteResetTokenRepository {
    pool: SqlitePool,
}

impl SqliteResetTokenRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SqliteResetToken {
    id: i64,
    account_id: String,
    token_hash: String,
    created_at: i64,
    used: bool,
}

impl From<SqliteResetToken> for ResetToken {
    fn from(row: SqliteResetToken) -> Self {
        ResetToken {
            id: row.id,
            account_id: AccountId::new(&row.account_id),
            token_hash: row.token_hash,
            created_at: DateTime::from_timestamp(row.created_at, 0).unwrap_or_default(),
            used: row.used,
        }
    }
}

#[async_trait]
impl ResetTokenRepository for SqliteResetTokenRepository {
    async fn create_token(
        &self,
        account_id: &AccountId,
        token_hash: &str,
        created_at: DateTime<Utc>,
    ) -> Result<ResetToken, Error> {
        let row = sqlx::query_as::<_, SqliteResetToken>(
            r#"
            INSERT INTO reset_tokens (account_id, token_hash, created_at)
            VALUES (?, ?, ?)
            RETURNING id, account_id, token_hash, created_at, used
            "#,
        )
        .bind(account_id.as_str())
        .bind(token_hash)
        .bind(created_at.timestamp())
        .fetch_one(&self.pool)
        .await
        .map_storage_err("Failed to create reset token")?;

        Ok(row.into())
    }

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<ResetToken>, Error> {
        let row = sqlx::query_as::<_, SqliteResetToken>(
            r#"
            SELECT id, account_id, token_hash, created_at, used
            FROM reset_tokens
            WHERE token_hash = ?
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_storage_err("Failed to load reset token")?;

        Ok(row.map(Into::into))
    }

    async fn claim(&self, id: i64) -> Result<bool, Error> {
        let result = sqlx::query("UPDATE reset_tokens SET used = 1 WHERE id = ? AND used = 0")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_storage_err("Failed to claim reset token")?;

        Ok(result.rows_affected() == 1)
    }

    async fn release(&self, id: i64) -> Result<(), Error> {
        sqlx::query("UPDATE reset_tokens SET used = 0 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_storage_err("Failed to release reset token")?;

        Ok(())
    }

    async fn cleanup_tokens_before(&self, before: DateTime<Utc>) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM reset_tokens WHERE created_at < ?")
            .bind(before.timestamp())
            .execute(&self.pool)
            .await
            .map_storage_err("Failed to clean up reset tokens")?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_pool;
    use chrono::Duration;

    #[tokio::test]
    async fn test_create_and_find() {
        let repo = SqliteResetTokenRepository::new(test_pool().await);
        let account = AccountId::new("acct_alice");

        let token = repo.create_token(&account, "abc123", Utc::now()).await.unwrap();
        assert!(!token.used);

        let found = repo.find_by_hash("abc123").await.unwrap().unwrap();
        assert_eq!(found.id, token.id);
        assert_eq!(found.account_id, account);
        assert!(repo.find_by_hash("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_hash_rejected() {
        let repo = SqliteResetTokenRepository::new(test_pool().await);
        let account = AccountId::new("acct_alice");

        repo.create_token(&account, "same", Utc::now()).await.unwrap();
        let err = repo.create_token(&account, "same", Utc::now()).await.unwrap_err();
        assert!(err.is_storage_error());
    }

    #[tokio::test]
    async fn test_claim_once_and_release() {
        let repo = SqliteResetTokenRepository::new(test_pool().await);
        let token = repo
            .create_token(&AccountId::new("acct_alice"), "abc123", Utc::now())
            .await
            .unwrap();

        assert!(repo.claim(token.id).await.unwrap());
        assert!(!repo.claim(token.id).await.unwrap());

        repo.release(token.id).await.unwrap();
        assert!(!repo.find_by_hash("abc123").await.unwrap().unwrap().used);
        assert!(repo.claim(token.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_cleanup() {
        let repo = SqliteResetTokenRepository::new(test_pool().await);
        let account = AccountId::new("acct_alice");
        let now = Utc::now();

        repo.create_token(&account, "old", now - Duration::days(10))
            .await
            .unwrap();
        repo.create_token(&account, "new", now).await.unwrap();

        assert_eq!(
            repo.cleanup_tokens_before(now - Duration::days(2)).await.unwrap(),
            1
        );
        assert!(repo.find_by_hash("new").await.unwrap().is_some());
    }
}
