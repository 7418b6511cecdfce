//! Repository implementations for SQLite storage

pub mod attempt_ledger;
pub mod audit;
pub mod reset_token;
pub mod verification_code;

pub use attempt_ledger::SqliteAttemptLedgerRepository;
pub use audit::SqliteAuditRepository;
pub use reset_token::SqliteResetTokenRepository;
pub use verification_code::SqliteVerificationCodeRepository;

use async_trait::async_trait;
use bastion_core::{
    Error,
    error::StorageError,
    repositories::{
        AttemptLedgerRepositoryProvider, AuditRepositoryProvider, RepositoryProvider,
        ResetTokenRepositoryProvider, VerificationCodeRepositoryProvider,
    },
};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::migrations::{SqliteMigrationManager, all_migrations};

/// Repository provider implementation for SQLite
///
/// Every repository shares the same connection pool.
pub struct SqliteRepositoryProvider {
    pool: SqlitePool,
    attempt_ledger: Arc<SqliteAttemptLedgerRepository>,
    verification_code: Arc<SqliteVerificationCodeRepository>,
    reset_token: Arc<SqliteResetTokenRepository>,
    audit: Arc<SqliteAuditRepository>,
}

impl SqliteRepositoryProvider {
    pub fn new(pool: SqlitePool) -> Self {
        let attempt_ledger = Arc::new(SqliteAttemptLedgerRepository::new(pool.clone()));
        let verification_code = Arc::new(SqliteVerificationCodeRepository::new(pool.clone()));
        let reset_token = Arc::new(SqliteResetTokenRepository::new(pool.clone()));
        let audit = Arc::new(SqliteAuditRepository::new(pool.clone()));

        Self {
            pool,
            attempt_ledger,
            verification_code,
            reset_token,
            audit,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl AttemptLedgerRepositoryProvider for SqliteRepositoryProvider {
    type AttemptLedgerRepo = SqliteAttemptLedgerRepository;

    fn attempt_ledger(&self) -> &Self::AttemptLedgerRepo {
        &self.attempt_ledger
    }
}

impl VerificationCodeRepositoryProvider for SqliteRepositoryProvider {
    type VerificationCodeRepo = SqliteVerificationCodeRepository;

    fn verification_code(&self) -> &Self::VerificationCodeRepo {
        &self.verification_code
    }
}

impl ResetTokenRepositoryProvider for SqliteRepositoryProvider {
    type ResetTokenRepo = SqliteResetTokenRepository;

    fn reset_token(&self) -> &Self::ResetTokenRepo {
        &self.reset_token
    }
}

impl AuditRepositoryProvider for SqliteRepositoryProvider {
    type AuditRepo = SqliteAuditRepository;

    fn audit(&self) -> &Self::AuditRepo {
        &self.audit
    }
}

#[async_trait]
impl RepositoryProvider for SqliteRepositoryProvider {
    async fn migrate(&self) -> Result<(), Error> {
        let manager = SqliteMigrationManager::new(self.pool.clone());
        manager.initialize().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to initialize migrations");
            Error::Storage(StorageError::Migration(
                "Failed to initialize migrations".to_string(),
            ))
        })?;

        manager.up(&all_migrations()).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to run migrations");
            Error::Storage(StorageError::Migration(
                "Failed to run migrations".to_string(),
            ))
        })?;

        Ok(())
    }

    async fn health_check(&self) -> Result<(), Error> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "SQLite health check failed");
                Error::Storage(StorageError::Connection("Health check failed".to_string()))
            })?;
        Ok(())
    }
}
