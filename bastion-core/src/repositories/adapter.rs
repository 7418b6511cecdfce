use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    AccountId, Error,
    repositories::{
        AttemptLedgerRepository, AuditRepository, RepositoryProvider, ResetTokenRepository,
        VerificationCodeRepository,
    },
    storage::{
        LoginAttempt, NewSecurityEvent, NewVerificationCode, ResetToken, SecurityEvent,
        VerificationCode,
    },
};

/// Adapter that wraps a RepositoryProvider and implements the ledger repository
pub struct AttemptLedgerRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> AttemptLedgerRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> AttemptLedgerRepository for AttemptLedgerRepositoryAdapter<R> {
    async fn record_attempt(
        &self,
        username: &str,
        client_address: &str,
        succeeded: bool,
        attempted_at: DateTime<Utc>,
    ) -> Result<LoginAttempt, Error> {
        self.provider
            .attempt_ledger()
            .record_attempt(username, client_address, succeeded, attempted_at)
            .await
    }

    async fn count_failures_since(
        &self,
        username: &str,
        client_address: &str,
        since: DateTime<Utc>,
    ) -> Result<u32, Error> {
        self.provider
            .attempt_ledger()
            .count_failures_since(username, client_address, since)
            .await
    }

    async fn cleanup_attempts_before(&self, before: DateTime<Utc>) -> Result<u64, Error> {
        self.provider
            .attempt_ledger()
            .cleanup_attempts_before(before)
            .await
    }
}

pub struct VerificationCodeRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> VerificationCodeRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> VerificationCodeRepository for VerificationCodeRepositoryAdapter<R> {
    async fn create_code(&self, code: NewVerificationCode) -> Result<VerificationCode, Error> {
        self.provider.verification_code().create_code(code).await
    }

    async fn latest_for_account(
        &self,
        account_id: &AccountId,
    ) -> Result<Option<VerificationCode>, Error> {
        self.provider
            .verification_code()
            .latest_for_account(account_id)
            .await
    }

    async fn find_code(&self, id: i64) -> Result<Option<VerificationCode>, Error> {
        self.provider.verification_code().find_code(id).await
    }

    async fn register_attempt(&self, id: i64) -> Result<Option<u32>, Error> {
        self.provider.verification_code().register_attempt(id).await
    }

    async fn mark_used(&self, id: i64) -> Result<bool, Error> {
        self.provider.verification_code().mark_used(id).await
    }

    async fn cleanup_codes_before(&self, before: DateTime<Utc>) -> Result<u64, Error> {
        self.provider
            .verification_code()
            .cleanup_codes_before(before)
            .await
    }
}

pub struct ResetTokenRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> ResetTokenRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> ResetTokenRepository for ResetTokenRepositoryAdapter<R> {
    async fn create_token(
        &self,
        account_id: &AccountId,
        token_hash: &str,
        created_at: DateTime<Utc>,
    ) -> Result<ResetToken, Error> {
        self.provider
            .reset_token()
            .create_token(account_id, token_hash, created_at)
            .await
    }

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<ResetToken>, Error> {
        self.provider.reset_token().find_by_hash(token_hash).await
    }

    async fn claim(&self, id: i64) -> Result<bool, Error> {
        self.provider.reset_token().claim(id).await
    }

    async fn release(&self, id: i64) -> Result<(), Error> {
        self.provider.reset_token().release(id).await
    }

    async fn cleanup_tokens_before(&self, before: DateTime<Utc>) -> Result<u64, Error> {
        self.provider
            .reset_token()
            .cleanup_tokens_before(before)
            .await
    }
}

pub struct AuditRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> AuditRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> AuditRepository for AuditRepositoryAdapter<R> {
    async fn record_event(&self, event: NewSecurityEvent) -> Result<SecurityEvent, Error> {
        self.provider.audit().record_event(event).await
    }

    async fn recent_events(&self, limit: u32) -> Result<Vec<SecurityEvent>, Error> {
        self.provider.audit().recent_events(limit).await
    }
}
