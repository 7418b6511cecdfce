//! Repository trait for password reset tokens.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{AccountId, Error, storage::ResetToken};

/// Storage for reset tokens, keyed by the SHA-256 hex digest of the raw token.
#[async_trait]
pub trait ResetTokenRepository: Send + Sync + 'static {
    async fn create_token(
        &self,
        account_id: &AccountId,
        token_hash: &str,
        created_at: DateTime<Utc>,
    ) -> Result<ResetToken, Error>;

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<ResetToken>, Error>;

    /// Conditionally flip `used` from false to true.
    ///
    /// Returns `true` for exactly one caller per token.
    async fn claim(&self, id: i64) -> Result<bool, Error>;

    /// Undo a [`claim`](ResetTokenRepository::claim) whose follow-up work failed.
    async fn release(&self, id: i64) -> Result<(), Error>;

    async fn cleanup_tokens_before(&self, before: DateTime<Utc>) -> Result<u64, Error>;
}
