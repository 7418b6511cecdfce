//! Repository trait for email verification codes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    AccountId, Error,
    storage::{NewVerificationCode, VerificationCode},
};

#[async_trait]
pub trait VerificationCodeRepository: Send + Sync + 'static {
    async fn create_code(&self, code: NewVerificationCode) -> Result<VerificationCode, Error>;

    /// The most recently created code for the account, whatever its state.
    async fn latest_for_account(
        &self,
        account_id: &AccountId,
    ) -> Result<Option<VerificationCode>, Error>;

    async fn find_code(&self, id: i64) -> Result<Option<VerificationCode>, Error>;

    /// Atomically increment `attempt_count` if the code is unused and still has
    /// budget left.
    ///
    /// Returns the new count, or `None` when the code is used, exhausted or gone.
    /// Implementations must perform the check and the increment as one
    /// conditional write so concurrent callers can never push the count past
    /// `max_attempts`.
    async fn register_attempt(&self, id: i64) -> Result<Option<u32>, Error>;

    /// Flip `used` from false to true. Returns `false` if it was already set.
    async fn mark_used(&self, id: i64) -> Result<bool, Error>;

    async fn cleanup_codes_before(&self, before: DateTime<Utc>) -> Result<u64, Error>;
}
