//! Repository trait for the login attempt ledger.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{Error, storage::LoginAttempt};

/// Append-only log of login attempts.
///
/// Rows are never updated. Deletion only happens through
/// [`cleanup_attempts_before`](AttemptLedgerRepository::cleanup_attempts_before)
/// as part of retention maintenance.
#[async_trait]
pub trait AttemptLedgerRepository: Send + Sync + 'static {
    /// Append one attempt and return the stored row.
    async fn record_attempt(
        &self,
        username: &str,
        client_address: &str,
        succeeded: bool,
        attempted_at: DateTime<Utc>,
    ) -> Result<LoginAttempt, Error>;

    /// Count failed attempts at or after `since` whose username equals
    /// `username` OR whose client address equals `client_address`.
    async fn count_failures_since(
        &self,
        username: &str,
        client_address: &str,
        since: DateTime<Utc>,
    ) -> Result<u32, Error>;

    /// Delete attempts older than `before`. Returns the number of rows removed.
    async fn cleanup_attempts_before(&self, before: DateTime<Utc>) -> Result<u64, Error>;
}
