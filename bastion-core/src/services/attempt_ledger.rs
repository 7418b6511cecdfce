//! Login throttling.
//!
//! A `(username, client_address)` pair is blocked while the number of failed
//! attempts matching *either* the username *or* the address within the
//! trailing window is at or above the threshold. One noisy address throttles
//! every username it tries, and one targeted username is throttled from every
//! address.
//!
//! The check and the subsequent record are not serialised, so two concurrent
//! attempts can both pass the check. The limit is soft by that margin.

use std::sync::Arc;

use crate::{
    Error, config::AttemptLedgerConfig, context::Clock, repositories::AttemptLedgerRepository,
    storage::LoginAttempt,
};

pub struct AttemptLedgerService<R: AttemptLedgerRepository> {
    repository: Arc<R>,
    config: AttemptLedgerConfig,
    clock: Arc<dyn Clock>,
}

impl<R: AttemptLedgerRepository> AttemptLedgerService<R> {
    pub fn new(repository: Arc<R>, config: AttemptLedgerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            config,
            clock,
        }
    }

    pub fn config(&self) -> &AttemptLedgerConfig {
        &self.config
    }

    /// Whether a login for this pair must be rejected before any credential check.
    ///
    /// Storage errors propagate; callers must treat them as a denial.
    pub async fn is_blocked(&self, username: &str, client_address: &str) -> Result<bool, Error> {
        let since = self.clock.now() - self.config.window;
        let failures = self
            .repository
            .count_failures_since(username, client_address, since)
            .await?;

        let blocked = failures >= self.config.max_attempts;
        if blocked {
            tracing::info!(
                username = %username,
                client_address = %client_address,
                failures = failures,
                "Login throttled"
            );
        }
        Ok(blocked)
    }

    pub async fn record_attempt(
        &self,
        username: &str,
        client_address: &str,
        succeeded: bool,
    ) -> Result<LoginAttempt, Error> {
        self.repository
            .record_attempt(username, client_address, succeeded, self.clock.now())
            .await
    }

    /// Delete attempts older than the retention period.
    pub async fn cleanup(&self) -> Result<u64, Error> {
        let before = self.clock.now() - self.config.retention_period;
        self.repository.cleanup_attempts_before(before).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{context::ManualClock, services::testing::MockAttemptLedgerRepository};
    use chrono::{Duration, Utc};

    fn service(
        clock: Arc<ManualClock>,
    ) -> (
        Arc<MockAttemptLedgerRepository>,
        AttemptLedgerService<MockAttemptLedgerRepository>,
    ) {
        let repo = Arc::new(MockAttemptLedgerRepository::new());
        let service =
            AttemptLedgerService::new(repo.clone(), AttemptLedgerConfig::default(), clock);
        (repo, service)
    }

    #[tokio::test]
    async fn test_blocks_at_threshold() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let (_, ledger) = service(clock);

        for _ in 0..4 {
            ledger.record_attempt("alice", "10.0.0.1", false).await.unwrap();
        }
        assert!(!ledger.is_blocked("alice", "10.0.0.1").await.unwrap());

        ledger.record_attempt("alice", "10.0.0.1", false).await.unwrap();
        assert!(ledger.is_blocked("alice", "10.0.0.1").await.unwrap());
    }

    #[tokio::test]
    async fn test_successes_do_not_count() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let (_, ledger) = service(clock);

        for _ in 0..10 {
            ledger.record_attempt("alice", "10.0.0.1", true).await.unwrap();
        }
        assert!(!ledger.is_blocked("alice", "10.0.0.1").await.unwrap());
    }

    #[tokio::test]
    async fn test_or_semantics() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let (_, ledger) = service(clock);

        // One address spraying different usernames
        for i in 0..5 {
            ledger
                .record_attempt(&format!("user{i}"), "10.0.0.9", false)
                .await
                .unwrap();
        }
        assert!(ledger.is_blocked("carol", "10.0.0.9").await.unwrap());

        // One username attacked from different addresses
        for i in 0..5 {
            ledger
                .record_attempt("bob", &format!("192.0.2.{i}"), false)
                .await
                .unwrap();
        }
        assert!(ledger.is_blocked("bob", "198.51.100.1").await.unwrap());
        assert!(!ledger.is_blocked("dave", "198.51.100.1").await.unwrap());
    }

    #[tokio::test]
    async fn test_window_slides() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let (_, ledger) = service(clock.clone());

        for _ in 0..5 {
            ledger.record_attempt("alice", "10.0.0.1", false).await.unwrap();
        }
        assert!(ledger.is_blocked("alice", "10.0.0.1").await.unwrap());

        clock.advance(Duration::minutes(15) + Duration::seconds(1));
        assert!(!ledger.is_blocked("alice", "10.0.0.1").await.unwrap());
    }

    #[tokio::test]
    async fn test_storage_failure_propagates() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let (repo, ledger) = service(clock);
        repo.set_failing(true);

        assert!(ledger.is_blocked("alice", "10.0.0.1").await.is_err());
        assert!(ledger.record_attempt("alice", "10.0.0.1", false).await.is_err());
    }

    #[tokio::test]
    async fn test_cleanup_respects_retention() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let (repo, ledger) = service(clock.clone());

        ledger.record_attempt("alice", "10.0.0.1", false).await.unwrap();
        clock.advance(Duration::days(31));
        ledger.record_attempt("alice", "10.0.0.1", false).await.unwrap();

        assert_eq!(ledger.cleanup().await.unwrap(), 1);
        assert_eq!(repo.attempts().len(), 1);
    }
}
