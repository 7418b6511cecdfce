//! Audit log service.
//!
//! Writes are best effort from the caller's point of view: a failing sink never
//! changes the outcome of the security decision being recorded. Failures are
//! logged under the `bastion::audit` target and counted so monitoring can
//! alert on them.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use crate::{
    AccountId, Error,
    context::Clock,
    repositories::AuditRepository,
    storage::{EventMetadata, NewSecurityEvent, SecurityEvent, SecurityEventKind},
};

pub struct AuditLogService<R: AuditRepository> {
    repository: Arc<R>,
    clock: Arc<dyn Clock>,
    failed_writes: AtomicU64,
}

impl<R: AuditRepository> AuditLogService<R> {
    pub fn new(repository: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            clock,
            failed_writes: AtomicU64::new(0),
        }
    }

    /// Append an event. Never fails.
    pub async fn record_event(
        &self,
        account_id: Option<&AccountId>,
        client_address: &str,
        kind: SecurityEventKind,
        metadata: EventMetadata,
    ) {
        tracing::warn!(
            kind = %kind,
            account_id = account_id.map(|id| id.as_str()),
            client_address = %client_address,
            "Security event"
        );

        let event = NewSecurityEvent {
            account_id: account_id.cloned(),
            client_address: client_address.to_string(),
            kind,
            metadata,
            created_at: self.clock.now(),
        };

        if let Err(e) = self.repository.record_event(event).await {
            let total = self.failed_writes.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::error!(
                target: "bastion::audit",
                error = %e,
                kind = %kind,
                failed_writes = total,
                "Failed to write security event"
            );
        }
    }

    /// Number of events that could not be written since start-up.
    pub fn failed_writes(&self) -> u64 {
        self.failed_writes.load(Ordering::Relaxed)
    }

    pub async fn recent_events(&self, limit: u32) -> Result<Vec<SecurityEvent>, Error> {
        self.repository.recent_events(limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{context::SystemClock, services::testing::MockAuditRepository};

    #[tokio::test]
    async fn test_record_event_persists() {
        let repo = Arc::new(MockAuditRepository::new());
        let service = AuditLogService::new(repo.clone(), Arc::new(SystemClock));

        let mut metadata = EventMetadata::new();
        metadata.insert("username".to_string(), "alice".into());
        service
            .record_event(
                Some(&AccountId::new("acct_alice")),
                "203.0.113.7",
                SecurityEventKind::LoginBruteforceBlocked,
                metadata,
            )
            .await;

        let events = service.recent_events(10).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, SecurityEventKind::LoginBruteforceBlocked);
        assert_eq!(events[0].metadata["username"], "alice");
        assert_eq!(service.failed_writes(), 0);
    }

    #[tokio::test]
    async fn test_sink_failure_is_counted_not_raised() {
        let repo = Arc::new(MockAuditRepository::new());
        repo.set_failing(true);
        let service = AuditLogService::new(repo.clone(), Arc::new(SystemClock));

        service
            .record_event(
                None,
                "203.0.113.7",
                SecurityEventKind::EmailCodeInvalidOrExpired,
                EventMetadata::new(),
            )
            .await;
        service
            .record_event(
                None,
                "203.0.113.7",
                SecurityEventKind::EmailCodeInvalidOrExpired,
                EventMetadata::new(),
            )
            .await;

        assert_eq!(service.failed_writes(), 2);
        assert!(repo.events().is_empty());
    }
}
