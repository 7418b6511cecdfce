//! SQLite implementation of the security audit trail.

use async_trait::async_trait;
use bastion_core::{
    AccountId, Error,
    error::{StorageError, utilities::StorageResultExt},
    repositories::AuditRepository,
    storage::{EventMetadata, NewSecurityEvent, SecurityEvent},
};
use chrono::DateTime;
use sqlx::SqlitePool;

pub struct SqliteAuditRepository {
    pool: SqlitePool,
}

impl SqliteAuditRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SqliteSecurityEvent {
    id: i64,
    account_id: Option<String>,
    client_address: String,
    kind: String,
    metadata: String,
    created_at: i64,
}

impl TryFrom<SqliteSecurityEvent> for SecurityEvent {
    type Error = Error;

    fn try_from(row: SqliteSecurityEvent) -> Result<Self, Self::Error> {
        let metadata: EventMetadata = serde_json::from_str(&row.metadata).map_err(|e| {
            tracing::error!(error = %e, event_id = row.id, "Stored event metadata is not valid JSON");
            StorageError::Database("Corrupt security event metadata".to_string())
        })?;

        Ok(SecurityEvent {
            id: row.id,
            account_id: row.account_id.map(AccountId::from),
            client_address: row.client_address,
            kind: row.kind.parse()?,
            metadata,
            created_at: DateTime::from_timestamp(row.created_at, 0).unwrap_or_default(),
        })
    }
}

#[async_trait]
impl AuditRepository for SqliteAuditRepository {
    async fn record_event(&self, event: NewSecurityEvent) -> Result<SecurityEvent, Error> {
        let metadata = serde_json::to_string(&event.metadata)
            .map_storage_err("Failed to encode security event metadata")?;

        let row = sqlx::query_as::<_, SqliteSecurityEvent>(
            r#"
            INSERT INTO security_events (account_id, client_address, kind, metadata, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id, account_id, client_address, kind, metadata, created_at
            "#,
        )
        .bind(event.account_id.as_ref().map(AccountId::as_str))
        .bind(&event.client_address)
        .bind(event.kind.as_str())
        .bind(metadata)
        .bind(event.created_at.timestamp())
        .fetch_one(&self.pool)
        .await
        .map_storage_err("Failed to record security event")?;

        row.try_into()
    }

    async fn recent_events(&self, limit: u32) -> Result<Vec<SecurityEvent>, Error> {
        let rows = sqlx::query_as::<_, SqliteSecurityEvent>(
            r#"
            SELECT id, account_id, client_address, kind, metadata, created_at
            FROM security_events
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_storage_err("Failed to load security events")?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_pool;
    use bastion_core::storage::SecurityEventKind;
    use chrono::Utc;

    fn event(kind: SecurityEventKind, account: Option<&str>) -> NewSecurityEvent {
        let mut metadata = EventMetadata::new();
        metadata.insert("username".to_string(), serde_json::json!("alice"));
        NewSecurityEvent {
            account_id: account.map(AccountId::new),
            client_address: "10.0.0.1".to_string(),
            kind,
            metadata,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_record_event() {
        let repo = SqliteAuditRepository::new(test_pool().await);

        let stored = repo
            .record_event(event(SecurityEventKind::LoginBruteforceBlocked, Some("acct_alice")))
            .await
            .unwrap();

        assert_eq!(stored.kind, SecurityEventKind::LoginBruteforceBlocked);
        assert_eq!(stored.account_id, Some(AccountId::new("acct_alice")));
        assert_eq!(stored.metadata["username"], serde_json::json!("alice"));
    }

    #[tokio::test]
    async fn test_event_without_account() {
        let repo = SqliteAuditRepository::new(test_pool().await);

        let stored = repo
            .record_event(event(SecurityEventKind::EmailCodeInvalidOrExpired, None))
            .await
            .unwrap();
        assert!(stored.account_id.is_none());
    }

    #[tokio::test]
    async fn test_recent_events_newest_first() {
        let repo = SqliteAuditRepository::new(test_pool().await);

        repo.record_event(event(SecurityEventKind::LoginUnverifiedEmail, None))
            .await
            .unwrap();
        repo.record_event(event(SecurityEventKind::EmailCodeMaxAttempts, None))
            .await
            .unwrap();
        repo.record_event(event(SecurityEventKind::LoginBruteforceBlocked, None))
            .await
            .unwrap();

        let events = repo.recent_events(2).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, SecurityEventKind::LoginBruteforceBlocked);
        assert_eq!(events[1].kind, SecurityEventKind::EmailCodeMaxAttempts);
    }
}
