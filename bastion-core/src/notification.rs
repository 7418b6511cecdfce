//! Out-of-band delivery of codes and reset links.
//!
//! Delivery is best effort. [`dispatch`] runs the notifier on its own task
//! under a timeout so the calling request never waits on it, and failures end
//! up in the log rather than in the response.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::error::DispatchError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    VerificationCode {
        username: String,
        code: String,
        expires_in_minutes: i64,
    },
    PasswordReset {
        username: String,
        token: String,
        expires_in_hours: i64,
    },
}

impl Notification {
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::VerificationCode { .. } => "verification_code",
            Notification::PasswordReset { .. } => "password_reset",
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn notify(&self, to: &str, notification: Notification) -> Result<(), DispatchError>;
}

/// Discards everything. For deployments that deliver codes another way.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, to: &str, notification: Notification) -> Result<(), DispatchError> {
        tracing::debug!(to = %to, kind = notification.kind(), "Notification discarded");
        Ok(())
    }
}

/// Fire-and-forget delivery bounded by `timeout`.
pub fn dispatch(
    notifier: Arc<dyn Notifier>,
    to: String,
    notification: Notification,
    timeout: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let kind = notification.kind();
        match tokio::time::timeout(timeout, notifier.notify(&to, notification)).await {
            Ok(Ok(())) => {
                tracing::debug!(kind = kind, "Notification delivered");
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, kind = kind, "Notification delivery failed");
            }
            Err(_) => {
                tracing::warn!(
                    error = %DispatchError::Timeout,
                    kind = kind,
                    timeout_ms = timeout.as_millis() as u64,
                    "Notification delivery timed out"
                );
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowNotifier;

    #[async_trait]
    impl Notifier for SlowNotifier {
        async fn notify(&self, _to: &str, _n: Notification) -> Result<(), DispatchError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }
    }

    struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn notify(&self, _to: &str, _n: Notification) -> Result<(), DispatchError> {
            Err(DispatchError::Delivery("smtp down".to_string()))
        }
    }

    fn code() -> Notification {
        Notification::VerificationCode {
            username: "alice".to_string(),
            code: "123456".to_string(),
            expires_in_minutes: 15,
        }
    }

    #[tokio::test]
    async fn test_dispatch_times_out_without_panicking() {
        let handle = dispatch(
            Arc::new(SlowNotifier),
            "alice@example.com".to_string(),
            code(),
            Duration::from_millis(20),
        );
        assert!(handle.await.is_ok());
    }

    #[tokio::test]
    async fn test_dispatch_swallows_failures() {
        let handle = dispatch(
            Arc::new(FailingNotifier),
            "alice@example.com".to_string(),
            code(),
            Duration::from_secs(1),
        );
        assert!(handle.await.is_ok());
    }

    #[tokio::test]
    async fn test_noop_notifier() {
        assert!(NoopNotifier.notify("a@example.com", code()).await.is_ok());
        assert_eq!(code().kind(), "verification_code");
    }
}
