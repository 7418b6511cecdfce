//! Time and caller identity.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use crate::error::{AuthError, utilities::RequiredFieldExt};

/// Source of the current instant. All expiry and window arithmetic goes through this.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = to;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Who is calling, as far as the transport can tell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub client_address: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestContext {
    pub fn new(client_address: impl Into<String>) -> Self {
        Self {
            client_address: Some(client_address.into()),
            user_agent: None,
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// The client address, or `InvalidRequest` when the transport could not supply one.
    pub fn require_client_address(&self) -> Result<String, AuthError> {
        self.client_address.as_deref().require_field("client address")
    }

    /// Address for audit records, where a missing value is recorded rather than rejected.
    pub fn audit_address(&self) -> &str {
        self.client_address.as_deref().unwrap_or("unknown")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let start = Utc::now();
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::minutes(16));
        assert_eq!(clock.now(), start + Duration::minutes(16));

        clock.set(start);
        assert_eq!(clock.now(), start);
    }

    #[test]
    fn test_require_client_address() {
        let ctx = RequestContext::new("203.0.113.7");
        assert_eq!(ctx.require_client_address().unwrap(), "203.0.113.7");

        let ctx = RequestContext::default();
        assert!(matches!(
            ctx.require_client_address(),
            Err(AuthError::InvalidRequest(_))
        ));
        assert_eq!(ctx.audit_address(), "unknown");
    }
}
