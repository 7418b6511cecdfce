//! Repository trait for the security audit trail.

use async_trait::async_trait;

use crate::{
    Error,
    storage::{NewSecurityEvent, SecurityEvent},
};

#[async_trait]
pub trait AuditRepository: Send + Sync + 'static {
    async fn record_event(&self, event: NewSecurityEvent) -> Result<SecurityEvent, Error>;

    /// Newest first. For forensic review only; no security decision reads this.
    async fn recent_events(&self, limit: u32) -> Result<Vec<SecurityEvent>, Error>;
}
