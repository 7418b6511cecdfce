//! Retention cleanup for attempts, codes and tokens.

use std::sync::Arc;

use bastion_core::{
    Error,
    repositories::{
        AttemptLedgerRepositoryAdapter, AuditRepositoryAdapter, RepositoryProvider,
        ResetTokenRepositoryAdapter, VerificationCodeRepositoryAdapter,
    },
    services::{AttemptLedgerService, ResetTokenService, VerificationCodeService},
};
use chrono::Duration;
use tokio::{sync::watch, task::JoinHandle};

/// Rows deleted by one maintenance pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub login_attempts: u64,
    pub verification_codes: u64,
    pub reset_tokens: u64,
}

impl MaintenanceReport {
    pub fn total(&self) -> u64 {
        self.login_attempts + self.verification_codes + self.reset_tokens
    }
}

pub struct Maintenance<R: RepositoryProvider> {
    ledger: Arc<AttemptLedgerService<AttemptLedgerRepositoryAdapter<R>>>,
    verification: Arc<
        VerificationCodeService<VerificationCodeRepositoryAdapter<R>, AuditRepositoryAdapter<R>>,
    >,
    reset: Arc<ResetTokenService<ResetTokenRepositoryAdapter<R>>>,
    retention: Duration,
}

impl<R: RepositoryProvider> Clone for Maintenance<R> {
    fn clone(&self) -> Self {
        Self {
            ledger: self.ledger.clone(),
            verification: self.verification.clone(),
            reset: self.reset.clone(),
            retention: self.retention,
        }
    }
}

impl<R: RepositoryProvider> Maintenance<R> {
    pub(crate) fn new(
        ledger: Arc<AttemptLedgerService<AttemptLedgerRepositoryAdapter<R>>>,
        verification: Arc<
            VerificationCodeService<
                VerificationCodeRepositoryAdapter<R>,
                AuditRepositoryAdapter<R>,
            >,
        >,
        reset: Arc<ResetTokenService<ResetTokenRepositoryAdapter<R>>>,
        retention: Duration,
    ) -> Self {
        Self {
            ledger,
            verification,
            reset,
            retention,
        }
    }

    /// Codes and tokens are kept for their expiry plus this long.
    pub fn retention(&self) -> Duration {
        self.retention
    }

    pub async fn run_once(&self) -> Result<MaintenanceReport, Error> {
        let report = MaintenanceReport {
            login_attempts: self.ledger.cleanup().await?,
            verification_codes: self.verification.cleanup(self.retention).await?,
            reset_tokens: self.reset.cleanup(self.retention).await?,
        };

        if report.total() > 0 {
            tracing::info!(
                login_attempts = report.login_attempts,
                verification_codes = report.verification_codes,
                reset_tokens = report.reset_tokens,
                "Cleaned up expired security records"
            );
        }
        Ok(report)
    }

    /// Run [`Maintenance::run_once`] every `period` until `shutdown` changes.
    pub fn start(
        &self,
        period: std::time::Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let maintenance = self.clone();

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(period);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        if let Err(e) = maintenance.run_once().await {
                            tracing::warn!(error = %e, "Security record cleanup failed");
                        }
                    }
                    _ = shutdown.changed() => {
                        tracing::info!("Shutting down security record cleanup task");
                        break;
                    }
                }
            }
        })
    }
}

/// Cleanup runs hourly by default.
pub const DEFAULT_MAINTENANCE_INTERVAL: std::time::Duration = std::time::Duration::from_secs(3600);
