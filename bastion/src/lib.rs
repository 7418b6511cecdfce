//! # Bastion
//!
//! Bastion is the account security layer that sits between a login form and a
//! credential store. It throttles password guessing, proves email ownership
//! with short numeric codes, runs single-use password resets, and keeps an
//! audit trail of suspicious activity.
//!
//! The credential store (password hashes, account records, roles) is a
//! collaborator. Bastion asks it yes/no questions and never stores passwords
//! itself. A SQLite credential store ships with the `sqlite` feature.
//!
//! ## Example
//!
//! ```rust,no_run
//! use bastion::{BastionBuilder, JwtConfig, LoginRequest, RequestContext};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bastion = BastionBuilder::new()
//!         .with_sqlite("sqlite::memory:")
//!         .await?
//!         .with_jwt(JwtConfig::new_hs256(b"a-secret-of-at-least-thirty-two-bytes!".to_vec()))
//!         .apply_migrations(true)
//!         .build()
//!         .await?;
//!
//!     let ctx = RequestContext::new("203.0.113.7");
//!     let session = bastion
//!         .login(&LoginRequest::new("alice", "correct horse"), &ctx)
//!         .await?;
//!     println!("{}", session.token);
//!     Ok(())
//! }
//! ```
use std::sync::Arc;

use bastion_core::{
    repositories::{
        AttemptLedgerRepositoryAdapter, AuditRepositoryAdapter, ResetTokenRepositoryAdapter,
        VerificationCodeRepositoryAdapter,
    },
    services::{
        AttemptLedgerService, AuditLogService, AuthGate, ResetTokenService,
        VerificationCodeService,
    },
    session::decode_session,
    storage::SecurityEvent,
};

pub mod builder;
pub mod maintenance;

pub use builder::{BastionBuilder, BastionBuilderError};
pub use maintenance::{DEFAULT_MAINTENANCE_INTERVAL, Maintenance, MaintenanceReport};

/// Re-export core types from bastion_core
pub use bastion_core::{
    Account, AccountId, Clock, CredentialStore, DefaultPasswordPolicy, Error, IssuedSession,
    JwtConfig, ManualClock, Notification, Notifier, PasswordPolicy, RequestContext, Role,
    SecurityConfig, SessionClaims, SystemClock,
    error::AuthError,
    notification::NoopNotifier,
    repositories::RepositoryProvider,
    services::{CodeRequested, LoginRequest},
};

#[cfg(feature = "mailer")]
pub use bastion_core::services::MailerNotifier;
#[cfg(feature = "mailer")]
pub use bastion_mailer::MailerConfig;

#[cfg(feature = "sqlite")]
pub use bastion_storage_sqlite::{SqliteCredentialStore, SqliteRepositoryProvider};

type Gate<R> = AuthGate<AttemptLedgerRepositoryAdapter<R>, AuditRepositoryAdapter<R>>;
type CodeService<R> =
    VerificationCodeService<VerificationCodeRepositoryAdapter<R>, AuditRepositoryAdapter<R>>;

/// The wired security layer.
///
/// Every method returns [`bastion_core::Error`]. The [`AuthError`] variants are
/// the expected outcomes a client may see; anything else is an infrastructure
/// fault and must be treated as a denial.
pub struct Bastion<R: RepositoryProvider> {
    repositories: Arc<R>,
    gate: Arc<Gate<R>>,
    verification: Arc<CodeService<R>>,
    reset: Arc<ResetTokenService<ResetTokenRepositoryAdapter<R>>>,
    audit: Arc<AuditLogService<AuditRepositoryAdapter<R>>>,
    maintenance: Maintenance<R>,
    jwt: JwtConfig,
    config: SecurityConfig,
}

/// Collaborators and settings for [`Bastion::new`].
pub struct BastionParts {
    pub credentials: Arc<dyn CredentialStore>,
    pub notifier: Arc<dyn Notifier>,
    pub policy: Arc<dyn PasswordPolicy>,
    pub clock: Arc<dyn Clock>,
    pub jwt: JwtConfig,
    pub config: SecurityConfig,
}

impl<R: RepositoryProvider> Bastion<R> {
    /// Wire every service over `repositories`.
    ///
    /// Most callers want [`BastionBuilder`] instead.
    pub fn new(repositories: Arc<R>, parts: BastionParts) -> Self {
        let BastionParts {
            credentials,
            notifier,
            policy,
            clock,
            jwt,
            config,
        } = parts;

        let ledger = Arc::new(AttemptLedgerService::new(
            Arc::new(AttemptLedgerRepositoryAdapter::new(repositories.clone())),
            config.attempt_ledger.clone(),
            clock.clone(),
        ));
        let audit = Arc::new(AuditLogService::new(
            Arc::new(AuditRepositoryAdapter::new(repositories.clone())),
            clock.clone(),
        ));
        let verification = Arc::new(VerificationCodeService::new(
            Arc::new(VerificationCodeRepositoryAdapter::new(repositories.clone())),
            audit.clone(),
            credentials.clone(),
            notifier.clone(),
            config.verification_code.clone(),
            config.dispatch.clone(),
            clock.clone(),
        ));
        let reset = Arc::new(ResetTokenService::new(
            Arc::new(ResetTokenRepositoryAdapter::new(repositories.clone())),
            credentials.clone(),
            policy,
            notifier,
            config.reset_token.clone(),
            config.dispatch.clone(),
            clock,
        ));
        let gate = Arc::new(AuthGate::new(ledger.clone(), audit.clone(), credentials));

        let maintenance = Maintenance::new(
            ledger,
            verification.clone(),
            reset.clone(),
            config.attempt_ledger.retention_period,
        );

        Self {
            repositories,
            gate,
            verification,
            reset,
            audit,
            maintenance,
            jwt,
            config,
        }
    }

    pub fn config(&self) -> &SecurityConfig {
        &self.config
    }

    pub fn jwt_config(&self) -> &JwtConfig {
        &self.jwt
    }

    pub async fn migrate(&self) -> Result<(), Error> {
        self.repositories.migrate().await
    }

    pub async fn health_check(&self) -> Result<(), Error> {
        self.repositories.health_check().await
    }

    /// Authenticate a username and password, subject to throttling and the
    /// verified-email requirement.
    pub async fn login(
        &self,
        request: &LoginRequest,
        ctx: &RequestContext,
    ) -> Result<IssuedSession, Error> {
        self.gate.login(request, ctx).await
    }

    /// Send a verification code to the account named by `identifier`.
    ///
    /// Succeeds identically for unknown identifiers.
    pub async fn request_verification_code(&self, identifier: &str) -> Result<CodeRequested, Error> {
        self.verification.request_code(identifier).await
    }

    pub async fn resend_verification_code(&self, identifier: &str) -> Result<CodeRequested, Error> {
        self.verification.resend_code(identifier).await
    }

    pub async fn confirm_verification_code(
        &self,
        identifier: &str,
        code: &str,
        ctx: &RequestContext,
    ) -> Result<(), Error> {
        self.verification.confirm_code(identifier, code, ctx).await
    }

    /// Issue a reset token for `email` if the account is eligible.
    ///
    /// Succeeds identically whether or not a token was issued.
    pub async fn request_password_reset(&self, email: &str) -> Result<(), Error> {
        self.reset.request_reset(email).await
    }

    pub async fn confirm_password_reset(&self, token: &str, new_password: &str) -> Result<(), Error> {
        self.reset.confirm_reset(token, new_password).await
    }

    /// Decode and verify a session token minted by [`Bastion::login`].
    pub fn verify_session(&self, token: &str) -> Result<SessionClaims, Error> {
        decode_session(token, &self.jwt)
    }

    pub async fn resolve_role(&self, account_id: &AccountId) -> Result<Role, Error> {
        self.gate.resolve_role(account_id).await
    }

    /// Resolve the account's role and fail with `InsufficientRole` unless it is in `allowed`.
    pub async fn require_role(&self, account_id: &AccountId, allowed: &[Role]) -> Result<Role, Error> {
        self.gate.require_role(account_id, allowed).await
    }

    /// Newest audit events first, for forensic review.
    pub async fn recent_security_events(&self, limit: u32) -> Result<Vec<SecurityEvent>, Error> {
        self.audit.recent_events(limit).await
    }

    /// Audit writes that failed since start-up.
    pub fn audit_failures(&self) -> u64 {
        self.audit.failed_writes()
    }

    pub fn maintenance(&self) -> &Maintenance<R> {
        &self.maintenance
    }

    /// Delete expired attempts, codes and tokens once.
    pub async fn run_maintenance(&self) -> Result<MaintenanceReport, Error> {
        self.maintenance.run_once().await
    }
}
