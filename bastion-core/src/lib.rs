//! Core of the bastion account security layer.
//!
//! This crate holds the domain types, the error taxonomy, configuration, and
//! the security services:
//!
//! - [`AttemptLedgerService`](services::AttemptLedgerService) throttles logins per username and address
//! - [`VerificationCodeService`](services::VerificationCodeService) proves email ownership with short numeric codes
//! - [`ResetTokenService`](services::ResetTokenService) issues and consumes single-use password reset tokens
//! - [`AuditLogService`](services::AuditLogService) records suspicious activity
//! - [`AuthGate`](services::AuthGate) runs a login through all of the above
//!
//! Storage backends implement the traits in [`repositories`]. The credential
//! store, password policy and notifier are collaborators supplied by the
//! application; see [`credentials`], [`validation`] and [`notification`].
pub mod account;
pub mod config;
pub mod context;
pub mod credentials;
pub mod crypto;
pub mod error;
pub mod id;
pub mod notification;
pub mod repositories;
pub mod role;
pub mod services;
pub mod session;
pub mod storage;
pub mod validation;

pub use account::{Account, AccountId, IssuedSession};
pub use config::SecurityConfig;
pub use context::{Clock, ManualClock, RequestContext, SystemClock};
pub use credentials::CredentialStore;
pub use error::Error;
pub use notification::{Notification, Notifier};
pub use repositories::RepositoryProvider;
pub use role::Role;
pub use session::{JwtConfig, SessionClaims};
pub use validation::{DefaultPasswordPolicy, PasswordPolicy};
