//! Service layer
//!
//! The five security services. Each is generic over the repository it owns and
//! receives its configuration and collaborators at construction.

pub mod attempt_ledger;
pub mod audit_log;
pub mod auth_gate;
pub mod mailer;
pub mod reset_token;
pub mod verification_code;

#[cfg(test)]
pub(crate) mod testing;

pub use attempt_ledger::AttemptLedgerService;
pub use audit_log::AuditLogService;
pub use auth_gate::{AuthGate, LoginRequest};
pub use reset_token::ResetTokenService;
pub use verification_code::{CodeRequested, VerificationCodeService};

#[cfg(feature = "mailer")]
pub use mailer::MailerNotifier;
