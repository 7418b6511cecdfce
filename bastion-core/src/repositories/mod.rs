//! Repository traits for the data access layer
//!
//! Services talk to storage only through these traits.
//!
//! # Trait Hierarchy
//!
//! - Individual `*Repository` traits define the operations for each record type
//! - Individual `*RepositoryProvider` traits hand out each repository
//! - [`RepositoryProvider`] combines them with lifecycle methods
//!
//! The `*RepositoryAdapter` types in [`adapter`] turn an `Arc<R: RepositoryProvider>`
//! back into a single repository, which is what the services are generic over.

pub mod adapter;
pub mod attempt_ledger;
pub mod audit;
pub mod reset_token;
pub mod verification_code;

pub use adapter::{
    AttemptLedgerRepositoryAdapter, AuditRepositoryAdapter, ResetTokenRepositoryAdapter,
    VerificationCodeRepositoryAdapter,
};
pub use attempt_ledger::AttemptLedgerRepository;
pub use audit::AuditRepository;
pub use reset_token::ResetTokenRepository;
pub use verification_code::VerificationCodeRepository;

use async_trait::async_trait;

use crate::Error;

pub trait AttemptLedgerRepositoryProvider: Send + Sync + 'static {
    type AttemptLedgerRepo: AttemptLedgerRepository;

    fn attempt_ledger(&self) -> &Self::AttemptLedgerRepo;
}

pub trait VerificationCodeRepositoryProvider: Send + Sync + 'static {
    type VerificationCodeRepo: VerificationCodeRepository;

    fn verification_code(&self) -> &Self::VerificationCodeRepo;
}

pub trait ResetTokenRepositoryProvider: Send + Sync + 'static {
    type ResetTokenRepo: ResetTokenRepository;

    fn reset_token(&self) -> &Self::ResetTokenRepo;
}

pub trait AuditRepositoryProvider: Send + Sync + 'static {
    type AuditRepo: AuditRepository;

    fn audit(&self) -> &Self::AuditRepo;
}

/// Everything a storage backend must provide.
///
/// # Example
///
/// ```rust,ignore
/// use bastion_core::repositories::*;
///
/// struct MyStorage { /* ... */ }
///
/// impl AuditRepositoryProvider for MyStorage {
///     type AuditRepo = MyAuditRepository;
///     fn audit(&self) -> &Self::AuditRepo { &self.audit_repo }
/// }
///
/// // ... implement the other provider traits ...
///
/// #[async_trait]
/// impl RepositoryProvider for MyStorage {
///     async fn migrate(&self) -> Result<(), Error> { /* ... */ }
///     async fn health_check(&self) -> Result<(), Error> { /* ... */ }
/// }
/// ```
#[async_trait]
pub trait RepositoryProvider:
    AttemptLedgerRepositoryProvider
    + VerificationCodeRepositoryProvider
    + ResetTokenRepositoryProvider
    + AuditRepositoryProvider
{
    /// Apply any pending schema migrations
    async fn migrate(&self) -> Result<(), Error>;

    async fn health_check(&self) -> Result<(), Error>;
}
