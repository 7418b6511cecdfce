//! The external credential store.
//!
//! Password hashing, account records and role storage live behind this trait.
//! The security services only ever ask it yes/no questions and hand it
//! already-validated changes.

use async_trait::async_trait;

use crate::{Account, AccountId, Error, IssuedSession, Role};

#[async_trait]
pub trait CredentialStore: Send + Sync + 'static {
    /// Check `password` for `username` and mint a session token.
    ///
    /// Unknown usernames and wrong passwords both yield
    /// [`AuthError::InvalidCredentials`](crate::error::AuthError::InvalidCredentials).
    /// Any other error is an infrastructure fault.
    async fn verify_and_issue(&self, username: &str, password: &str)
    -> Result<IssuedSession, Error>;

    /// Resolve a username or email address to an account.
    async fn find_account(&self, identifier: &str) -> Result<Option<Account>, Error>;

    /// Exact username match. Email addresses never resolve here.
    async fn find_account_by_username(&self, username: &str) -> Result<Option<Account>, Error>;

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, Error>;

    async fn get_account(&self, account_id: &AccountId) -> Result<Option<Account>, Error>;

    async fn change_password(&self, account_id: &AccountId, new_password: &str)
    -> Result<(), Error>;

    async fn is_email_verified(&self, account_id: &AccountId) -> Result<bool, Error>;

    async fn set_email_verified(&self, account_id: &AccountId) -> Result<(), Error>;

    /// The account's role. An unknown or missing role is
    /// [`AuthError::RoleLookupFailed`](crate::error::AuthError::RoleLookupFailed).
    async fn resolve_role(&self, account_id: &AccountId) -> Result<Role, Error>;
}
