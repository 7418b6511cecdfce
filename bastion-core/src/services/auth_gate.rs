//! Login orchestration.
//!
//! Order of checks for every login:
//!
//! 1. username, password and client address must be present
//! 2. the attempt ledger must not be blocking the pair
//! 3. the credential store must accept the password
//! 4. the account's email must be verified
//!
//! Rejections at steps 3 and 4 both count as failed attempts. Storage faults at
//! any step abort the login.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;

use crate::{
    AccountId, Error, IssuedSession, Role,
    context::RequestContext,
    credentials::CredentialStore,
    error::{AuthError, utilities::RequiredFieldExt},
    repositories::{AttemptLedgerRepository, AuditRepository},
    services::{AttemptLedgerService, AuditLogService},
    storage::{EventMetadata, SecurityEventKind},
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl LoginRequest {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }
}

pub struct AuthGate<L: AttemptLedgerRepository, A: AuditRepository> {
    ledger: Arc<AttemptLedgerService<L>>,
    audit: Arc<AuditLogService<A>>,
    credentials: Arc<dyn CredentialStore>,
}

impl<L: AttemptLedgerRepository, A: AuditRepository> AuthGate<L, A> {
    pub fn new(
        ledger: Arc<AttemptLedgerService<L>>,
        audit: Arc<AuditLogService<A>>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            ledger,
            audit,
            credentials,
        }
    }

    pub async fn login(
        &self,
        request: &LoginRequest,
        ctx: &RequestContext,
    ) -> Result<IssuedSession, Error> {
        let username = request.username.as_deref().map(str::trim).require_field("username")?;
        let password = request.password.as_deref().require_field("password")?;
        let client_address = ctx.require_client_address()?;

        if self.ledger.is_blocked(&username, &client_address).await? {
            let owner = match self.credentials.find_account_by_username(&username).await {
                Ok(account) => account.map(|a| a.id),
                Err(e) => {
                    tracing::warn!(error = %e, "Could not resolve owner of throttled username");
                    None
                }
            };
            self.audit
                .record_event(
                    owner.as_ref(),
                    &client_address,
                    SecurityEventKind::LoginBruteforceBlocked,
                    username_metadata(&username),
                )
                .await;
            return Err(AuthError::TooManyAttempts.into());
        }

        let session = match self.credentials.verify_and_issue(&username, &password).await {
            Ok(session) => session,
            Err(Error::Auth(AuthError::InvalidCredentials)) => {
                self.ledger
                    .record_attempt(&username, &client_address, false)
                    .await?;
                tracing::info!(
                    username = %username,
                    client_address = %client_address,
                    "Login rejected: invalid credentials"
                );
                return Err(AuthError::InvalidCredentials.into());
            }
            Err(e) => return Err(e),
        };

        if !self.credentials.is_email_verified(&session.account_id).await? {
            self.audit
                .record_event(
                    Some(&session.account_id),
                    &client_address,
                    SecurityEventKind::LoginUnverifiedEmail,
                    username_metadata(&username),
                )
                .await;
            self.ledger
                .record_attempt(&username, &client_address, false)
                .await?;
            return Err(AuthError::EmailUnverified.into());
        }

        self.ledger
            .record_attempt(&username, &client_address, true)
            .await?;
        tracing::info!(
            account_id = %session.account_id,
            client_address = %client_address,
            "Login succeeded"
        );
        Ok(session)
    }

    /// The caller's role, resolved fresh from the credential store.
    ///
    /// A failed lookup is an error, never a fallback to [`Role::Student`].
    pub async fn resolve_role(&self, account_id: &AccountId) -> Result<Role, Error> {
        self.credentials.resolve_role(account_id).await
    }

    /// Resolve the caller's role and require it to be one of `allowed`.
    pub async fn require_role(&self, account_id: &AccountId, allowed: &[Role]) -> Result<Role, Error> {
        let role = self.resolve_role(account_id).await?;
        if allowed.contains(&role) {
            Ok(role)
        } else {
            tracing::info!(account_id = %account_id, role = %role, "Role not permitted");
            Err(AuthError::InsufficientRole(role).into())
        }
    }
}

fn username_metadata(username: &str) -> EventMetadata {
    let mut metadata = EventMetadata::new();
    metadata.insert("username".to_string(), json!(username));
    metadata
}
