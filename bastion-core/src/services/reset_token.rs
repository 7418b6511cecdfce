//! Password reset tokens.
//!
//! Tokens carry 256 bits of entropy and are stored only as their SHA-256
//! digest. A token is usable once: it is claimed with a conditional write
//! before the password changes, and the claim is released again if the change
//! fails. A password never changes without its token being consumed.

use std::sync::Arc;

use crate::{
    Error,
    config::{DispatchConfig, ResetTokenConfig},
    context::Clock,
    credentials::CredentialStore,
    crypto::{generate_secure_token, hash_token},
    error::{AuthError, utilities::RequiredFieldExt},
    notification::{Notification, Notifier, dispatch},
    repositories::ResetTokenRepository,
    validation::PasswordPolicy,
};

/// How many times a claim is released before the token is given up on.
const RELEASE_ATTEMPTS: u32 = 3;

pub struct ResetTokenService<T: ResetTokenRepository> {
    tokens: Arc<T>,
    credentials: Arc<dyn CredentialStore>,
    policy: Arc<dyn PasswordPolicy>,
    notifier: Arc<dyn Notifier>,
    config: ResetTokenConfig,
    dispatch: DispatchConfig,
    clock: Arc<dyn Clock>,
}

impl<T: ResetTokenRepository> ResetTokenService<T> {
    pub fn new(
        tokens: Arc<T>,
        credentials: Arc<dyn CredentialStore>,
        policy: Arc<dyn PasswordPolicy>,
        notifier: Arc<dyn Notifier>,
        config: ResetTokenConfig,
        dispatch: DispatchConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tokens,
            credentials,
            policy,
            notifier,
            config,
            dispatch,
            clock,
        }
    }

    pub fn config(&self) -> &ResetTokenConfig {
        &self.config
    }

    /// Issue and send a reset token if `email` belongs to an eligible account.
    ///
    /// Returns `Ok(())` in every non-fault case so callers can answer with the
    /// same acknowledgement whether or not a token was issued.
    pub async fn request_reset(&self, email: &str) -> Result<(), Error> {
        let email = Some(email.trim()).require_field("email")?;

        let Some(account) = self.credentials.find_account_by_email(&email).await? else {
            tracing::debug!("Password reset requested for unknown email");
            return Ok(());
        };

        if self.config.require_verified_email
            && !self.credentials.is_email_verified(&account.id).await?
        {
            tracing::info!(
                account_id = %account.id,
                "Password reset skipped for unverified email"
            );
            return Ok(());
        }

        let token = generate_secure_token()?;
        let stored = self
            .tokens
            .create_token(&account.id, &hash_token(&token), self.clock.now())
            .await?;

        tracing::info!(
            account_id = %account.id,
            token_id = stored.id,
            "Password reset token issued"
        );

        dispatch(
            Arc::clone(&self.notifier),
            account.email.clone(),
            Notification::PasswordReset {
                username: account.username.clone(),
                token,
                expires_in_hours: self.config.expiry.num_hours(),
            },
            self.dispatch.timeout,
        );

        Ok(())
    }

    /// Consume `token` and set the account's password to `new_password`.
    pub async fn confirm_reset(&self, token: &str, new_password: &str) -> Result<(), Error> {
        let token = Some(token.trim()).require_field("token")?;
        let new_password = Some(new_password).require_field("new_password")?;

        let Some(stored) = self.tokens.find_by_hash(&hash_token(&token)).await? else {
            return Err(AuthError::InvalidToken.into());
        };

        if stored.used || stored.is_expired(self.clock.now(), self.config.expiry) {
            return Err(AuthError::TokenExpiredOrUsed.into());
        }

        let Some(account) = self.credentials.get_account(&stored.account_id).await? else {
            tracing::warn!(
                account_id = %stored.account_id,
                "Reset token refers to a missing account"
            );
            return Err(AuthError::InvalidToken.into());
        };

        self.policy.check(&new_password, Some(&account.username))?;

        if !self.tokens.claim(stored.id).await? {
            return Err(AuthError::TokenExpiredOrUsed.into());
        }

        if let Err(e) = self
            .credentials
            .change_password(&account.id, &new_password)
            .await
        {
            tracing::error!(
                error = %e,
                account_id = %account.id,
                "Password change failed; releasing reset token"
            );
            self.release_claim(stored.id).await;
            return Err(e);
        }

        tracing::info!(account_id = %account.id, "Password reset completed");
        Ok(())
    }

    /// Undo a claim after the password change failed.
    ///
    /// If every attempt fails the token stays consumed and the holder has to
    /// request a new one; the password is unchanged either way.
    async fn release_claim(&self, token_id: i64) {
        for attempt in 1..=RELEASE_ATTEMPTS {
            match self.tokens.release(token_id).await {
                Ok(()) => return,
                Err(e) => tracing::warn!(
                    error = %e,
                    token_id,
                    attempt,
                    "Failed to release reset token"
                ),
            }
        }
        tracing::error!(token_id, "Reset token left consumed after failed password change");
    }

    /// Delete tokens that expired more than `retention` ago.
    pub async fn cleanup(&self, retention: chrono::Duration) -> Result<u64, Error> {
        let before = self.clock.now() - self.config.expiry - retention;
        self.tokens.cleanup_tokens_before(before).await
    }
}
