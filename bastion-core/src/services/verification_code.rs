//! Email verification codes.
//!
//! Each code is six digits drawn uniformly from `100000..=999999`. Only an
//! HMAC-SHA256 of the code, keyed by a fresh per-code salt, is stored. The
//! newest code for an account is the only one consulted, so requesting a new
//! code silently retires the previous one.
//!
//! A code is terminal once it is used, has spent its attempt budget, or is
//! older than the configured expiry. The attempt counter is advanced with a
//! single conditional write before the hash is compared, so concurrent
//! submissions can never exceed the budget.

use std::sync::Arc;

use serde_json::json;

use crate::{
    AccountId, Error,
    config::{DispatchConfig, VerificationCodeConfig},
    context::{Clock, RequestContext},
    credentials::CredentialStore,
    crypto::{generate_salt, generate_verification_code, hash_code, is_well_formed_code, verify_code},
    error::{AuthError, utilities::RequiredFieldExt},
    notification::{Notification, Notifier, dispatch},
    repositories::{AuditRepository, VerificationCodeRepository},
    services::AuditLogService,
    storage::{EventMetadata, NewVerificationCode, SecurityEventKind},
};

/// Result of a code request. Identical whether or not the identifier matched an
/// account, except for `dev_code` when codes are exposed for development.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeRequested {
    pub dev_code: Option<String>,
}

pub struct VerificationCodeService<V: VerificationCodeRepository, A: AuditRepository> {
    codes: Arc<V>,
    audit: Arc<AuditLogService<A>>,
    credentials: Arc<dyn CredentialStore>,
    notifier: Arc<dyn Notifier>,
    config: VerificationCodeConfig,
    dispatch: DispatchConfig,
    clock: Arc<dyn Clock>,
}

impl<V: VerificationCodeRepository, A: AuditRepository> VerificationCodeService<V, A> {
    pub fn new(
        codes: Arc<V>,
        audit: Arc<AuditLogService<A>>,
        credentials: Arc<dyn CredentialStore>,
        notifier: Arc<dyn Notifier>,
        config: VerificationCodeConfig,
        dispatch: DispatchConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        if config.expose_codes {
            tracing::warn!("Verification codes are exposed in responses; never enable this in production");
        }
        Self {
            codes,
            audit,
            credentials,
            notifier,
            config,
            dispatch,
            clock,
        }
    }

    pub fn config(&self) -> &VerificationCodeConfig {
        &self.config
    }

    /// Issue a fresh code for the account named by `identifier` (username or email).
    ///
    /// Unknown identifiers succeed without doing anything.
    pub async fn request_code(&self, identifier: &str) -> Result<CodeRequested, Error> {
        let identifier = Some(identifier.trim()).require_field("username or email")?;

        let Some(account) = self.credentials.find_account(&identifier).await? else {
            tracing::debug!("Verification code requested for unknown identifier");
            return Ok(CodeRequested::default());
        };

        let code = generate_verification_code();
        let salt = generate_salt()?;
        let code_hash = hash_code(&code, &salt)?;

        let stored = self
            .codes
            .create_code(NewVerificationCode {
                account_id: account.id.clone(),
                code_hash,
                salt,
                created_at: self.clock.now(),
                max_attempts: self.config.max_attempts,
            })
            .await?;

        tracing::info!(
            account_id = %account.id,
            code_id = stored.id,
            "Verification code issued"
        );

        dispatch(
            Arc::clone(&self.notifier),
            account.email.clone(),
            Notification::VerificationCode {
                username: account.username.clone(),
                code: code.clone(),
                expires_in_minutes: self.config.expiry.num_minutes(),
            },
            self.dispatch.timeout,
        );

        Ok(CodeRequested {
            dev_code: self.config.expose_codes.then_some(code),
        })
    }

    /// Same as [`request_code`](Self::request_code); the previous code becomes unreachable.
    pub async fn resend_code(&self, identifier: &str) -> Result<CodeRequested, Error> {
        self.request_code(identifier).await
    }

    /// Check `submitted` against the newest code for `identifier` and mark the
    /// account's email verified on a match.
    pub async fn confirm_code(
        &self,
        identifier: &str,
        submitted: &str,
        ctx: &RequestContext,
    ) -> Result<(), Error> {
        let identifier = Some(identifier.trim()).require_field("username or email")?;
        let submitted = submitted.trim();
        if !is_well_formed_code(submitted) {
            return Err(
                AuthError::InvalidRequest("code must be exactly 6 digits".to_string()).into(),
            );
        }

        let Some(account) = self.credentials.find_account(&identifier).await? else {
            return self.reject_stale(None, ctx, &identifier, "unknown_account").await;
        };

        let Some(code) = self.codes.latest_for_account(&account.id).await? else {
            return self.reject_stale(Some(&account.id), ctx, &identifier, "no_code").await;
        };

        if code.used {
            return self.reject_stale(Some(&account.id), ctx, &identifier, "used").await;
        }
        if code.is_expired(self.clock.now(), self.config.expiry) {
            return self.reject_stale(Some(&account.id), ctx, &identifier, "expired").await;
        }
        if code.is_exhausted() {
            return Err(AuthError::AttemptsExhausted.into());
        }

        let Some(attempts) = self.codes.register_attempt(code.id).await? else {
            // Lost a race with another submission for the same code.
            return match self.codes.find_code(code.id).await? {
                Some(current) if !current.used => Err(AuthError::AttemptsExhausted.into()),
                _ => self.reject_stale(Some(&account.id), ctx, &identifier, "used").await,
            };
        };

        if verify_code(submitted, &code.salt, &code.code_hash)? {
            if !self.codes.mark_used(code.id).await? {
                return self.reject_stale(Some(&account.id), ctx, &identifier, "used").await;
            }
            self.credentials.set_email_verified(&account.id).await?;
            tracing::info!(account_id = %account.id, "Email address verified");
            return Ok(());
        }

        if attempts >= code.max_attempts {
            let mut metadata = EventMetadata::new();
            metadata.insert("identifier".to_string(), json!(identifier));
            metadata.insert("attempts".to_string(), json!(attempts));
            metadata.insert("max_attempts".to_string(), json!(code.max_attempts));
            self.audit
                .record_event(
                    Some(&account.id),
                    ctx.audit_address(),
                    SecurityEventKind::EmailCodeMaxAttempts,
                    metadata,
                )
                .await;
            return Err(AuthError::AttemptsExhausted.into());
        }

        tracing::debug!(
            account_id = %account.id,
            attempts = attempts,
            max_attempts = code.max_attempts,
            "Verification code mismatch"
        );
        Err(AuthError::InvalidCode.into())
    }

    /// Delete codes that expired more than `retention` ago.
    pub async fn cleanup(&self, retention: chrono::Duration) -> Result<u64, Error> {
        let before = self.clock.now() - self.config.expiry - retention;
        self.codes.cleanup_codes_before(before).await
    }

    async fn reject_stale(
        &self,
        account_id: Option<&AccountId>,
        ctx: &RequestContext,
        identifier: &str,
        reason: &str,
    ) -> Result<(), Error> {
        let mut metadata = EventMetadata::new();
        metadata.insert("identifier".to_string(), json!(identifier));
        metadata.insert("reason".to_string(), json!(reason));
        self.audit
            .record_event(
                account_id,
                ctx.audit_address(),
                SecurityEventKind::EmailCodeInvalidOrExpired,
                metadata,
            )
            .await;
        Err(AuthError::CodeExpired.into())
    }
}
