//! Configuration for the security services.
//!
//! Every threshold, window and expiry is a field on one of these structs and is
//! handed to the owning service at construction. Defaults match the documented
//! policy: 5 failures per 15 minutes, 3 attempts per 15-minute code, 24-hour
//! single-use reset tokens.

use std::str::FromStr;

use chrono::Duration;

use crate::error::ValidationError;

/// Login throttling parameters.
#[derive(Debug, Clone)]
pub struct AttemptLedgerConfig {
    /// Failures within `window` at which a (username, address) pair is blocked.
    pub max_attempts: u32,
    /// Trailing window over which failures are counted.
    pub window: Duration,
    /// How long attempt rows are kept before the maintenance task deletes them.
    pub retention_period: Duration,
}

impl Default for AttemptLedgerConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window: Duration::minutes(15),
            retention_period: Duration::days(30),
        }
    }
}

/// Email verification code parameters.
#[derive(Debug, Clone)]
pub struct VerificationCodeConfig {
    pub max_attempts: u32,
    pub expiry: Duration,
    /// Return the raw code in the request response. Development only.
    pub expose_codes: bool,
}

impl Default for VerificationCodeConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            expiry: Duration::minutes(15),
            expose_codes: false,
        }
    }
}

/// Password reset token parameters.
#[derive(Debug, Clone)]
pub struct ResetTokenConfig {
    pub expiry: Duration,
    /// Only issue tokens to accounts whose email has been verified.
    pub require_verified_email: bool,
}

impl Default for ResetTokenConfig {
    fn default() -> Self {
        Self {
            expiry: Duration::hours(24),
            require_verified_email: true,
        }
    }
}

/// Bounds on out-of-band notification delivery.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub timeout: std::time::Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            timeout: std::time::Duration::from_secs(5),
        }
    }
}

/// Lifetime of issued session tokens.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub token_ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token_ttl: Duration::minutes(60),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SecurityConfig {
    pub attempt_ledger: AttemptLedgerConfig,
    pub verification_code: VerificationCodeConfig,
    pub reset_token: ResetTokenConfig,
    pub dispatch: DispatchConfig,
    pub session: SessionConfig,
}

impl SecurityConfig {
    /// Build a configuration from `BASTION_*` environment variables, falling
    /// back to the defaults for anything unset.
    pub fn from_env() -> Result<Self, ValidationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`SecurityConfig::from_env`] with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ValidationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parse = |key: &str| parse_var::<i64>(&lookup, key);

        let attempt_ledger = AttemptLedgerConfig {
            max_attempts: parse_var(&lookup, "BASTION_LOGIN_MAX_ATTEMPTS")?
                .unwrap_or(defaults.attempt_ledger.max_attempts),
            window: parse("BASTION_LOGIN_WINDOW_MINUTES")?
                .map(Duration::minutes)
                .unwrap_or(defaults.attempt_ledger.window),
            retention_period: parse("BASTION_LOGIN_RETENTION_DAYS")?
                .map(Duration::days)
                .unwrap_or(defaults.attempt_ledger.retention_period),
        };

        let verification_code = VerificationCodeConfig {
            max_attempts: parse_var(&lookup, "BASTION_CODE_MAX_ATTEMPTS")?
                .unwrap_or(defaults.verification_code.max_attempts),
            expiry: parse("BASTION_CODE_EXPIRY_MINUTES")?
                .map(Duration::minutes)
                .unwrap_or(defaults.verification_code.expiry),
            expose_codes: parse_var(&lookup, "BASTION_DEV_EXPOSE_CODES")?
                .unwrap_or(defaults.verification_code.expose_codes),
        };

        let reset_token = ResetTokenConfig {
            expiry: parse("BASTION_RESET_EXPIRY_HOURS")?
                .map(Duration::hours)
                .unwrap_or(defaults.reset_token.expiry),
            require_verified_email: parse_var(&lookup, "BASTION_RESET_REQUIRE_VERIFIED")?
                .unwrap_or(defaults.reset_token.require_verified_email),
        };

        let dispatch = DispatchConfig {
            timeout: parse_var::<u64>(&lookup, "BASTION_DISPATCH_TIMEOUT_SECS")?
                .map(std::time::Duration::from_secs)
                .unwrap_or(defaults.dispatch.timeout),
        };

        let session = SessionConfig {
            token_ttl: parse("BASTION_TOKEN_TTL_MINUTES")?
                .map(Duration::minutes)
                .unwrap_or(defaults.session.token_ttl),
        };

        let config = Self {
            attempt_ledger,
            verification_code,
            reset_token,
            dispatch,
            session,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would disable a control outright.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.attempt_ledger.max_attempts == 0 {
            return Err(ValidationError::InvalidField(
                "BASTION_LOGIN_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }
        if self.verification_code.max_attempts == 0 {
            return Err(ValidationError::InvalidField(
                "BASTION_CODE_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }
        let durations = [
            ("BASTION_LOGIN_WINDOW_MINUTES", self.attempt_ledger.window),
            ("BASTION_CODE_EXPIRY_MINUTES", self.verification_code.expiry),
            ("BASTION_RESET_EXPIRY_HOURS", self.reset_token.expiry),
            ("BASTION_TOKEN_TTL_MINUTES", self.session.token_ttl),
        ];
        for (name, value) in durations {
            if value <= Duration::zero() {
                return Err(ValidationError::InvalidField(format!(
                    "{name} must be positive"
                )));
            }
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, ValidationError> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ValidationError::InvalidField(format!("{key} has invalid value {raw:?}"))),
        None => Ok(None),
    }
}
