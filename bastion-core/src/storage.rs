//! Records persisted by the security core.

use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccountId, error::ValidationError};

/// One login attempt. Never updated after insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginAttempt {
    pub id: i64,
    pub username: String,
    pub client_address: String,
    pub attempted_at: DateTime<Utc>,
    pub succeeded: bool,
}

#[derive(Debug, Clone)]
pub struct NewVerificationCode {
    pub account_id: AccountId,
    pub code_hash: Vec<u8>,
    pub salt: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub max_attempts: u32,
}

/// A stored email verification code. Only the keyed hash of the code is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationCode {
    pub id: i64,
    pub account_id: AccountId,
    pub code_hash: Vec<u8>,
    pub salt: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub used: bool,
    pub attempt_count: u32,
    pub max_attempts: u32,
}

impl VerificationCode {
    pub fn is_expired(&self, now: DateTime<Utc>, expiry: Duration) -> bool {
        now - self.created_at >= expiry
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempt_count >= self.max_attempts
    }
}

/// A password reset token, keyed by the SHA-256 digest of the raw token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetToken {
    pub id: i64,
    pub account_id: AccountId,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub used: bool,
}

impl ResetToken {
    pub fn is_expired(&self, now: DateTime<Utc>, expiry: Duration) -> bool {
        now - self.created_at >= expiry
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityEventKind {
    LoginBruteforceBlocked,
    LoginUnverifiedEmail,
    EmailCodeInvalidOrExpired,
    EmailCodeMaxAttempts,
}

impl SecurityEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityEventKind::LoginBruteforceBlocked => "login_bruteforce_blocked",
            SecurityEventKind::LoginUnverifiedEmail => "login_unverified_email",
            SecurityEventKind::EmailCodeInvalidOrExpired => "email_code_invalid_or_expired",
            SecurityEventKind::EmailCodeMaxAttempts => "email_code_max_attempts",
        }
    }
}

impl fmt::Display for SecurityEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SecurityEventKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "login_bruteforce_blocked" => Ok(SecurityEventKind::LoginBruteforceBlocked),
            "login_unverified_email" => Ok(SecurityEventKind::LoginUnverifiedEmail),
            "email_code_invalid_or_expired" => Ok(SecurityEventKind::EmailCodeInvalidOrExpired),
            "email_code_max_attempts" => Ok(SecurityEventKind::EmailCodeMaxAttempts),
            other => Err(ValidationError::InvalidField(format!(
                "unknown security event kind {other:?}"
            ))),
        }
    }
}

pub type EventMetadata = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Clone)]
pub struct NewSecurityEvent {
    pub account_id: Option<AccountId>,
    pub client_address: String,
    pub kind: SecurityEventKind,
    pub metadata: EventMetadata,
    pub created_at: DateTime<Utc>,
}

/// A suspicious-activity record in the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub id: i64,
    pub account_id: Option<AccountId>,
    pub client_address: String,
    pub kind: SecurityEventKind,
    pub metadata: EventMetadata,
    pub created_at: DateTime<Utc>,
}
