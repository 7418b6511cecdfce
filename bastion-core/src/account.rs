//! Accounts as seen by the security core.
//!
//! The account record itself is owned by the credential store; this crate only
//! reads the fields it needs to make security decisions.
//!
//! | Field               | Type               | Description                                   |
//! | ------------------- | ------------------ | --------------------------------------------- |
//! | `id`                | `AccountId`        | Stable opaque identifier.                     |
//! | `username`          | `String`           | Login name, unique.                           |
//! | `email`             | `String`           | Contact address, unique.                      |
//! | `email_verified_at` | `Option<DateTime>` | When the email address was proven, if ever.   |
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::CryptoError, id::generate_prefixed_id};

/// Opaque account identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: &str) -> Self {
        AccountId(id.to_string())
    }

    pub fn new_random() -> Result<Self, CryptoError> {
        Ok(AccountId(generate_prefixed_id("acct")?))
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for AccountId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    pub email: String,
    pub email_verified_at: Option<DateTime<Utc>>,
}

impl Account {
    pub fn is_email_verified(&self) -> bool {
        self.email_verified_at.is_some()
    }
}

/// A session token minted after a successful credential check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedSession {
    pub account_id: AccountId,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}
