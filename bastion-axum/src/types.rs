use bastion::{AccountId, Role};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body for the verification code endpoints. Accepts `identifier`, `username` or `email`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerifyRequest {
    #[serde(alias = "username", alias = "email")]
    pub identifier: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerifyConfirmRequest {
    #[serde(alias = "username", alias = "email")]
    pub identifier: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PasswordResetRequest {
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PasswordResetConfirmRequest {
    pub token: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
    /// Raw verification code, only when codes are exposed for development.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dev_code: Option<String>,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            dev_code: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MeResponse {
    pub account_id: AccountId,
    pub username: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub audit_failures: u64,
}
