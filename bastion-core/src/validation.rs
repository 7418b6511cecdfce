//! Input validation and the password strength policy.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{AuthError, ValidationError};

/// Practical subset of RFC 5322.
static EMAIL_REGEX: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").ok()
});

/// Passwords rejected regardless of length.
const COMMON_PASSWORDS: &[&str] = &[
    "password",
    "password1",
    "password123",
    "12345678",
    "123456789",
    "1234567890",
    "qwerty123",
    "qwertyuiop",
    "iloveyou",
    "letmein1",
    "welcome1",
    "admin123",
    "changeme",
    "abc12345",
    "11111111",
    "00000000",
];

/// Validates an email address.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::MissingField(
            "Email is required".to_string(),
        ));
    }

    if email.len() > 254 {
        return Err(ValidationError::InvalidEmail(
            "Email is too long".to_string(),
        ));
    }

    match EMAIL_REGEX.as_ref() {
        Some(regex) if regex.is_match(email) => Ok(()),
        _ => Err(ValidationError::InvalidEmail(format!(
            "Invalid email format: {email}"
        ))),
    }
}

/// Strength check applied to new passwords.
///
/// Returns every reason the password is unacceptable; an empty list means it passes.
pub trait PasswordPolicy: Send + Sync + 'static {
    fn validate_strength(&self, password: &str, username: Option<&str>) -> Vec<String>;

    /// [`PasswordPolicy::validate_strength`] folded into a `WeakPassword` error.
    fn check(&self, password: &str, username: Option<&str>) -> Result<(), AuthError> {
        let reasons = self.validate_strength(password, username);
        if reasons.is_empty() {
            Ok(())
        } else {
            Err(AuthError::WeakPassword(reasons))
        }
    }
}

/// Length bounds plus rejection of whitespace-only, all-digit, common and
/// username-containing passwords.
#[derive(Debug, Clone)]
pub struct DefaultPasswordPolicy {
    pub min_length: usize,
    pub max_length: usize,
}

impl Default for DefaultPasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 128,
        }
    }
}

impl PasswordPolicy for DefaultPasswordPolicy {
    fn validate_strength(&self, password: &str, username: Option<&str>) -> Vec<String> {
        let mut reasons = Vec::new();
        let length = password.chars().count();

        if password.trim().is_empty() {
            reasons.push("Password cannot be empty or only whitespace".to_string());
        }

        if length < self.min_length {
            reasons.push(format!(
                "Password must be at least {} characters long",
                self.min_length
            ));
        }

        if length > self.max_length {
            reasons.push(format!(
                "Password must be no more than {} characters long",
                self.max_length
            ));
        }

        if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
            reasons.push("Password cannot be entirely numeric".to_string());
        }

        let lowered = password.to_lowercase();
        if COMMON_PASSWORDS.contains(&lowered.as_str()) {
            reasons.push("Password is too common".to_string());
        }

        if let Some(username) = username.map(str::to_lowercase) {
            if username.len() >= 3 && lowered.contains(&username) {
                reasons.push("Password is too similar to the username".to_string());
            }
        }

        reasons
    }
}
