pub mod utilities;

use thiserror::Error;

use crate::Role;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Cryptographic error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}

/// Expected, user-facing outcomes of the security flows.
///
/// None of these indicate a fault; every other [`Error`] kind is an
/// infrastructure failure and callers must treat it as a denial.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Too many failed login attempts")]
    TooManyAttempts,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email not verified")]
    EmailUnverified,

    #[error("Invalid verification code")]
    InvalidCode,

    #[error("Verification code expired or already used")]
    CodeExpired,

    #[error("Verification attempts exhausted")]
    AttemptsExhausted,

    #[error("Invalid reset token")]
    InvalidToken,

    #[error("Reset token expired or already used")]
    TokenExpiredOrUsed,

    #[error("Weak password: {}", .0.join("; "))]
    WeakPassword(Vec<String>),

    #[error("Role lookup failed: {0}")]
    RoleLookupFailed(String),

    #[error("Role {0} is not permitted")]
    InsufficientRole(Role),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Record not found")]
    NotFound,

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid email format: {0}")]
    InvalidEmail(String),

    #[error("Invalid field: {0}")]
    InvalidField(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Random number generation failed: {0}")]
    Random(String),

    #[error("Keyed hash failed: {0}")]
    Mac(String),

    #[error("JWT signing failed: {0}")]
    JwtSigning(String),

    #[error("JWT verification failed: {0}")]
    JwtVerification(String),
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Notification delivery failed: {0}")]
    Delivery(String),

    #[error("Notification delivery timed out")]
    Timeout,
}

impl Error {
    /// Whether this is one of the expected outcomes a client may see verbatim.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, Error::Auth(e) if !matches!(e, AuthError::RoleLookupFailed(_)))
    }

    pub fn is_storage_error(&self) -> bool {
        matches!(self, Error::Storage(_))
    }

    pub fn is_crypto_error(&self) -> bool {
        matches!(self, Error::Crypto(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = Error::Auth(AuthError::TooManyAttempts);
        assert_eq!(
            error.to_string(),
            "Authentication error: Too many failed login attempts"
        );

        let error = Error::Storage(StorageError::NotFound);
        assert_eq!(error.to_string(), "Storage error: Record not found");
    }

    #[test]
    fn test_weak_password_lists_reasons() {
        let error = AuthError::WeakPassword(vec![
            "Password must be at least 8 characters long".to_string(),
            "Password cannot be entirely numeric".to_string(),
        ]);
        assert_eq!(
            error.to_string(),
            "Weak password: Password must be at least 8 characters long; Password cannot be entirely numeric"
        );
    }

    #[test]
    fn test_user_facing_classification() {
        assert!(Error::Auth(AuthError::InvalidCode).is_user_facing());
        assert!(Error::Auth(AuthError::EmailUnverified).is_user_facing());
        assert!(!Error::Auth(AuthError::RoleLookupFailed("bogus".to_string())).is_user_facing());
        assert!(!Error::Storage(StorageError::Database("down".to_string())).is_user_facing());
        assert!(!Error::Dispatch(DispatchError::Timeout).is_user_facing());
    }

    #[test]
    fn test_error_from_conversions() {
        let error: Error = AuthError::InvalidToken.into();
        assert!(matches!(error, Error::Auth(AuthError::InvalidToken)));

        let error: Error = CryptoError::Random("no entropy".to_string()).into();
        assert!(error.is_crypto_error());
    }
}
