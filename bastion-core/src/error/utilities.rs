use crate::{
    Error,
    error::{AuthError, StorageError},
};

/// Extension trait for mapping backend errors into a sanitized [`StorageError`].
///
/// The underlying error is logged with `tracing` and only `context` is kept in
/// the returned error, so driver messages never reach API responses.
///
/// # Example
///
/// ```rust,ignore
/// use bastion_core::error::utilities::StorageResultExt;
///
/// query.execute(&pool).await.map_storage_err("Failed to record login attempt")?;
/// ```
pub trait StorageResultExt<T> {
    fn map_storage_err(self, context: &str) -> Result<T, Error>;
}

impl<T, E: std::fmt::Display> StorageResultExt<T> for Result<T, E> {
    fn map_storage_err(self, context: &str) -> Result<T, Error> {
        self.map_err(|e| {
            tracing::error!(error = %e, "{context}");
            Error::Storage(StorageError::Database(context.to_string()))
        })
    }
}

/// Extension trait for required request fields.
///
/// A missing or blank value becomes [`AuthError::InvalidRequest`], which is
/// reported before any storage is touched. Present values are returned as-is.
pub trait RequiredFieldExt {
    fn require_field(self, field_name: &str) -> Result<String, AuthError>;
}

impl RequiredFieldExt for Option<String> {
    fn require_field(self, field_name: &str) -> Result<String, AuthError> {
        match self {
            Some(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(AuthError::InvalidRequest(format!("{field_name} is required"))),
        }
    }
}

impl RequiredFieldExt for Option<&str> {
    fn require_field(self, field_name: &str) -> Result<String, AuthError> {
        self.map(str::to_string).require_field(field_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_field_keeps_value_verbatim() {
        let value = Some(" pass phrase ".to_string()).require_field("password").unwrap();
        assert_eq!(value, " pass phrase ");
    }

    #[test]
    fn test_require_field_rejects_blank() {
        let result = Some("   ".to_string()).require_field("username");
        assert!(matches!(result, Err(AuthError::InvalidRequest(msg)) if msg == "username is required"));

        let result = None::<&str>.require_field("password");
        assert!(matches!(result, Err(AuthError::InvalidRequest(_))));
    }

    #[test]
    fn test_map_storage_err_sanitizes() {
        let result: Result<(), &str> = Err("disk I/O error at page 42");
        let error = result.map_storage_err("Failed to load code").unwrap_err();
        assert_eq!(error.to_string(), "Storage error: Database error: Failed to load code");
    }
}
