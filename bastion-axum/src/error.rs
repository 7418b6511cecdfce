use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bastion::{AuthError, Error};
use serde_json::json;
use thiserror::Error;

/// A bastion error on its way to becoming an HTTP response.
///
/// Expected outcomes keep their message. Infrastructure faults are logged and
/// answered with a generic 500 so no driver or key detail reaches the client.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct ApiError {
    error: Error,
    retry_after: Option<u64>,
}

impl ApiError {
    /// Attach a `Retry-After` hint, used for throttled logins.
    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after = Some(seconds);
        self
    }

    pub fn unauthorized() -> Self {
        Error::from(AuthError::InvalidCredentials).into()
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        Self {
            error,
            retry_after: None,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        Error::from(error).into()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        AuthError::InvalidRequest(rejection.body_text()).into()
    }
}

fn classify(error: &AuthError) -> (StatusCode, &'static str) {
    match error {
        AuthError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
        AuthError::TooManyAttempts => (StatusCode::TOO_MANY_REQUESTS, "too_many_attempts"),
        AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
        AuthError::EmailUnverified => (StatusCode::FORBIDDEN, "email_unverified"),
        AuthError::InvalidCode => (StatusCode::BAD_REQUEST, "invalid_code"),
        AuthError::CodeExpired => (StatusCode::BAD_REQUEST, "code_expired"),
        AuthError::AttemptsExhausted => (StatusCode::FORBIDDEN, "attempts_exhausted"),
        AuthError::InvalidToken => (StatusCode::BAD_REQUEST, "invalid_token"),
        AuthError::TokenExpiredOrUsed => (StatusCode::BAD_REQUEST, "token_expired_or_used"),
        AuthError::WeakPassword(_) => (StatusCode::BAD_REQUEST, "weak_password"),
        AuthError::InsufficientRole(_) => (StatusCode::FORBIDDEN, "insufficient_role"),
        AuthError::RoleLookupFailed(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let auth_error = match &self.error {
            Error::Auth(e) if self.error.is_user_facing() => e,
            other => {
                tracing::error!(error = %other, "Request failed with an internal error");
                let body = Json(json!({
                    "detail": "Internal server error",
                    "code": "internal_error",
                }));
                return (StatusCode::INTERNAL_SERVER_ERROR, body).into_response();
            }
        };

        let (status, code) = classify(auth_error);
        let body = match auth_error {
            AuthError::WeakPassword(reasons) => json!({
                "detail": "Password does not meet the strength requirements",
                "code": code,
                "reasons": reasons,
            }),
            AuthError::InvalidRequest(msg) => json!({
                "detail": format!("Invalid request: {msg}"),
                "code": code,
            }),
            other => json!({
                "detail": other.to_string(),
                "code": code,
            }),
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(seconds) = self.retry_after {
            if let Ok(value) = HeaderValue::from_str(&seconds.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
