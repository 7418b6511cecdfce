use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    response::IntoResponse,
    routing::{get, post},
};
use bastion::{AuthError, Bastion, Error, LoginRequest, RepositoryProvider};

use crate::{
    error::{ApiError, Result},
    extractors::{BearerToken, ClientContext},
    types::*,
};

const CODE_REQUESTED: &str = "If the account exists, a verification code has been sent.";
const RESET_REQUESTED: &str =
    "If the email address is registered and verified, a password reset link has been sent.";

pub struct AppState<R: RepositoryProvider> {
    pub bastion: Arc<Bastion<R>>,
}

impl<R: RepositoryProvider> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            bastion: self.bastion.clone(),
        }
    }
}

pub fn create_router<R>(bastion: Arc<Bastion<R>>) -> Router
where
    R: RepositoryProvider + 'static,
{
    let state = AppState { bastion };

    let auth_routes = Router::new()
        .route("/login", post(login_handler))
        .route("/me", get(me_handler))
        .route("/email/verify/request", post(verify_request_handler))
        .route("/email/verify/resend", post(verify_resend_handler))
        .route("/email/verify/confirm", post(verify_confirm_handler))
        .route("/password-reset/request", post(reset_request_handler))
        .route("/password-reset/confirm", post(reset_confirm_handler));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/auth", auth_routes)
        .with_state(state)
}

async fn health_handler<R>(State(state): State<AppState<R>>) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    state.bastion.health_check().await?;

    let audit_failures = state.bastion.audit_failures();
    Ok(Json(HealthResponse {
        status: if audit_failures == 0 { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        audit_failures,
    }))
}

async fn login_handler<R>(
    State(state): State<AppState<R>>,
    ClientContext(ctx): ClientContext,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let Json(payload) = payload?;

    let session = state
        .bastion
        .login(&payload, &ctx)
        .await
        .map_err(|e| match e {
            Error::Auth(AuthError::TooManyAttempts) => {
                let window = state.bastion.config().attempt_ledger.window;
                ApiError::from(e).with_retry_after(window.num_seconds().max(1) as u64)
            }
            other => ApiError::from(other),
        })?;

    Ok(Json(TokenResponse {
        token: session.token,
        token_type: "bearer",
        expires_at: session.expires_at,
    }))
}

async fn me_handler<R>(
    State(state): State<AppState<R>>,
    BearerToken(token): BearerToken,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let claims = state.bastion.verify_session(&token)?;

    Ok(Json(MeResponse {
        account_id: claims.account_id(),
        username: claims.username,
        email: claims.email,
        role: claims.role,
    }))
}

async fn verify_request_handler<R>(
    State(state): State<AppState<R>>,
    payload: std::result::Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let Json(payload) = payload?;
    let identifier = payload.identifier.unwrap_or_default();

    let requested = state.bastion.request_verification_code(&identifier).await?;

    Ok(Json(MessageResponse {
        message: CODE_REQUESTED.to_string(),
        dev_code: requested.dev_code,
    }))
}

async fn verify_resend_handler<R>(
    State(state): State<AppState<R>>,
    payload: std::result::Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let Json(payload) = payload?;
    let identifier = payload.identifier.unwrap_or_default();

    let requested = state.bastion.resend_verification_code(&identifier).await?;

    Ok(Json(MessageResponse {
        message: CODE_REQUESTED.to_string(),
        dev_code: requested.dev_code,
    }))
}

async fn verify_confirm_handler<R>(
    State(state): State<AppState<R>>,
    ClientContext(ctx): ClientContext,
    payload: std::result::Result<Json<VerifyConfirmRequest>, JsonRejection>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let Json(payload) = payload?;
    let identifier = payload.identifier.unwrap_or_default();
    let code = payload.code.unwrap_or_default();

    state
        .bastion
        .confirm_verification_code(&identifier, &code, &ctx)
        .await?;

    Ok(Json(MessageResponse::new("Email address verified.")))
}

async fn reset_request_handler<R>(
    State(state): State<AppState<R>>,
    payload: std::result::Result<Json<PasswordResetRequest>, JsonRejection>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let Json(payload) = payload?;
    let email = payload.email.unwrap_or_default();

    state.bastion.request_password_reset(&email).await?;

    Ok(Json(MessageResponse::new(RESET_REQUESTED)))
}

async fn reset_confirm_handler<R>(
    State(state): State<AppState<R>>,
    payload: std::result::Result<Json<PasswordResetConfirmRequest>, JsonRejection>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let Json(payload) = payload?;
    let token = payload.token.unwrap_or_default();
    let new_password = payload.new_password.unwrap_or_default();

    state
        .bastion
        .confirm_password_reset(&token, &new_password)
        .await?;

    Ok(Json(MessageResponse::new("Password has been reset.")))
}
