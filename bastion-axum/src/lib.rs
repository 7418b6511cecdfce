//! # Bastion Axum Integration
//!
//! HTTP routes for the bastion account security layer.
//!
//! | Method | Path                           | Body                        |
//! | ------ | ------------------------------ | --------------------------- |
//! | POST   | `/auth/login`                  | `{username, password}`      |
//! | GET    | `/auth/me`                     | Bearer token                |
//! | POST   | `/auth/email/verify/request`   | `{username}` or `{email}`   |
//! | POST   | `/auth/email/verify/resend`    | `{username}` or `{email}`   |
//! | POST   | `/auth/email/verify/confirm`   | `{username, code}`          |
//! | POST   | `/auth/password-reset/request` | `{email}`                   |
//! | POST   | `/auth/password-reset/confirm` | `{token, new_password}`     |
//! | GET    | `/health`                      |                             |
//!
//! Errors are JSON `{detail, code}`. The client address comes from
//! [`ConnectInfo`](axum::extract::ConnectInfo), so serve the router with
//! `into_make_service_with_connect_info::<SocketAddr>()`.
//!
//! ```rust,no_run
//! use std::{net::SocketAddr, sync::Arc};
//! use bastion::{BastionBuilder, JwtConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bastion = BastionBuilder::new()
//!         .with_sqlite("sqlite://bastion.db?mode=rwc")
//!         .await?
//!         .with_jwt(JwtConfig::from_env()?)
//!         .apply_migrations(true)
//!         .build()
//!         .await?;
//!
//!     let app = bastion_axum::routes(Arc::new(bastion));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
//!     axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
//!     Ok(())
//! }
//! ```

mod error;
mod extractors;
mod routes;
mod types;

pub use error::{ApiError, Result};
pub use extractors::{BearerToken, ClientContext};
pub use routes::{AppState, create_router};
pub use types::{
    HealthResponse, MeResponse, MessageResponse, PasswordResetConfirmRequest,
    PasswordResetRequest, TokenResponse, VerifyConfirmRequest, VerifyRequest,
};

use std::sync::Arc;

use axum::Router;
use bastion::{Bastion, RepositoryProvider};

/// Build the bastion router.
pub fn routes<R>(bastion: Arc<Bastion<R>>) -> Router
where
    R: RepositoryProvider + 'static,
{
    create_router(bastion)
}
