//! Builder for constructing [`Bastion`] instances
//!
//! The builder tracks whether storage has been configured in its type, so a
//! `build()` without storage does not compile.
//!
//! ```rust,no_run
//! use bastion::{BastionBuilder, JwtConfig, SecurityConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let bastion = BastionBuilder::new()
//!     .with_config(SecurityConfig::from_env()?)
//!     .with_sqlite("sqlite://bastion.db?mode=rwc")
//!     .await?
//!     .with_jwt(JwtConfig::from_env()?)
//!     .apply_migrations(true)
//!     .build()
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use bastion_core::{
    Clock, CredentialStore, DefaultPasswordPolicy, JwtConfig, Notifier, PasswordPolicy,
    RepositoryProvider, SecurityConfig, SystemClock, notification::NoopNotifier,
};

use crate::{Bastion, BastionParts};

#[cfg(feature = "mailer")]
use crate::{MailerConfig, MailerNotifier};

/// Errors that can occur when building a Bastion instance.
#[derive(Debug, thiserror::Error)]
pub enum BastionBuilderError {
    #[error("Storage connection failed: {0}")]
    StorageConnection(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[cfg(feature = "mailer")]
    #[error("Mailer configuration failed: {0}")]
    MailerConfiguration(String),
}

/// Initial state: no storage configured yet.
pub struct NoStorage;

/// Storage configured.
pub struct WithStorage<R: RepositoryProvider> {
    repositories: Arc<R>,
    credentials: CredentialSource,
}

enum CredentialSource {
    Provided(Arc<dyn CredentialStore>),
    /// Built at `build()` time, once the JWT and session settings are final.
    #[cfg(feature = "sqlite")]
    Sqlite(sqlx::SqlitePool),
}

pub struct BastionBuilder<Storage> {
    storage: Storage,
    config: SecurityConfig,
    jwt: Option<JwtConfig>,
    notifier: Option<Arc<dyn Notifier>>,
    policy: Option<Arc<dyn PasswordPolicy>>,
    clock: Option<Arc<dyn Clock>>,
    apply_migrations: bool,
    #[cfg(feature = "mailer")]
    mailer_config: Option<MailerConfig>,
}

impl Default for BastionBuilder<NoStorage> {
    fn default() -> Self {
        Self::new()
    }
}

impl BastionBuilder<NoStorage> {
    /// Create a builder with default configuration.
    ///
    /// # Defaults
    ///
    /// - Security policy: [`SecurityConfig::default`]
    /// - Password policy: [`DefaultPasswordPolicy`]
    /// - Clock: [`SystemClock`]
    /// - Notifier: none (codes and reset links are discarded)
    /// - Apply migrations: false
    pub fn new() -> Self {
        Self {
            storage: NoStorage,
            config: SecurityConfig::default(),
            jwt: None,
            notifier: None,
            policy: None,
            clock: None,
            apply_migrations: false,
            #[cfg(feature = "mailer")]
            mailer_config: None,
        }
    }

    fn with_storage<R: RepositoryProvider>(
        self,
        repositories: Arc<R>,
        credentials: CredentialSource,
    ) -> BastionBuilder<WithStorage<R>> {
        BastionBuilder {
            storage: WithStorage {
                repositories,
                credentials,
            },
            config: self.config,
            jwt: self.jwt,
            notifier: self.notifier,
            policy: self.policy,
            clock: self.clock,
            apply_migrations: self.apply_migrations,
            #[cfg(feature = "mailer")]
            mailer_config: self.mailer_config,
        }
    }

    /// Use any storage backend together with an external credential store.
    pub fn with_repositories<R: RepositoryProvider>(
        self,
        repositories: Arc<R>,
        credentials: Arc<dyn CredentialStore>,
    ) -> BastionBuilder<WithStorage<R>> {
        self.with_storage(repositories, CredentialSource::Provided(credentials))
    }
}

#[cfg(feature = "sqlite")]
impl BastionBuilder<NoStorage> {
    /// Configure SQLite storage by connecting to the given URL.
    ///
    /// The security records and the credential store share the one database.
    pub async fn with_sqlite(
        self,
        url: &str,
    ) -> Result<BastionBuilder<WithStorage<crate::SqliteRepositoryProvider>>, BastionBuilderError>
    {
        let pool = bastion_storage_sqlite::connect(url)
            .await
            .map_err(|e| BastionBuilderError::StorageConnection(e.to_string()))?;

        Ok(self.with_sqlite_pool(pool))
    }

    /// Configure SQLite storage with an existing connection pool.
    pub fn with_sqlite_pool(
        self,
        pool: sqlx::SqlitePool,
    ) -> BastionBuilder<WithStorage<crate::SqliteRepositoryProvider>> {
        let repositories = Arc::new(crate::SqliteRepositoryProvider::new(pool.clone()));
        self.with_storage(repositories, CredentialSource::Sqlite(pool))
    }
}

impl<S> BastionBuilder<S> {
    /// Replace the whole security policy.
    pub fn with_config(mut self, config: SecurityConfig) -> Self {
        self.config = config;
        self
    }

    /// Signing configuration for session tokens. Required.
    pub fn with_jwt(mut self, jwt: JwtConfig) -> Self {
        self.jwt = Some(jwt);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_password_policy(mut self, policy: Arc<dyn PasswordPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn apply_migrations(mut self, apply: bool) -> Self {
        self.apply_migrations = apply;
        self
    }

    /// Deliver codes and reset links by email. Ignored if a notifier is set explicitly.
    #[cfg(feature = "mailer")]
    pub fn with_mailer(mut self, config: MailerConfig) -> Self {
        self.mailer_config = Some(config);
        self
    }

    #[cfg(feature = "mailer")]
    pub fn with_mailer_from_env(mut self) -> Result<Self, BastionBuilderError> {
        let config = MailerConfig::from_env()
            .map_err(|e| BastionBuilderError::MailerConfiguration(e.to_string()))?;
        self.mailer_config = Some(config);
        Ok(self)
    }
}

impl<R: RepositoryProvider> BastionBuilder<WithStorage<R>> {
    pub async fn build(self) -> Result<Bastion<R>, BastionBuilderError> {
        self.config
            .validate()
            .map_err(|e| BastionBuilderError::InvalidConfiguration(e.to_string()))?;

        let jwt = self.jwt.ok_or_else(|| {
            BastionBuilderError::InvalidConfiguration(
                "a JWT configuration is required to issue sessions".to_string(),
            )
        })?;

        if self.apply_migrations {
            self.storage
                .repositories
                .migrate()
                .await
                .map_err(|e| BastionBuilderError::Migration(e.to_string()))?;
        }

        let credentials: Arc<dyn CredentialStore> = match self.storage.credentials {
            CredentialSource::Provided(credentials) => credentials,
            #[cfg(feature = "sqlite")]
            CredentialSource::Sqlite(pool) => Arc::new(crate::SqliteCredentialStore::new(
                pool,
                jwt.clone(),
                self.config.session.clone(),
            )),
        };

        #[cfg(feature = "mailer")]
        let notifier = match (self.notifier, self.mailer_config) {
            (Some(notifier), _) => notifier,
            (None, Some(mailer_config)) => {
                let notifier = MailerNotifier::new(mailer_config)
                    .map_err(|e| BastionBuilderError::MailerConfiguration(e.to_string()))?;
                Arc::new(notifier) as Arc<dyn Notifier>
            }
            (None, None) => default_notifier(),
        };
        #[cfg(not(feature = "mailer"))]
        let notifier = self.notifier.unwrap_or_else(default_notifier);

        let parts = BastionParts {
            credentials,
            notifier,
            policy: self
                .policy
                .unwrap_or_else(|| Arc::new(DefaultPasswordPolicy::default())),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            jwt,
            config: self.config,
        };

        Ok(Bastion::new(self.storage.repositories, parts))
    }
}

fn default_notifier() -> Arc<dyn Notifier> {
    tracing::warn!("No notifier configured; verification codes and reset links will not be delivered");
    Arc::new(NoopNotifier)
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;

    fn jwt() -> JwtConfig {
        JwtConfig::new_hs256(b"test_secret_key_for_hs256_jwt_tokens_not_for_production_use".to_vec())
    }

    #[tokio::test]
    async fn test_build_with_sqlite() {
        let bastion = BastionBuilder::new()
            .with_sqlite("sqlite::memory:")
            .await
            .unwrap()
            .with_jwt(jwt())
            .apply_migrations(true)
            .build()
            .await
            .unwrap();

        bastion.health_check().await.unwrap();
    }

    #[tokio::test]
    async fn test_build_requires_jwt() {
        let result = BastionBuilder::new()
            .with_sqlite("sqlite::memory:")
            .await
            .unwrap()
            .build()
            .await;

        assert!(matches!(
            result,
            Err(BastionBuilderError::InvalidConfiguration(_))
        ));
    }

    #[tokio::test]
    async fn test_build_rejects_invalid_config() {
        let mut config = SecurityConfig::default();
        config.verification_code.max_attempts = 0;

        let result = BastionBuilder::new()
            .with_config(config)
            .with_sqlite("sqlite::memory:")
            .await
            .unwrap()
            .with_jwt(jwt())
            .build()
            .await;

        assert!(matches!(
            result,
            Err(BastionBuilderError::InvalidConfiguration(_))
        ));
    }
}
