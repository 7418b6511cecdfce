//! SQLite storage backend for bastion.
//!
//! Provides [`SqliteRepositoryProvider`] for the security records and
//! [`SqliteCredentialStore`], a credential store over the `accounts` table.
//!
//! ```rust,ignore
//! use bastion_core::repositories::RepositoryProvider;
//! use bastion_storage_sqlite::{SqliteRepositoryProvider, connect};
//!
//! let pool = connect("sqlite://bastion.db?mode=rwc").await?;
//! let repositories = SqliteRepositoryProvider::new(pool.clone());
//! repositories.migrate().await?;
//! ```
pub mod credentials;
pub mod migrations;
pub mod repositories;

pub use credentials::SqliteCredentialStore;
pub use repositories::SqliteRepositoryProvider;
pub use sqlx::SqlitePool;

use bastion_core::{Error, error::StorageError};

/// Open a connection pool for `database_url`.
pub async fn connect(database_url: &str) -> Result<SqlitePool, Error> {
    SqlitePool::connect(database_url).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to connect to SQLite");
        Error::Storage(StorageError::Connection(
            "Failed to connect to database".to_string(),
        ))
    })
}

/// A migrated in-memory database on a single connection.
#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    use bastion_core::repositories::RepositoryProvider;
    use sqlx::sqlite::SqlitePoolOptions;

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create pool");
    SqliteRepositoryProvider::new(pool.clone())
        .migrate()
        .await
        .expect("Failed to migrate");
    pool
}
