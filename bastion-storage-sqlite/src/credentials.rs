//! Account records and password checks backed by the `accounts` table.
//!
//! Passwords are hashed with Argon2 via `password-auth`. Hashing runs on the
//! blocking pool so it never stalls the async runtime.

use std::sync::LazyLock;

use async_trait::async_trait;
use bastion_core::{
    Account, AccountId, CredentialStore, Error, IssuedSession, JwtConfig, Role,
    config::SessionConfig,
    error::{AuthError, StorageError, utilities::StorageResultExt},
    session::issue_session,
    validation::validate_email,
};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

/// Verified against when the username is unknown, so both paths pay for one hash.
static DUMMY_HASH: LazyLock<String> =
    LazyLock::new(|| password_auth::generate_hash("bastion-timing-equaliser"));

#[derive(Debug, sqlx::FromRow)]
struct SqliteAccount {
    id: String,
    username: String,
    email: String,
    password_hash: String,
    role: String,
    email_verified_at: Option<i64>,
}

impl From<SqliteAccount> for Account {
    fn from(row: SqliteAccount) -> Self {
        Account {
            id: AccountId::new(&row.id),
            username: row.username,
            email: row.email,
            email_verified_at: row
                .email_verified_at
                .and_then(|ts| DateTime::from_timestamp(ts, 0)),
        }
    }
}

const COLUMNS: &str = "id, username, email, password_hash, role, email_verified_at";

pub struct SqliteCredentialStore {
    pool: SqlitePool,
    jwt: JwtConfig,
    session: SessionConfig,
}

impl SqliteCredentialStore {
    pub fn new(pool: SqlitePool, jwt: JwtConfig, session: SessionConfig) -> Self {
        Self { pool, jwt, session }
    }

    pub fn jwt_config(&self) -> &JwtConfig {
        &self.jwt
    }

    /// Provision an account. Username and email must both be unused.
    pub async fn create_account(
        &self,
        username: &str,
        email: &str,
        password: &str,
        role: Role,
        email_verified: bool,
    ) -> Result<Account, Error> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AuthError::InvalidRequest("username is required".to_string()).into());
        }
        validate_email(email)?;

        let id = AccountId::new_random()?;
        let password_hash = hash_password(password).await?;
        let now = Utc::now().timestamp();
        let verified_at = email_verified.then_some(now);

        let row = sqlx::query_as::<_, SqliteAccount>(&format!(
            r#"
            INSERT INTO accounts (id, username, email, password_hash, role, email_verified_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id.as_str())
        .bind(username)
        .bind(email)
        .bind(&password_hash)
        .bind(role.as_str())
        .bind(verified_at)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db) if db.is_unique_violation() => Error::Storage(StorageError::Constraint(
                "username or email already registered".to_string(),
            )),
            _ => {
                tracing::error!(error = %e, "Failed to create account");
                Error::Storage(StorageError::Database("Failed to create account".to_string()))
            }
        })?;

        tracing::info!(account_id = %row.id, username = %row.username, "Account created");
        Ok(row.into())
    }

    pub async fn set_role(&self, account_id: &AccountId, role: Role) -> Result<(), Error> {
        let result = sqlx::query("UPDATE accounts SET role = ?, updated_at = ? WHERE id = ?")
            .bind(role.as_str())
            .bind(Utc::now().timestamp())
            .bind(account_id.as_str())
            .execute(&self.pool)
            .await
            .map_storage_err("Failed to update account role")?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound.into());
        }
        Ok(())
    }

    async fn row_by_username(&self, username: &str) -> Result<Option<SqliteAccount>, Error> {
        sqlx::query_as::<_, SqliteAccount>(&format!(
            "SELECT {COLUMNS} FROM accounts WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_storage_err("Failed to load account")
    }
}

async fn hash_password(password: &str) -> Result<String, Error> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || password_auth::generate_hash(password))
        .await
        .map_storage_err("Password hashing task failed")
}

async fn password_matches(password: &str, hash: String) -> Result<bool, Error> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || password_auth::verify_password(password, &hash).is_ok())
        .await
        .map_storage_err("Password verification task failed")
}

/// Runs on the blocking pool, including the first call that builds [`DUMMY_HASH`].
async fn burn_dummy_verification(password: &str) -> Result<(), Error> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || {
        let _ = password_auth::verify_password(password, &DUMMY_HASH);
    })
    .await
    .map_storage_err("Password verification task failed")
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn verify_and_issue(
        &self,
        username: &str,
        password: &str,
    ) -> Result<IssuedSession, Error> {
        let Some(row) = self.row_by_username(username).await? else {
            burn_dummy_verification(password).await?;
            return Err(AuthError::InvalidCredentials.into());
        };

        if !password_matches(password, row.password_hash.clone()).await? {
            return Err(AuthError::InvalidCredentials.into());
        }

        let role: Role = row.role.parse()?;
        let account = Account::from(row);
        issue_session(&account, role, Utc::now(), self.session.token_ttl, &self.jwt)
    }

    async fn find_account(&self, identifier: &str) -> Result<Option<Account>, Error> {
        let row = sqlx::query_as::<_, SqliteAccount>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM accounts
            WHERE username = ? OR email = ? COLLATE NOCASE
            ORDER BY username = ? DESC
            LIMIT 1
            "#
        ))
        .bind(identifier)
        .bind(identifier)
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await
        .map_storage_err("Failed to load account")?;

        Ok(row.map(Into::into))
    }

    async fn find_account_by_username(&self, username: &str) -> Result<Option<Account>, Error> {
        Ok(self.row_by_username(username).await?.map(Into::into))
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, Error> {
        let row = sqlx::query_as::<_, SqliteAccount>(&format!(
            "SELECT {COLUMNS} FROM accounts WHERE email = ? COLLATE NOCASE"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_storage_err("Failed to load account")?;

        Ok(row.map(Into::into))
    }

    async fn get_account(&self, account_id: &AccountId) -> Result<Option<Account>, Error> {
        let row = sqlx::query_as::<_, SqliteAccount>(&format!(
            "SELECT {COLUMNS} FROM accounts WHERE id = ?"
        ))
        .bind(account_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_storage_err("Failed to load account")?;

        Ok(row.map(Into::into))
    }

    async fn change_password(&self, account_id: &AccountId, new_password: &str) -> Result<(), Error> {
        let password_hash = hash_password(new_password).await?;

        let result =
            sqlx::query("UPDATE accounts SET password_hash = ?, updated_at = ? WHERE id = ?")
                .bind(&password_hash)
                .bind(Utc::now().timestamp())
                .bind(account_id.as_str())
                .execute(&self.pool)
                .await
                .map_storage_err("Failed to update password")?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound.into());
        }
        tracing::info!(account_id = %account_id, "Password changed");
        Ok(())
    }

    async fn is_email_verified(&self, account_id: &AccountId) -> Result<bool, Error> {
        let verified_at: Option<Option<i64>> =
            sqlx::query_scalar("SELECT email_verified_at FROM accounts WHERE id = ?")
                .bind(account_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_storage_err("Failed to load account")?;

        match verified_at {
            Some(at) => Ok(at.is_some()),
            None => Err(StorageError::NotFound.into()),
        }
    }

    async fn set_email_verified(&self, account_id: &AccountId) -> Result<(), Error> {
        let now = Utc::now().timestamp();
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET email_verified_at = COALESCE(email_verified_at, ?), updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(now)
        .bind(now)
        .bind(account_id.as_str())
        .execute(&self.pool)
        .await
        .map_storage_err("Failed to mark email verified")?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound.into());
        }
        Ok(())
    }

    async fn resolve_role(&self, account_id: &AccountId) -> Result<Role, Error> {
        let role: Option<String> = sqlx::query_scalar("SELECT role FROM accounts WHERE id = ?")
            .bind(account_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_storage_err("Failed to load account role")?;

        match role {
            Some(role) => Ok(role.parse()?),
            None => Err(AuthError::RoleLookupFailed(format!("no account {account_id}")).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_pool;
    use bastion_core::session::decode_session;

    const SECRET: &[u8] = b"test_secret_key_for_hs256_jwt_tokens_not_for_production_use";

    async fn store() -> SqliteCredentialStore {
        SqliteCredentialStore::new(
            test_pool().await,
            JwtConfig::new_hs256(SECRET.to_vec()),
            SessionConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_create_and_login() {
        let store = store().await;
        let account = store
            .create_account("alice", "alice@example.com", "Tr0ub4dor&3", Role::Teacher, false)
            .await
            .unwrap();
        assert!(account.id.as_str().starts_with("acct_"));
        assert!(!account.is_email_verified());

        let session = store.verify_and_issue("alice", "Tr0ub4dor&3").await.unwrap();
        assert_eq!(session.account_id, account.id);

        let claims = decode_session(&session.token, store.jwt_config()).unwrap();
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.role, Role::Teacher);
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user() {
        let store = store().await;
        store
            .create_account("alice", "alice@example.com", "Tr0ub4dor&3", Role::Student, false)
            .await
            .unwrap();

        let err = store.verify_and_issue("alice", "wrong").await.unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::InvalidCredentials)));

        let err = store.verify_and_issue("mallory", "wrong").await.unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_dummy_verification_leaves_runtime_free() {
        use std::sync::{
            Arc,
            atomic::{AtomicU32, Ordering},
        };

        let ticks = Arc::new(AtomicU32::new(0));
        let ticker = tokio::spawn({
            let ticks = ticks.clone();
            async move {
                loop {
                    ticks.fetch_add(1, Ordering::SeqCst);
                    tokio::task::yield_now().await;
                }
            }
        });

        burn_dummy_verification("guess").await.unwrap();
        ticker.abort();

        // The ticker only runs while the hash work is parked on the blocking pool
        assert!(ticks.load(Ordering::SeqCst) > 0);
    }

    #[tokio::test]
    async fn test_duplicate_account_rejected() {
        let store = store().await;
        store
            .create_account("alice", "alice@example.com", "Tr0ub4dor&3", Role::Student, false)
            .await
            .unwrap();

        let err = store
            .create_account("alice", "other@example.com", "Tr0ub4dor&3", Role::Student, false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Storage(StorageError::Constraint(_))));
    }

    #[tokio::test]
    async fn test_email_unique_regardless_of_case() {
        let store = store().await;
        store
            .create_account("bob", "bob@example.com", "Tr0ub4dor&3", Role::Student, true)
            .await
            .unwrap();

        let err = store
            .create_account("eve", "BOB@example.com", "Tr0ub4dor&3", Role::Student, true)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Storage(StorageError::Constraint(_))));

        let owner = store.find_account_by_email("BOB@example.com").await.unwrap().unwrap();
        assert_eq!(owner.username, "bob");
    }

    #[tokio::test]
    async fn test_find_account_by_username_or_email() {
        let store = store().await;
        let account = store
            .create_account("alice", "alice@example.com", "Tr0ub4dor&3", Role::Student, false)
            .await
            .unwrap();

        let by_name = store.find_account("alice").await.unwrap().unwrap();
        let by_email = store.find_account("Alice@Example.com").await.unwrap().unwrap();
        assert_eq!(by_name.id, account.id);
        assert_eq!(by_email.id, account.id);
        assert!(store.find_account("bob").await.unwrap().is_none());
        assert!(
            store
                .find_account_by_email("alice@example.com")
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_find_account_by_username_ignores_email() {
        let store = store().await;
        let account = store
            .create_account("alice", "alice@example.com", "Tr0ub4dor&3", Role::Student, false)
            .await
            .unwrap();

        let found = store.find_account_by_username("alice").await.unwrap().unwrap();
        assert_eq!(found.id, account.id);
        assert!(
            store
                .find_account_by_username("alice@example.com")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_email_verification_flag() {
        let store = store().await;
        let account = store
            .create_account("alice", "alice@example.com", "Tr0ub4dor&3", Role::Student, false)
            .await
            .unwrap();

        assert!(!store.is_email_verified(&account.id).await.unwrap());
        store.set_email_verified(&account.id).await.unwrap();
        assert!(store.is_email_verified(&account.id).await.unwrap());

        let err = store
            .set_email_verified(&AccountId::new("acct_missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Storage(StorageError::NotFound)));
    }

    #[tokio::test]
    async fn test_change_password() {
        let store = store().await;
        let account = store
            .create_account("alice", "alice@example.com", "Tr0ub4dor&3", Role::Student, true)
            .await
            .unwrap();

        store.change_password(&account.id, "N3w-passphrase").await.unwrap();

        assert!(store.verify_and_issue("alice", "Tr0ub4dor&3").await.is_err());
        assert!(store.verify_and_issue("alice", "N3w-passphrase").await.is_ok());
    }

    #[tokio::test]
    async fn test_resolve_role() {
        let store = store().await;
        let account = store
            .create_account("alice", "alice@example.com", "Tr0ub4dor&3", Role::Student, true)
            .await
            .unwrap();

        assert_eq!(store.resolve_role(&account.id).await.unwrap(), Role::Student);
        store.set_role(&account.id, Role::Admin).await.unwrap();
        assert_eq!(store.resolve_role(&account.id).await.unwrap(), Role::Admin);

        let err = store
            .resolve_role(&AccountId::new("acct_missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::RoleLookupFailed(_))));
    }

    #[tokio::test]
    async fn test_unrecognised_role_is_lookup_failure() {
        let store = store().await;
        let account = store
            .create_account("alice", "alice@example.com", "Tr0ub4dor&3", Role::Student, true)
            .await
            .unwrap();

        sqlx::query("UPDATE accounts SET role = 'superuser' WHERE id = ?")
            .bind(account.id.as_str())
            .execute(&store.pool)
            .await
            .unwrap();

        let err = store.resolve_role(&account.id).await.unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::RoleLookupFailed(_))));
    }
}
