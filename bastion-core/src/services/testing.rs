//! In-memory collaborators shared by the service tests.

use std::sync::{
    Mutex,
    atomic::{AtomicBool, AtomicU32, Ordering},
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::mpsc;

use crate::{
    Account, AccountId, Error, IssuedSession, Role,
    credentials::CredentialStore,
    error::{AuthError, DispatchError, StorageError},
    notification::{Notification, Notifier},
    repositories::{
        AttemptLedgerRepository, AuditRepository, ResetTokenRepository,
        VerificationCodeRepository,
    },
    storage::{
        LoginAttempt, NewSecurityEvent, NewVerificationCode, ResetToken, SecurityEvent,
        VerificationCode,
    },
};

fn unavailable() -> Error {
    Error::Storage(StorageError::Connection("mock storage offline".to_string()))
}

pub struct MockAttemptLedgerRepository {
    attempts: Mutex<Vec<LoginAttempt>>,
    failing: AtomicBool,
}

impl MockAttemptLedgerRepository {
    pub fn new() -> Self {
        Self {
            attempts: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn attempts(&self) -> Vec<LoginAttempt> {
        self.attempts.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), Error> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(())
    }
}

#[async_trait]
impl AttemptLedgerRepository for MockAttemptLedgerRepository {
    async fn record_attempt(
        &self,
        username: &str,
        client_address: &str,
        succeeded: bool,
        attempted_at: DateTime<Utc>,
    ) -> Result<LoginAttempt, Error> {
        self.check()?;
        let mut attempts = self.attempts.lock().unwrap();
        let attempt = LoginAttempt {
            id: attempts.len() as i64 + 1,
            username: username.to_string(),
            client_address: client_address.to_string(),
            attempted_at,
            succeeded,
        };
        attempts.push(attempt.clone());
        Ok(attempt)
    }

    async fn count_failures_since(
        &self,
        username: &str,
        client_address: &str,
        since: DateTime<Utc>,
    ) -> Result<u32, Error> {
        self.check()?;
        let attempts = self.attempts.lock().unwrap();
        Ok(attempts
            .iter()
            .filter(|a| {
                !a.succeeded
                    && a.attempted_at >= since
                    && (a.username == username || a.client_address == client_address)
            })
            .count() as u32)
    }

    async fn cleanup_attempts_before(&self, before: DateTime<Utc>) -> Result<u64, Error> {
        self.check()?;
        let mut attempts = self.attempts.lock().unwrap();
        let before_len = attempts.len();
        attempts.retain(|a| a.attempted_at >= before);
        Ok((before_len - attempts.len()) as u64)
    }
}

pub struct MockVerificationCodeRepository {
    codes: Mutex<Vec<VerificationCode>>,
}

impl MockVerificationCodeRepository {
    pub fn new() -> Self {
        Self {
            codes: Mutex::new(Vec::new()),
        }
    }

    pub fn codes(&self) -> Vec<VerificationCode> {
        self.codes.lock().unwrap().clone()
    }
}

#[async_trait]
impl VerificationCodeRepository for MockVerificationCodeRepository {
    async fn create_code(&self, code: NewVerificationCode) -> Result<VerificationCode, Error> {
        let mut codes = self.codes.lock().unwrap();
        let code = VerificationCode {
            id: codes.len() as i64 + 1,
            account_id: code.account_id,
            code_hash: code.code_hash,
            salt: code.salt,
            created_at: code.created_at,
            used: false,
            attempt_count: 0,
            max_attempts: code.max_attempts,
        };
        codes.push(code.clone());
        Ok(code)
    }

    async fn latest_for_account(
        &self,
        account_id: &AccountId,
    ) -> Result<Option<VerificationCode>, Error> {
        let codes = self.codes.lock().unwrap();
        Ok(codes
            .iter()
            .filter(|c| &c.account_id == account_id)
            .max_by_key(|c| (c.created_at, c.id))
            .cloned())
    }

    async fn find_code(&self, id: i64) -> Result<Option<VerificationCode>, Error> {
        Ok(self.codes.lock().unwrap().iter().find(|c| c.id == id).cloned())
    }

    async fn register_attempt(&self, id: i64) -> Result<Option<u32>, Error> {
        let mut codes = self.codes.lock().unwrap();
        Ok(codes
            .iter_mut()
            .find(|c| c.id == id && !c.used && c.attempt_count < c.max_attempts)
            .map(|c| {
                c.attempt_count += 1;
                c.attempt_count
            }))
    }

    async fn mark_used(&self, id: i64) -> Result<bool, Error> {
        let mut codes = self.codes.lock().unwrap();
        match codes.iter_mut().find(|c| c.id == id && !c.used) {
            Some(code) => {
                code.used = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn cleanup_codes_before(&self, before: DateTime<Utc>) -> Result<u64, Error> {
        let mut codes = self.codes.lock().unwrap();
        let before_len = codes.len();
        codes.retain(|c| c.created_at >= before);
        Ok((before_len - codes.len()) as u64)
    }
}

pub struct MockResetTokenRepository {
    tokens: Mutex<Vec<ResetToken>>,
    failing_releases: AtomicU32,
}

impl MockResetTokenRepository {
    pub fn new() -> Self {
        Self {
            tokens: Mutex::new(Vec::new()),
            failing_releases: AtomicU32::new(0),
        }
    }

    /// Fail the next `count` calls to `release`.
    pub fn set_failing_releases(&self, count: u32) {
        self.failing_releases.store(count, Ordering::SeqCst);
    }

    pub fn tokens(&self) -> Vec<ResetToken> {
        self.tokens.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResetTokenRepository for MockResetTokenRepository {
    async fn create_token(
        &self,
        account_id: &AccountId,
        token_hash: &str,
        created_at: DateTime<Utc>,
    ) -> Result<ResetToken, Error> {
        let mut tokens = self.tokens.lock().unwrap();
        let token = ResetToken {
            id: tokens.len() as i64 + 1,
            account_id: account_id.clone(),
            token_hash: token_hash.to_string(),
            created_at,
            used: false,
        };
        tokens.push(token.clone());
        Ok(token)
    }

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<ResetToken>, Error> {
        Ok(self
            .tokens
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.token_hash == token_hash)
            .cloned())
    }

    async fn claim(&self, id: i64) -> Result<bool, Error> {
        let mut tokens = self.tokens.lock().unwrap();
        match tokens.iter_mut().find(|t| t.id == id && !t.used) {
            Some(token) => {
                token.used = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn release(&self, id: i64) -> Result<(), Error> {
        if self
            .failing_releases
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(unavailable());
        }
        if let Some(token) = self.tokens.lock().unwrap().iter_mut().find(|t| t.id == id) {
            token.used = false;
        }
        Ok(())
    }

    async fn cleanup_tokens_before(&self, before: DateTime<Utc>) -> Result<u64, Error> {
        let mut tokens = self.tokens.lock().unwrap();
        let before_len = tokens.len();
        tokens.retain(|t| t.created_at >= before);
        Ok((before_len - tokens.len()) as u64)
    }
}

pub struct MockAuditRepository {
    events: Mutex<Vec<SecurityEvent>>,
    failing: AtomicBool,
}

impl MockAuditRepository {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<SecurityEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditRepository for MockAuditRepository {
    async fn record_event(&self, event: NewSecurityEvent) -> Result<SecurityEvent, Error> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        let mut events = self.events.lock().unwrap();
        let event = SecurityEvent {
            id: events.len() as i64 + 1,
            account_id: event.account_id,
            client_address: event.client_address,
            kind: event.kind,
            metadata: event.metadata,
            created_at: event.created_at,
        };
        events.push(event.clone());
        Ok(event)
    }

    async fn recent_events(&self, limit: u32) -> Result<Vec<SecurityEvent>, Error> {
        let events = self.events.lock().unwrap();
        Ok(events.iter().rev().take(limit as usize).cloned().collect())
    }
}

#[derive(Clone)]
pub struct MockAccount {
    pub account: Account,
    pub password: String,
    pub role: String,
}

pub struct MockCredentialStore {
    accounts: Mutex<Vec<MockAccount>>,
    failing_password_change: AtomicBool,
    failing_verify: AtomicBool,
}

impl MockCredentialStore {
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(Vec::new()),
            failing_password_change: AtomicBool::new(false),
            failing_verify: AtomicBool::new(false),
        }
    }

    pub fn add_account(&self, username: &str, email: &str, password: &str, verified: bool) -> Account {
        let account = Account {
            id: AccountId::new(&format!("acct_{username}")),
            username: username.to_string(),
            email: email.to_string(),
            email_verified_at: verified.then(Utc::now),
        };
        self.accounts.lock().unwrap().push(MockAccount {
            account: account.clone(),
            password: password.to_string(),
            role: "student".to_string(),
        });
        account
    }

    pub fn set_role(&self, account_id: &AccountId, role: &str) {
        if let Some(entry) = self
            .accounts
            .lock()
            .unwrap()
            .iter_mut()
            .find(|a| &a.account.id == account_id)
        {
            entry.role = role.to_string();
        }
    }

    pub fn set_failing_password_change(&self, failing: bool) {
        self.failing_password_change.store(failing, Ordering::SeqCst);
    }

    pub fn set_failing_verify(&self, failing: bool) {
        self.failing_verify.store(failing, Ordering::SeqCst);
    }

    pub fn password_of(&self, account_id: &AccountId) -> Option<String> {
        self.entry(account_id).map(|a| a.password)
    }

    pub fn verified(&self, account_id: &AccountId) -> bool {
        self.entry(account_id)
            .is_some_and(|a| a.account.email_verified_at.is_some())
    }

    fn entry(&self, account_id: &AccountId) -> Option<MockAccount> {
        self.accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| &a.account.id == account_id)
            .cloned()
    }
}

#[async_trait]
impl CredentialStore for MockCredentialStore {
    async fn verify_and_issue(
        &self,
        username: &str,
        password: &str,
    ) -> Result<IssuedSession, Error> {
        if self.failing_verify.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        let accounts = self.accounts.lock().unwrap();
        match accounts
            .iter()
            .find(|a| a.account.username == username && a.password == password)
        {
            Some(entry) => Ok(IssuedSession {
                account_id: entry.account.id.clone(),
                token: format!("token-{}", entry.account.id),
                expires_at: Utc::now() + Duration::hours(1),
            }),
            None => Err(AuthError::InvalidCredentials.into()),
        }
    }

    async fn find_account(&self, identifier: &str) -> Result<Option<Account>, Error> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.account.username == identifier || a.account.email == identifier)
            .map(|a| a.account.clone()))
    }

    async fn find_account_by_username(&self, username: &str) -> Result<Option<Account>, Error> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.account.username == username)
            .map(|a| a.account.clone()))
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, Error> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.account.email == email)
            .map(|a| a.account.clone()))
    }

    async fn get_account(&self, account_id: &AccountId) -> Result<Option<Account>, Error> {
        Ok(self.entry(account_id).map(|a| a.account))
    }

    async fn change_password(
        &self,
        account_id: &AccountId,
        new_password: &str,
    ) -> Result<(), Error> {
        if self.failing_password_change.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        let mut accounts = self.accounts.lock().unwrap();
        let entry = accounts
            .iter_mut()
            .find(|a| &a.account.id == account_id)
            .ok_or(Error::Storage(StorageError::NotFound))?;
        entry.password = new_password.to_string();
        Ok(())
    }

    async fn is_email_verified(&self, account_id: &AccountId) -> Result<bool, Error> {
        Ok(self.verified(account_id))
    }

    async fn set_email_verified(&self, account_id: &AccountId) -> Result<(), Error> {
        let mut accounts = self.accounts.lock().unwrap();
        if let Some(entry) = accounts.iter_mut().find(|a| &a.account.id == account_id) {
            entry.account.email_verified_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn resolve_role(&self, account_id: &AccountId) -> Result<Role, Error> {
        let entry = self
            .entry(account_id)
            .ok_or_else(|| AuthError::RoleLookupFailed(format!("no account {account_id}")))?;
        Ok(entry.role.parse::<Role>()?)
    }
}

/// Forwards every notification to a channel so tests can await delivery.
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<(String, Notification)>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(String, Notification)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn notify(&self, to: &str, notification: Notification) -> Result<(), DispatchError> {
        self.tx
            .send((to.to_string(), notification))
            .map_err(|e| DispatchError::Delivery(e.to_string()))
    }
}
