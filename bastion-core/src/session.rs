//! Signed session tokens.
//!
//! The credential store mints these after a successful password check. Claims
//! carry the account's username, email and role so downstream services can
//! make coarse decisions without a lookup.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{
    Account, AccountId, Error, IssuedSession, Role,
    error::{AuthError, CryptoError, ValidationError},
};

/// Key material used to sign and verify session tokens.
#[derive(Clone)]
pub enum SigningKey {
    /// HS256 with a shared secret.
    Hmac(Vec<u8>),
    /// RS256 with PEM encoded keys.
    Rsa { private_pem: Vec<u8>, public_pem: Vec<u8> },
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SigningKey::Hmac(_) => f.write_str("SigningKey::Hmac(..)"),
            SigningKey::Rsa { .. } => f.write_str("SigningKey::Rsa(..)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub key: SigningKey,
    pub issuer: Option<String>,
}

impl JwtConfig {
    pub fn new_hs256(secret: Vec<u8>) -> Self {
        Self {
            key: SigningKey::Hmac(secret),
            issuer: None,
        }
    }

    pub fn new_rs256(private_pem: Vec<u8>, public_pem: Vec<u8>) -> Self {
        Self {
            key: SigningKey::Rsa {
                private_pem,
                public_pem,
            },
            issuer: None,
        }
    }

    pub fn from_rs256_pem_files(
        private_key_path: impl AsRef<Path>,
        public_key_path: impl AsRef<Path>,
    ) -> Result<Self, Error> {
        let read_pem = |path: &Path| {
            std::fs::read(path).map_err(|e| {
                ValidationError::InvalidField(format!("Cannot read {}: {e}", path.display()))
            })
        };

        Ok(Self::new_rs256(
            read_pem(private_key_path.as_ref())?,
            read_pem(public_key_path.as_ref())?,
        ))
    }

    /// HS256 keyed by `BASTION_JWT_SECRET`, which must be at least 32 bytes.
    pub fn from_env() -> Result<Self, Error> {
        let secret = std::env::var("BASTION_JWT_SECRET").map_err(|_| {
            ValidationError::MissingField("BASTION_JWT_SECRET is not set".to_string())
        })?;
        if secret.len() < 32 {
            return Err(ValidationError::InvalidField(
                "BASTION_JWT_SECRET must be at least 32 bytes".to_string(),
            )
            .into());
        }
        Ok(Self::new_hs256(secret.into_bytes()).with_issuer("bastion"))
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    fn algorithm(&self) -> Algorithm {
        match self.key {
            SigningKey::Hmac(_) => Algorithm::HS256,
            SigningKey::Rsa { .. } => Algorithm::RS256,
        }
    }

    fn encoding_key(&self) -> Result<EncodingKey, Error> {
        match &self.key {
            SigningKey::Hmac(secret) => Ok(EncodingKey::from_secret(secret)),
            SigningKey::Rsa { private_pem, .. } => EncodingKey::from_rsa_pem(private_pem)
                .map_err(|e| ValidationError::InvalidField(format!("RSA private key: {e}")).into()),
        }
    }

    fn decoding_key(&self) -> Result<DecodingKey, Error> {
        match &self.key {
            SigningKey::Hmac(secret) => Ok(DecodingKey::from_secret(secret)),
            SigningKey::Rsa { public_pem, .. } => DecodingKey::from_rsa_pem(public_pem)
                .map_err(|e| ValidationError::InvalidField(format!("RSA public key: {e}")).into()),
        }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(self.algorithm());
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }
        validation
    }
}

/// Claims embedded in every session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Account identifier
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl SessionClaims {
    pub fn for_account(
        account: &Account,
        role: Role,
        issued_at: DateTime<Utc>,
        ttl: Duration,
        issuer: Option<String>,
    ) -> Self {
        Self {
            sub: account.id.to_string(),
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
            iss: issuer,
            username: account.username.clone(),
            email: account.email.clone(),
            role,
        }
    }

    pub fn account_id(&self) -> AccountId {
        AccountId::new(&self.sub)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// Sign `claims` into a compact JWT.
pub fn encode_session(claims: &SessionClaims, config: &JwtConfig) -> Result<String, Error> {
    let header = Header::new(config.algorithm());
    let encoding_key = config.encoding_key()?;

    encode(&header, claims, &encoding_key)
        .map_err(|e| CryptoError::JwtSigning(format!("Failed to encode JWT: {e}")).into())
}

/// Verify a JWT and return its claims.
///
/// Bad signatures, expired tokens and malformed input are all `InvalidCredentials`.
pub fn decode_session(token: &str, config: &JwtConfig) -> Result<SessionClaims, Error> {
    let decoding_key = config.decoding_key()?;
    let validation = config.validation();

    let token_data = decode::<SessionClaims>(token, &decoding_key, &validation).map_err(|e| {
        tracing::debug!(error = %e, "Session token rejected");
        AuthError::InvalidCredentials
    })?;

    Ok(token_data.claims)
}

/// Mint a signed [`IssuedSession`] for `account`.
pub fn issue_session(
    account: &Account,
    role: Role,
    issued_at: DateTime<Utc>,
    ttl: Duration,
    config: &JwtConfig,
) -> Result<IssuedSession, Error> {
    let claims = SessionClaims::for_account(account, role, issued_at, ttl, config.issuer.clone());
    let token = encode_session(&claims, config)?;

    Ok(IssuedSession {
        account_id: account.id.clone(),
        token,
        expires_at: issued_at + ttl,
    })
}
