//! Cryptographic helpers for reset tokens and verification codes.
//!
//! Reset tokens carry 256 bits of entropy, so a plain SHA-256 digest is enough
//! to store them and look them up. Verification codes are only six digits and
//! are stored as `HMAC-SHA256(key = per-code random salt, message = code)`;
//! comparison recomputes the MAC with the stored salt and checks it in
//! constant time.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use rand::{Rng, TryRngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::CryptoError;

type HmacSha256 = Hmac<Sha256>;

/// Number of random bytes in a reset token.
pub const TOKEN_BYTES: usize = 32;

/// Number of random bytes in a verification code salt.
pub const SALT_BYTES: usize = 16;

/// Smallest and largest verification code; six digits with no leading zero.
pub const CODE_MIN: u32 = 100_000;
pub const CODE_MAX: u32 = 999_999;

/// Generate a URL-safe random token with 256 bits of entropy (43 characters).
pub fn generate_secure_token() -> Result<String, CryptoError> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| CryptoError::Random(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Hex-encoded SHA-256 digest of a token, used as its storage key.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Draw a verification code uniformly from `[100000, 999999]`.
pub fn generate_verification_code() -> String {
    rand::rng().random_range(CODE_MIN..=CODE_MAX).to_string()
}

/// Fresh random salt for one verification code.
pub fn generate_salt() -> Result<Vec<u8>, CryptoError> {
    let mut salt = vec![0u8; SALT_BYTES];
    OsRng
        .try_fill_bytes(&mut salt)
        .map_err(|e| CryptoError::Random(e.to_string()))?;
    Ok(salt)
}

/// `HMAC-SHA256(salt, code)`.
pub fn hash_code(code: &str, salt: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut mac =
        HmacSha256::new_from_slice(salt).map_err(|e| CryptoError::Mac(e.to_string()))?;
    mac.update(code.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Recompute the code MAC with the stored salt and compare in constant time.
pub fn verify_code(code: &str, salt: &[u8], stored_hash: &[u8]) -> Result<bool, CryptoError> {
    let computed = hash_code(code, salt)?;
    Ok(constant_time_compare(&computed, stored_hash))
}

/// Whether `candidate` has the shape of an issued code: exactly six ASCII digits.
pub fn is_well_formed_code(candidate: &str) -> bool {
    candidate.len() == 6 && candidate.bytes().all(|b| b.is_ascii_digit())
}

/// Constant-time equality for byte slices of equal length.
pub fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_token_shape() {
        let token = generate_secure_token().unwrap();
        assert_eq!(token.len(), 43);
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
        assert_ne!(token, generate_secure_token().unwrap());
    }

    #[test]
    fn test_hash_token_is_stable_hex_digest() {
        let token = generate_secure_token().unwrap();
        let hash = hash_token(&token);

        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hash, hash_token(&token));
        assert_ne!(hash, hash_token("something-else"));
    }

    #[test]
    fn test_verification_code_range() {
        for _ in 0..1000 {
            let code = generate_verification_code();
            assert!(is_well_formed_code(&code));
            let value: u32 = code.parse().unwrap();
            assert!((CODE_MIN..=CODE_MAX).contains(&value));
        }
    }

    #[test]
    fn test_code_hash_depends_on_salt() {
        let salt_a = generate_salt().unwrap();
        let salt_b = generate_salt().unwrap();
        assert_eq!(salt_a.len(), SALT_BYTES);
        assert_ne!(salt_a, salt_b);

        let hash_a = hash_code("123456", &salt_a).unwrap();
        let hash_b = hash_code("123456", &salt_b).unwrap();
        assert_eq!(hash_a.len(), 32);
        assert_ne!(hash_a, hash_b);
    }

    #[test]
    fn test_verify_code() {
        let salt = generate_salt().unwrap();
        let hash = hash_code("654321", &salt).unwrap();

        assert!(verify_code("654321", &salt, &hash).unwrap());
        assert!(!verify_code("654322", &salt, &hash).unwrap());
    }

    #[test]
    fn test_code_format() {
        assert!(is_well_formed_code("100000"));
        assert!(!is_well_formed_code("12345"));
        assert!(!is_well_formed_code("1234567"));
        assert!(!is_well_formed_code("12a456"));
        assert!(!is_well_formed_code("١٢٣٤٥٦"));
        assert!(!is_well_formed_code(" 12345"));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare(b"hello", b"hello"));
        assert!(!constant_time_compare(b"hello", b"world"));
        assert!(!constant_time_compare(b"short", b"longer_string"));
    }
}
