//! Prefixed identifiers.

use base64::{Engine, prelude::BASE64_URL_SAFE_NO_PAD};
use rand::{TryRngCore, rngs::OsRng};

use crate::error::CryptoError;

/// Generate `{prefix}_{random}` with 96 bits of URL-safe randomness.
pub fn generate_prefixed_id(prefix: &str) -> Result<String, CryptoError> {
    let mut bytes = [0u8; 12];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| CryptoError::Random(e.to_string()))?;

    Ok(format!("{prefix}_{}", BASE64_URL_SAFE_NO_PAD.encode(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixed_id_shape() {
        let id = generate_prefixed_id("acct").unwrap();
        assert!(id.starts_with("acct_"));
        assert_eq!(id.len(), "acct_".len() + 16);
        assert_ne!(id, generate_prefixed_id("acct").unwrap());
    }
}
