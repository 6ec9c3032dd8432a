//! Bearer token generation and digests.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use rand::Rng;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use super::AuthError;

type HmacSha256 = Hmac<Sha256>;

/// Random bytes per token.
const TOKEN_BYTES: usize = 32;

/// Generate a new random bearer token (base64url, no padding).
#[must_use]
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Hex HMAC-SHA256 of `token` keyed with `secret`. This is what gets stored.
///
/// # Errors
///
/// Returns `AuthError::TokenDigest` if the key is rejected.
pub fn digest_token(secret: &SecretString, token: &str) -> Result<String, AuthError> {
    let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
        .map_err(|_| AuthError::TokenDigest)?;
    mac.update(token.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_tokens_are_unique_and_url_safe() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(
            a.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_digest_depends_on_secret() {
        let token = "tok";
        let one = digest_token(&SecretString::from("first-key"), token).unwrap();
        let again = digest_token(&SecretString::from("first-key"), token).unwrap();
        let other = digest_token(&SecretString::from("second-key"), token).unwrap();

        assert_eq!(one, again);
        assert_ne!(one, other);
        assert_eq!(one.len(), 64);
    }
}
