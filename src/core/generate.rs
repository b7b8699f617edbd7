//! # Generate
//!
//! Generate random strings for use in state, nonce, and challenge parameters.

use base64ct::{Base64UrlUnpadded, Encoding};

const SAFE_CHARS: &str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789)(*&^%$#@!~";
const STATE_LEN: usize = 32;

/// Generates a base64 encoded random string for nonce.
#[must_use]
pub fn nonce() -> String {
    let rnd = random_string(STATE_LEN, SAFE_CHARS);
    Base64UrlUnpadded::encode_string(rnd.as_bytes())
}

/// Generates a base64 encoded random string for `state`.
#[must_use]
pub fn state_key() -> String {
    let rnd = random_string(STATE_LEN, SAFE_CHARS);
    Base64UrlUnpadded::encode_string(rnd.as_bytes())
}

/// Generates a URN from a new v4 UUID, for credential and presentation ids.
#[must_use]
pub fn urn() -> String {
    format!("urn:uuid:{}", uuid::Uuid::new_v4())
}

// Generates a random string from a given set of characters. Uses fastrand so
// is not cryptographically secure.
fn random_string(len: usize, charset: &str) -> String {
    let chars: Vec<char> = charset.chars().collect();
    (0..len).map(|_| chars[fastrand::usize(..chars.len())]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonce_is_fresh() {
        assert_ne!(nonce(), nonce());
    }

    #[test]
    fn urn_shape() {
        assert!(urn().starts_with("urn:uuid:"));
    }
}
