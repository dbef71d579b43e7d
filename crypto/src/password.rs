//! Salted password hashing.

use rand::RngCore;

use crate::hash::{sha256_hex, to_hex};

/// Salt length in bytes before hex encoding.
pub const SALT_LEN: usize = 16;

/// Generate a random hex-encoded salt.
pub fn generate_salt() -> String {
    let mut bytes = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut bytes);
    to_hex(&bytes)
}

/// Hash a password with its salt: `sha256_hex(password || salt)`.
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut input = String::with_capacity(password.len() + salt.len());
    input.push_str(password);
    input.push_str(salt);
    sha256_hex(input.as_bytes())
}

/// Check a candidate password against a stored hash and salt.
pub fn verify_password(password: &str, salt: &str, expected_hash: &str) -> bool {
    let computed = hash_password(password, salt);
    // Constant-time comparison over equal-length hex digests.
    computed.len() == expected_hash.len()
        && computed
            .bytes()
            .zip(expected_hash.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_salt_shape() {
        let salt = generate_salt();
        assert_eq!(salt.len(), SALT_LEN * 2);
        assert!(salt.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(salt, generate_salt());
    }

    #[test]
    fn test_hash_is_salted() {
        let a = hash_password("secret", "aa");
        let b = hash_password("secret", "bb");
        assert_ne!(a, b);
        assert_eq!(a, sha256_hex(b"secretaa"));
    }

    #[test]
    fn test_verify_password() {
        let salt = generate_salt();
        let stored = hash_password("hunter2", &salt);

        assert!(verify_password("hunter2", &salt, &stored));
        assert!(!verify_password("hunter3", &salt, &stored));
        assert!(!verify_password("hunter2", "other", &stored));
        assert!(!verify_password("hunter2", &salt, "short"));
    }
}
