//! ValutaTrade Cryptographic Primitives
//!
//! SHA-256 helpers and salted password hashing for stored user credentials.

pub mod hash;
pub mod password;

pub use hash::{sha256, sha256_hex};
pub use password::{generate_salt, hash_password, verify_password};
