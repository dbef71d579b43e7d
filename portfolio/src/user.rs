//! Registered users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use valutatrade_crypto::{generate_salt, hash_password, verify_password};

use crate::error::{PortfolioError, PortfolioResult};

/// Minimum password length.
pub const MIN_PASSWORD_LEN: usize = 4;

/// A registered user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_id: u64,
    pub username: String,
    /// Hex SHA-256 of password followed by salt.
    pub hashed_password: String,
    pub salt: String,
    pub registration_date: DateTime<Utc>,
}

impl User {
    /// Create a user with a freshly salted password hash.
    pub fn new(user_id: u64, username: &str, password: &str) -> PortfolioResult<Self> {
        let username = validate_username(username)?;
        validate_password(password)?;

        let salt = generate_salt();
        Ok(Self {
            user_id,
            hashed_password: hash_password(password, &salt),
            salt,
            username,
            registration_date: Utc::now(),
        })
    }

    pub fn verify_password(&self, password: &str) -> bool {
        verify_password(password, &self.salt, &self.hashed_password)
    }

    /// Replace the password, rotating the salt.
    pub fn change_password(&mut self, new_password: &str) -> PortfolioResult<()> {
        validate_password(new_password)?;
        self.salt = generate_salt();
        self.hashed_password = hash_password(new_password, &self.salt);
        Ok(())
    }

    /// Multi-line description without credentials.
    pub fn info(&self) -> String {
        format!(
            "User ID: {}\nUsername: {}\nRegistration Date: {}",
            self.user_id,
            self.username,
            self.registration_date.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

/// Trim a username and reject empty ones.
pub fn validate_username(username: &str) -> PortfolioResult<String> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        return Err(PortfolioError::InvalidUsername);
    }
    Ok(trimmed.to_string())
}

fn validate_password(password: &str) -> PortfolioResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(PortfolioError::PasswordTooShort {
            min: MIN_PASSWORD_LEN,
        });
    }
    Ok(())
}
