//! JSON-backed user and portfolio repositories.
//!
//! Each write is one load-modify-save cycle through the atomic store.
//! Concurrent writers are not coordinated: the last save wins.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;
use valutatrade_rates::store::{load_typed, save_typed};
use valutatrade_rates::BlobStore;

use crate::error::{PortfolioError, PortfolioResult};
use crate::portfolio::Portfolio;
use crate::user::User;

#[derive(Debug, Default, Serialize, Deserialize)]
struct UsersFile {
    #[serde(default)]
    users: Vec<User>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PortfoliosFile {
    #[serde(default)]
    portfolios: Vec<Portfolio>,
}

/// Registered users, stored in `users.json`.
#[derive(Clone)]
pub struct UserRepository {
    store: Arc<dyn BlobStore>,
}

impl UserRepository {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }

    pub fn all(&self) -> PortfolioResult<Vec<User>> {
        let file: UsersFile = load_typed(self.store.as_ref())?;
        Ok(file.users)
    }

    pub fn find_by_username(&self, username: &str) -> PortfolioResult<Option<User>> {
        Ok(self.all()?.into_iter().find(|u| u.username == username))
    }

    pub fn find_by_id(&self, user_id: u64) -> PortfolioResult<Option<User>> {
        Ok(self.all()?.into_iter().find(|u| u.user_id == user_id))
    }

    /// Next free id: one past the highest existing id.
    pub fn next_id(&self) -> PortfolioResult<u64> {
        Ok(self.all()?.iter().map(|u| u.user_id).max().unwrap_or(0) + 1)
    }

    /// Add a user. Fails if the username is taken.
    pub fn insert(&self, user: User) -> PortfolioResult<()> {
        let mut file: UsersFile = load_typed(self.store.as_ref())?;
        if file.users.iter().any(|u| u.username == user.username) {
            return Err(PortfolioError::UserExists(user.username));
        }
        debug!(user_id = user.user_id, "Inserting user");
        file.users.push(user);
        Ok(save_typed(self.store.as_ref(), &file)?)
    }
}

/// User portfolios, stored in `portfolios.json`.
#[derive(Clone)]
pub struct PortfolioRepository {
    store: Arc<dyn BlobStore>,
}

impl PortfolioRepository {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }

    pub fn get(&self, user_id: u64) -> PortfolioResult<Portfolio> {
        let file: PortfoliosFile = load_typed(self.store.as_ref())?;
        file.portfolios
            .into_iter()
            .find(|p| p.user_id == user_id)
            .ok_or(PortfolioError::PortfolioNotFound(user_id))
    }

    /// Insert or replace the portfolio of its user.
    pub fn save(&self, portfolio: &Portfolio) -> PortfolioResult<()> {
        let mut file: PortfoliosFile = load_typed(self.store.as_ref())?;
        match file.portfolios.iter_mut().find(|p| p.user_id == portfolio.user_id) {
            Some(existing) => *existing = portfolio.clone(),
            None => file.portfolios.push(portfolio.clone()),
        }
        debug!(user_id = portfolio.user_id, "Saving portfolio");
        Ok(save_typed(self.store.as_ref(), &file)?)
    }
}
