//! Login session persisted between CLI invocations.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;
use valutatrade_rates::store::{load_typed, save_typed};
use valutatrade_rates::BlobStore;

use crate::error::{PortfolioError, PortfolioResult};

/// The current login, passed explicitly to every use case.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub user_id: Option<u64>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self { user_id: None }
    }

    pub fn for_user(user_id: u64) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    /// The logged-in user id, or `NotAuthenticated`.
    pub fn require_user(&self) -> PortfolioResult<u64> {
        self.user_id.ok_or(PortfolioError::NotAuthenticated)
    }
}

/// Session file storage.
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn BlobStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }

    pub fn load(&self) -> PortfolioResult<Session> {
        Ok(load_typed(self.store.as_ref())?)
    }

    pub fn save(&self, session: &Session) -> PortfolioResult<()> {
        debug!(user_id = ?session.user_id, "Saving session");
        Ok(save_typed(self.store.as_ref(), session)?)
    }

    pub fn clear(&self) -> PortfolioResult<()> {
        self.save(&Session::anonymous())
    }
}
