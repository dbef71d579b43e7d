//! ValutaTrade Common Types
//!
//! Shared types used across the ValutaTrade workspace: validated currency
//! codes, the currency registry, pair keys, money amounts, settings and
//! time helpers.

pub mod currency;
pub mod registry;
pub mod monetary;
pub mod error;
pub mod settings;
pub mod time;

pub use currency::*;
pub use registry::*;
pub use monetary::*;
pub use error::*;
pub use settings::Settings;
pub use time::*;
