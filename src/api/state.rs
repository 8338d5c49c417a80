//! Application state for the payroll deduction API.
//!
//! This module defines the shared application state that is available
//! to all request handlers.

use std::sync::Arc;

use crate::accounts::{AccountResolver, CachedResolver};
use crate::config::ConfigLoader;
use crate::error::EngineResult;

/// Shared application state.
///
/// Holds the loaded rate snapshot and the cached account resolver built
/// from the same configuration.
#[derive(Clone)]
pub struct AppState {
    config: Arc<ConfigLoader>,
    accounts: Arc<CachedResolver>,
}

impl AppState {
    /// Creates the state, validating the account mappings.
    pub fn new(config: ConfigLoader) -> EngineResult<Self> {
        let resolver = AccountResolver::new(config.accounts())?;
        Ok(Self {
            config: Arc::new(config),
            accounts: Arc::new(CachedResolver::new(resolver)),
        })
    }

    /// Returns a reference to the configuration loader.
    pub fn config(&self) -> &ConfigLoader {
        &self.config
    }

    /// Returns the account resolver.
    pub fn accounts(&self) -> &CachedResolver {
        &self.accounts
    }
}
