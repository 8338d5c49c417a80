//! Read-through cache for resolved accounts.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::config::AccountsConfig;
use crate::error::EngineResult;
use crate::models::{Direction, PayrollComponent};

use super::resolver::{AccountLookup, AccountResolver};

/// Cache key of one resolved leg.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountKey {
    /// The component.
    pub component: PayrollComponent,
    /// The leg.
    pub direction: Direction,
    /// The company.
    pub company: String,
}

/// Storage for resolved account ids.
///
/// Entries stay valid until [`AccountCache::invalidate`] is called; callers
/// must invalidate whenever mappings or the account directory change.
pub trait AccountCache: Send + Sync {
    /// Returns the cached account for `key`, calling `load` on a miss and
    /// caching its result. Errors are not cached.
    fn get_or_load(
        &self,
        key: &AccountKey,
        load: &dyn Fn() -> EngineResult<String>,
    ) -> EngineResult<String>;

    /// Drops every entry of `company`, or everything when `company` is `None`.
    fn invalidate(&self, company: Option<&str>);
}

/// [`AccountCache`] backed by a `RwLock<HashMap>`.
#[derive(Debug, Default)]
pub struct InMemoryAccountCache {
    entries: RwLock<HashMap<AccountKey, String>>,
}

impl InMemoryAccountCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AccountCache for InMemoryAccountCache {
    fn get_or_load(
        &self,
        key: &AccountKey,
        load: &dyn Fn() -> EngineResult<String>,
    ) -> EngineResult<String> {
        if let Some(account) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
        {
            return Ok(account.clone());
        }

        let account = load()?;
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), account.clone());
        Ok(account)
    }

    fn invalidate(&self, company: Option<&str>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match company {
            Some(company) => entries.retain(|key, _| key.company != company),
            None => entries.clear(),
        }
    }
}

/// An [`AccountResolver`] fronted by an [`AccountCache`].
///
/// The resolver can be swapped at runtime with [`CachedResolver::reload`],
/// which invalidates the whole cache.
pub struct CachedResolver<C: AccountCache = InMemoryAccountCache> {
    resolver: RwLock<Arc<AccountResolver>>,
    cache: C,
}

impl CachedResolver<InMemoryAccountCache> {
    /// Wraps `resolver` with an empty in-memory cache.
    pub fn new(resolver: AccountResolver) -> Self {
        Self::with_cache(resolver, InMemoryAccountCache::new())
    }
}

impl<C: AccountCache> CachedResolver<C> {
    /// Wraps `resolver` with the given cache.
    pub fn with_cache(resolver: AccountResolver, cache: C) -> Self {
        Self {
            resolver: RwLock::new(Arc::new(resolver)),
            cache,
        }
    }

    /// Validates `config`, replaces the resolver and clears the cache.
    ///
    /// On a validation error the previous resolver and cache stay in place.
    pub fn reload(&self, config: &AccountsConfig) -> EngineResult<()> {
        let resolver = AccountResolver::new(config)?;
        *self.resolver.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(resolver);
        self.cache.invalidate(None);
        tracing::info!("Account mappings reloaded; cache invalidated");
        Ok(())
    }

    /// The cache in front of the resolver.
    pub fn cache(&self) -> &C {
        &self.cache
    }

    fn current(&self) -> Arc<AccountResolver> {
        Arc::clone(&self.resolver.read().unwrap_or_else(PoisonError::into_inner))
    }
}

impl<C: AccountCache> AccountLookup for CachedResolver<C> {
    fn resolve(
        &self,
        component: PayrollComponent,
        direction: Direction,
        company: &str,
    ) -> EngineResult<String> {
        let key = AccountKey {
            component,
            direction,
            company: company.to_string(),
        };
        let resolver = self.current();
        self.cache
            .get_or_load(&key, &|| resolver.resolve(component, direction, company))
    }
}
