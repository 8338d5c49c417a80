//! Ledger account resolution and journal generation.
//!
//! This module contains the [`AccountResolver`] with its wildcard-company
//! fallback, a read-through [`AccountCache`], and the journal builder that
//! turns a payroll outcome into balanced ledger lines.

mod cache;
mod journal;
mod resolver;

pub use cache::{AccountCache, AccountKey, CachedResolver, InMemoryAccountCache};
pub use journal::build_journal;
pub use resolver::{AccountLookup, AccountResolver};
