//! Configuration loading and management for the payroll deduction engine.
//!
//! This module loads BPJS rates, PTKP amounts, progressive brackets, flat
//! effective rate tables and ledger account mappings from YAML files.
//!
//! # Example
//!
//! ```no_run
//! use pph21_engine::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config/id2024").unwrap();
//! println!("Minimum wage: {}", config.settings().minimum_wage);
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{
    AccountsConfig, BpjsRates, FlatRateRange, FlatRateTable, PositionCostConfig, ProgramRate,
    RateConfig, RoundingPolicy, Settings, TaxBracket,
};
