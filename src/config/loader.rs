//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading contribution
//! rates, tax tables and ledger mappings from YAML files.

use std::fs;
use std::path::Path;

use crate::error::{EngineError, EngineResult};

use super::types::{
    AccountsConfig, BpjsRates, BracketsFile, FlatRateTable, PtkpFile, RateConfig, Settings,
};

/// Loads and provides access to the engine configuration.
///
/// The `ConfigLoader` reads YAML configuration files from a directory,
/// validates them and keeps them as an immutable snapshot for the run.
///
/// # Directory Structure
///
/// ```text
/// config/id2024/
/// ├── settings.yaml    # Minimum wage, position cost, policies
/// ├── bpjs.yaml        # BPJS percentages and salary caps
/// ├── ptkp.yaml        # Non-taxable allowance per status
/// ├── brackets.yaml    # Progressive brackets
/// ├── flat_rates.yaml  # Flat effective rate categories
/// └── accounts.yaml    # Companies, account directory, mappings
/// ```
///
/// # Example
///
/// ```no_run
/// use pph21_engine::config::ConfigLoader;
/// use pph21_engine::models::TaxStatus;
///
/// let loader = ConfigLoader::load("./config/id2024").unwrap();
/// let ptkp = loader.rates().ptkp_for(TaxStatus::K1).unwrap();
/// println!("PTKP K1: {}", ptkp);
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    rates: RateConfig,
    accounts: AccountsConfig,
}

impl ConfigLoader {
    /// Loads configuration from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration directory (e.g., "./config/id2024")
    ///
    /// # Returns
    ///
    /// Returns a `ConfigLoader` instance on success, or an error if:
    /// - Any required file is missing
    /// - Any file contains invalid YAML
    /// - A rate is missing or a rate table has a gap, overlap or misplaced open range
    ///
    /// # Example
    ///
    /// ```no_run
    /// use pph21_engine::config::ConfigLoader;
    ///
    /// let loader = ConfigLoader::load("./config/id2024")?;
    /// # Ok::<(), pph21_engine::error::EngineError>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();

        let settings = Self::load_yaml::<Settings>(&path.join("settings.yaml"))?;
        let bpjs = Self::load_yaml::<BpjsRates>(&path.join("bpjs.yaml"))?;
        let ptkp = Self::load_yaml::<PtkpFile>(&path.join("ptkp.yaml"))?;
        let brackets = Self::load_yaml::<BracketsFile>(&path.join("brackets.yaml"))?;
        let flat_rates = Self::load_yaml::<FlatRateTable>(&path.join("flat_rates.yaml"))?;
        let accounts = Self::load_yaml::<AccountsConfig>(&path.join("accounts.yaml"))?;

        let rates = RateConfig {
            settings,
            bpjs,
            ptkp: ptkp.ptkp,
            brackets: brackets.brackets,
            flat_rates,
        };

        let loader = Self::from_parts(rates, accounts)?;
        tracing::info!(
            path = %path.display(),
            brackets = loader.rates.brackets.len(),
            flat_rate_categories = loader.rates.flat_rates.categories.len(),
            mappings = loader.accounts.mappings.len(),
            "Configuration loaded"
        );
        Ok(loader)
    }

    /// Builds a loader from already-parsed parts, running the same validation as [`load`](Self::load).
    pub fn from_parts(rates: RateConfig, accounts: AccountsConfig) -> EngineResult<Self> {
        rates.validate()?;
        Ok(Self { rates, accounts })
    }

    /// Loads and parses a YAML file.
    fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> EngineResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    /// Returns the rate snapshot.
    pub fn rates(&self) -> &RateConfig {
        &self.rates
    }

    /// Returns the ledger configuration.
    pub fn accounts(&self) -> &AccountsConfig {
        &self.accounts
    }

    /// Returns the general settings.
    pub fn settings(&self) -> &Settings {
        &self.rates.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoundingPolicy;
    use crate::models::{DependentsPolicy, TaxStatus};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn config_path() -> &'static str {
        "./config/id2024"
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_load_valid_configuration() {
        let result = ConfigLoader::load(config_path());
        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
    }

    #[test]
    fn test_settings_loaded_correctly() {
        let loader = ConfigLoader::load(config_path()).unwrap();
        let settings = loader.settings();

        assert_eq!(settings.position_cost.percent, dec("5"));
        assert_eq!(settings.position_cost.monthly_cap, dec("500000"));
        assert_eq!(settings.annualization_months, 12);
        assert_eq!(settings.rounding, RoundingPolicy::Floor);
        assert_eq!(settings.dependents_policy, DependentsPolicy::AutoCorrect);
        assert!(settings.flat_rate_enabled);
    }

    #[test]
    fn test_bpjs_rates_loaded_correctly() {
        let loader = ConfigLoader::load(config_path()).unwrap();
        let bpjs = &loader.rates().bpjs;

        assert_eq!(bpjs.kesehatan.employee_percent, Some(dec("1")));
        assert_eq!(bpjs.kesehatan.employer_percent, Some(dec("4")));
        assert_eq!(bpjs.kesehatan.salary_cap, Some(dec("12000000")));
        assert_eq!(bpjs.jht.employer_percent, Some(dec("3.7")));
        assert_eq!(bpjs.jp.salary_cap, Some(dec("9077600")));
        assert_eq!(bpjs.jkk.employer_percent, Some(dec("0.24")));
        assert_eq!(bpjs.jkm.employer_percent, Some(dec("0.3")));
        assert!(bpjs.jkk.employee_percent.is_none());
    }

    #[test]
    fn test_ptkp_loaded_for_every_status() {
        let loader = ConfigLoader::load(config_path()).unwrap();
        let rates = loader.rates();

        assert_eq!(rates.ptkp_for(TaxStatus::Tk0).unwrap(), dec("54000000"));
        assert_eq!(rates.ptkp_for(TaxStatus::K0).unwrap(), dec("58500000"));
        assert_eq!(rates.ptkp_for(TaxStatus::K1).unwrap(), dec("63000000"));
        assert_eq!(rates.ptkp_for(TaxStatus::K3).unwrap(), dec("72000000"));
    }

    #[test]
    fn test_brackets_loaded_in_order() {
        let loader = ConfigLoader::load(config_path()).unwrap();
        let brackets = &loader.rates().brackets;

        assert_eq!(brackets.len(), 5);
        assert_eq!(brackets[0].rate, dec("5"));
        assert_eq!(brackets[0].income_to, dec("60000000"));
        assert!(brackets[4].is_open_ended());
        assert_eq!(brackets[4].rate, dec("35"));
    }

    #[test]
    fn test_flat_rate_categories_cover_every_status() {
        let loader = ConfigLoader::load(config_path()).unwrap();
        let table = &loader.rates().flat_rates;

        assert_eq!(table.ranges_for(TaxStatus::Tk0).unwrap().0, "A");
        assert_eq!(table.ranges_for(TaxStatus::K1).unwrap().0, "B");
        assert_eq!(table.ranges_for(TaxStatus::K3).unwrap().0, "C");
    }

    #[test]
    fn test_accounts_loaded() {
        let loader = ConfigLoader::load(config_path()).unwrap();
        let accounts = loader.accounts();

        assert!(!accounts.companies.is_empty());
        assert!(!accounts.accounts.is_empty());
        assert!(!accounts.mappings.is_empty());
    }

    #[test]
    fn test_load_missing_directory_returns_error() {
        let result = ConfigLoader::load("/nonexistent/path");

        match result {
            Err(EngineError::ConfigNotFound { path }) => {
                assert!(path.contains("settings.yaml"));
            }
            _ => panic!("Expected ConfigNotFound error"),
        }
    }

    #[test]
    fn test_from_parts_rejects_bracket_gap() {
        let loader = ConfigLoader::load(config_path()).unwrap();
        let mut rates = loader.rates().clone();
        rates.brackets[1].income_from = dec("70000000");

        let result = ConfigLoader::from_parts(rates, loader.accounts().clone());
        assert!(matches!(result, Err(EngineError::InvalidRateTable { .. })));
    }

    #[test]
    fn test_from_parts_rejects_missing_ptkp() {
        let loader = ConfigLoader::load(config_path()).unwrap();
        let mut rates = loader.rates().clone();
        rates.ptkp.remove(&TaxStatus::Tk2);

        match ConfigLoader::from_parts(rates, loader.accounts().clone()) {
            Err(EngineError::PtkpNotFound { status }) => assert_eq!(status, "TK2"),
            other => panic!("Expected PtkpNotFound, got {:?}", other),
        }
    }
}
