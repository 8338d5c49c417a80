//! Component to ledger account resolution.
//!
//! Mappings are looked up in two passes: an exact company mapping first,
//! then the wildcard (`*`) mapping with `{abbr}` replaced by the company's
//! short code. Every mapping is checked against the account directory when
//! the resolver is built, so a misconfigured chart of accounts fails at
//! startup rather than on the first journal.

use std::collections::HashMap;

use crate::config::AccountsConfig;
use crate::error::{EngineError, EngineResult};
use crate::models::{AccountMapping, Company, Direction, LedgerAccount, PayrollComponent};

/// Placeholder substituted with the company short code in wildcard mappings.
const ABBR_PLACEHOLDER: &str = "{abbr}";

/// Anything that can turn a component leg into an account id.
pub trait AccountLookup {
    /// Resolves the account for `component` on the `direction` leg in `company`.
    fn resolve(
        &self,
        component: PayrollComponent,
        direction: Direction,
        company: &str,
    ) -> EngineResult<String>;
}

/// Validated mapping tables built from [`AccountsConfig`].
#[derive(Debug, Clone)]
pub struct AccountResolver {
    companies: HashMap<String, Company>,
    exact: HashMap<(PayrollComponent, Direction, String), String>,
    wildcard: HashMap<(PayrollComponent, Direction), String>,
}

impl AccountResolver {
    /// Builds the resolver, validating every mapping against the directory.
    ///
    /// # Arguments
    ///
    /// * `config` - Companies, account directory and mappings
    ///
    /// # Returns
    ///
    /// The resolver, or a configuration error:
    /// - [`EngineError::UnknownAccount`] when a mapping (after `{abbr}`
    ///   substitution for each company) names an account missing from the
    ///   directory or owned by another company
    /// - [`EngineError::AccountClassMismatch`] when the account is not of the
    ///   class the leg requires
    pub fn new(config: &AccountsConfig) -> EngineResult<Self> {
        let directory: HashMap<&str, &LedgerAccount> = config
            .accounts
            .iter()
            .map(|account| (account.id.as_str(), account))
            .collect();

        let mut exact = HashMap::new();
        let mut wildcard = HashMap::new();

        for mapping in &config.mappings {
            if mapping.is_wildcard() {
                for company in &config.companies {
                    let account = substitute(&mapping.account, company);
                    check_account(&directory, mapping, &account, &company.name)?;
                }
                wildcard.insert((mapping.component, mapping.direction), mapping.account.clone());
            } else {
                check_account(&directory, mapping, &mapping.account, &mapping.company)?;
                exact.insert(
                    (mapping.component, mapping.direction, mapping.company.clone()),
                    mapping.account.clone(),
                );
            }
        }

        let companies = config
            .companies
            .iter()
            .map(|company| (company.name.clone(), company.clone()))
            .collect();

        tracing::debug!(
            exact = exact.len(),
            wildcard = wildcard.len(),
            "Account mappings validated"
        );

        Ok(Self {
            companies,
            exact,
            wildcard,
        })
    }

    /// Company metadata by name.
    pub fn company(&self, name: &str) -> Option<&Company> {
        self.companies.get(name)
    }
}

impl AccountLookup for AccountResolver {
    fn resolve(
        &self,
        component: PayrollComponent,
        direction: Direction,
        company: &str,
    ) -> EngineResult<String> {
        if let Some(account) = self.exact.get(&(component, direction, company.to_string())) {
            return Ok(account.clone());
        }

        let pattern = self.wildcard.get(&(component, direction));
        match (pattern, self.companies.get(company)) {
            (Some(pattern), Some(company)) => Ok(substitute(pattern, company)),
            _ => Err(EngineError::UnresolvedAccount {
                component: component.to_string(),
                direction: direction.to_string(),
                company: company.to_string(),
            }),
        }
    }
}

fn substitute(pattern: &str, company: &Company) -> String {
    pattern.replace(ABBR_PLACEHOLDER, &company.abbr)
}

fn check_account(
    directory: &HashMap<&str, &LedgerAccount>,
    mapping: &AccountMapping,
    account_id: &str,
    company: &str,
) -> EngineResult<()> {
    let account = directory
        .get(account_id)
        .filter(|account| account.company == company)
        .ok_or_else(|| EngineError::UnknownAccount {
            account: account_id.to_string(),
        })?;

    let expected = mapping.component.required_class(mapping.direction);
    if account.class != expected {
        return Err(EngineError::AccountClassMismatch {
            account: account_id.to_string(),
            component: format!("{} ({})", mapping.component, mapping.direction),
            expected: expected.to_string(),
            actual: account.class.to_string(),
        });
    }
    Ok(())
}
