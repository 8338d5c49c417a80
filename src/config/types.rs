//! Configuration types for contribution and withholding rules.
//!
//! This module contains the strongly-typed configuration structures that
//! are deserialized from YAML configuration files, together with the
//! semantic checks run on them at load time.

use std::collections::{BTreeMap, HashMap};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::models::{
    AccountMapping, BpjsProgram, Company, DependentsPolicy, LedgerAccount, TaxStatus,
};

/// How per-bracket tax amounts are rounded before summing.
///
/// The final monthly amount is always floored to whole currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingPolicy {
    /// Truncate toward zero to whole units.
    #[default]
    Floor,
    /// Round half away from zero to whole units.
    Nearest,
    /// Keep full precision.
    None,
}

impl RoundingPolicy {
    /// Applies the policy to `amount`.
    pub fn apply(&self, amount: Decimal) -> Decimal {
        match self {
            RoundingPolicy::Floor => amount.floor(),
            RoundingPolicy::Nearest => {
                amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            }
            RoundingPolicy::None => amount,
        }
    }
}

/// Position cost (biaya jabatan) parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionCostConfig {
    /// Percentage of gross pay.
    pub percent: Decimal,
    /// Maximum deduction per month.
    pub monthly_cap: Decimal,
}

/// General engine settings from `settings.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Salary base used for BPJS when a slip has none.
    pub minimum_wage: Decimal,
    /// Position cost parameters.
    pub position_cost: PositionCostConfig,
    /// Months used to annualize monthly net income.
    #[serde(default = "default_annualization_months")]
    pub annualization_months: u32,
    /// Whether the flat-rate method is used in months before year end.
    #[serde(default)]
    pub flat_rate_enabled: bool,
    /// Rounding of per-bracket amounts.
    #[serde(default)]
    pub rounding: RoundingPolicy,
    /// Handling of dependents counts that disagree with the status.
    #[serde(default)]
    pub dependents_policy: DependentsPolicy,
}

fn default_annualization_months() -> u32 {
    12
}

/// Rates for one BPJS program. Any field may be missing in YAML; the
/// calculator reports the fields each program requires.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramRate {
    /// Employee share in percent.
    #[serde(default)]
    pub employee_percent: Option<Decimal>,
    /// Employer share in percent.
    #[serde(default)]
    pub employer_percent: Option<Decimal>,
    /// Maximum salary base.
    #[serde(default)]
    pub salary_cap: Option<Decimal>,
}

/// BPJS rates from `bpjs.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BpjsRates {
    /// Kesehatan rates (employee, employer, cap).
    #[serde(default)]
    pub kesehatan: ProgramRate,
    /// JHT rates (employee, employer).
    #[serde(default)]
    pub jht: ProgramRate,
    /// JP rates (employee, employer, cap).
    #[serde(default)]
    pub jp: ProgramRate,
    /// JKK rate (employer).
    #[serde(default)]
    pub jkk: ProgramRate,
    /// JKM rate (employer).
    #[serde(default)]
    pub jkm: ProgramRate,
}

impl BpjsRates {
    /// Returns the rates of `program`.
    pub fn program(&self, program: BpjsProgram) -> &ProgramRate {
        match program {
            BpjsProgram::Kesehatan => &self.kesehatan,
            BpjsProgram::Jht => &self.jht,
            BpjsProgram::Jp => &self.jp,
            BpjsProgram::Jkk => &self.jkk,
            BpjsProgram::Jkm => &self.jkm,
        }
    }

    /// Fields each program must carry.
    pub fn required_fields(program: BpjsProgram) -> &'static [&'static str] {
        match program {
            BpjsProgram::Kesehatan | BpjsProgram::Jp => {
                &["employee_percent", "employer_percent", "salary_cap"]
            }
            BpjsProgram::Jht => &["employee_percent", "employer_percent"],
            BpjsProgram::Jkk | BpjsProgram::Jkm => &["employer_percent"],
        }
    }

    /// Checks every program carries its required fields.
    pub fn validate(&self) -> EngineResult<()> {
        for program in BpjsProgram::ALL {
            let rate = self.program(program);
            for field in Self::required_fields(program) {
                let present = match *field {
                    "employee_percent" => rate.employee_percent.is_some(),
                    "employer_percent" => rate.employer_percent.is_some(),
                    _ => rate.salary_cap.is_some(),
                };
                if !present {
                    return Err(EngineError::MissingRate {
                        program: program.key().to_string(),
                        field: field.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// One progressive bracket. `income_to == 0` marks the open-ended top bracket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBracket {
    /// Lower bound.
    pub income_from: Decimal,
    /// Upper bound, or zero when open-ended.
    pub income_to: Decimal,
    /// Rate in percent.
    pub rate: Decimal,
}

impl TaxBracket {
    /// Returns true for the open-ended bracket.
    pub fn is_open_ended(&self) -> bool {
        self.income_to.is_zero()
    }
}

/// One flat-rate income range. `income_to == 0` marks the open-ended top range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatRateRange {
    /// Lower bound (exclusive, except a range starting at zero).
    pub income_from: Decimal,
    /// Upper bound (inclusive), or zero when open-ended.
    pub income_to: Decimal,
    /// Rate in percent.
    pub rate: Decimal,
}

impl FlatRateRange {
    /// Returns true when `income` falls in `from < income <= to`, with zero
    /// included in a range starting at zero.
    pub fn contains(&self, income: Decimal) -> bool {
        let above_floor = if self.income_from.is_zero() {
            income >= Decimal::ZERO
        } else {
            income > self.income_from
        };
        above_floor && (self.income_to.is_zero() || income <= self.income_to)
    }
}

/// Flat effective rate tables from `flat_rates.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatRateTable {
    /// Range lists keyed by category name.
    pub categories: BTreeMap<String, Vec<FlatRateRange>>,
    /// Category of each tax status.
    pub status_categories: HashMap<TaxStatus, String>,
}

impl FlatRateTable {
    /// Returns the category name and range list for `status`.
    pub fn ranges_for(&self, status: TaxStatus) -> Option<(&str, &[FlatRateRange])> {
        let category = self.status_categories.get(&status)?;
        let ranges = self.categories.get(category)?;
        Some((category.as_str(), ranges.as_slice()))
    }

    /// Checks every category is contiguous and every status maps to a known category.
    pub fn validate(&self) -> EngineResult<()> {
        for (name, ranges) in &self.categories {
            let bounds: Vec<(Decimal, Decimal)> =
                ranges.iter().map(|r| (r.income_from, r.income_to)).collect();
            validate_contiguous(&format!("flat_rate:{}", name), &bounds)?;
        }
        for status in TaxStatus::ALL {
            match self.status_categories.get(&status) {
                None => {
                    return Err(EngineError::InvalidRateTable {
                        table: "flat_rate".to_string(),
                        message: format!("no category for status {}", status),
                    });
                }
                Some(category) if !self.categories.contains_key(category) => {
                    return Err(EngineError::InvalidRateTable {
                        table: "flat_rate".to_string(),
                        message: format!(
                            "status {} maps to unknown category '{}'",
                            status, category
                        ),
                    });
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

/// Validates that ranges start at zero, are contiguous and ascending, and
/// that only the last range is open-ended.
pub(crate) fn validate_contiguous(table: &str, bounds: &[(Decimal, Decimal)]) -> EngineResult<()> {
    let invalid = |message: String| EngineError::InvalidRateTable {
        table: table.to_string(),
        message,
    };

    let Some((first_from, _)) = bounds.first() else {
        return Err(invalid("table is empty".to_string()));
    };
    if !first_from.is_zero() {
        return Err(invalid(format!("first range starts at {} instead of 0", first_from)));
    }

    for (index, (from, to)) in bounds.iter().enumerate() {
        let is_last = index + 1 == bounds.len();
        if to.is_zero() {
            if !is_last {
                return Err(invalid(format!(
                    "open-ended range starting at {} is not the last range",
                    from
                )));
            }
        } else if to <= from {
            return Err(invalid(format!("range {} to {} is empty", from, to)));
        }
        if let Some((next_from, _)) = bounds.get(index + 1) {
            if next_from > to {
                return Err(invalid(format!("gap between {} and {}", to, next_from)));
            }
            if next_from < to {
                return Err(invalid(format!("overlap at {}", next_from)));
            }
        }
    }
    Ok(())
}

/// File layout of `ptkp.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PtkpFile {
    pub ptkp: HashMap<TaxStatus, Decimal>,
}

/// File layout of `brackets.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct BracketsFile {
    pub brackets: Vec<TaxBracket>,
}

/// Everything the calculators read, loaded once and immutable within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateConfig {
    /// General settings.
    pub settings: Settings,
    /// BPJS rates.
    pub bpjs: BpjsRates,
    /// PTKP amount per status.
    pub ptkp: HashMap<TaxStatus, Decimal>,
    /// Progressive brackets in ascending order.
    pub brackets: Vec<TaxBracket>,
    /// Flat effective rate tables.
    pub flat_rates: FlatRateTable,
}

impl RateConfig {
    /// Runs every semantic check on the configuration.
    pub fn validate(&self) -> EngineResult<()> {
        self.bpjs.validate()?;

        let bounds: Vec<(Decimal, Decimal)> = self
            .brackets
            .iter()
            .map(|b| (b.income_from, b.income_to))
            .collect();
        validate_contiguous("progressive", &bounds)?;

        for status in TaxStatus::ALL {
            if !self.ptkp.contains_key(&status) {
                return Err(EngineError::PtkpNotFound {
                    status: status.code().to_string(),
                });
            }
        }

        self.flat_rates.validate()
    }

    /// Returns the PTKP amount for `status`.
    pub fn ptkp_for(&self, status: TaxStatus) -> EngineResult<Decimal> {
        self.ptkp
            .get(&status)
            .copied()
            .ok_or_else(|| EngineError::PtkpNotFound {
                status: status.code().to_string(),
            })
    }
}

/// Ledger data from `accounts.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountsConfig {
    /// Companies and their short codes.
    #[serde(default)]
    pub companies: Vec<Company>,
    /// The ledger account directory.
    #[serde(default)]
    pub accounts: Vec<LedgerAccount>,
    /// Component to account mappings.
    #[serde(default)]
    pub mappings: Vec<AccountMapping>,
}
