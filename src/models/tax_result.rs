//! PPh 21 result types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::AuditStep;

/// The withholding method applied to a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxMethod {
    /// Annualized income taxed through marginal brackets.
    Progressive,
    /// Gross pay times a single effective rate.
    FlatRate,
}

/// Why no tax was withheld.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxExemption {
    /// The employee's income is taxed under a final scheme.
    FinalTax,
    /// The period has no gross pay.
    ZeroGross,
}

/// The portion of the taxable base falling inside one bracket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketSlice {
    /// Lower bound of the bracket.
    pub income_from: Decimal,
    /// Upper bound, zero for the open-ended bracket.
    pub income_to: Decimal,
    /// Bracket rate in percent.
    pub rate: Decimal,
    /// Amount of the base taxed in this bracket.
    pub taxable_amount: Decimal,
    /// Tax for this slice after the rounding policy.
    pub tax: Decimal,
}

/// The flat-rate range matched for a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatRateMatch {
    /// The rate category the status maps to.
    pub category: String,
    /// Lower bound of the matched range (exclusive unless zero).
    pub income_from: Decimal,
    /// Upper bound of the matched range, zero when open-ended.
    pub income_to: Decimal,
    /// The rate in percent.
    pub rate: Decimal,
}

/// Details of a year-end progressive correction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearEndCorrection {
    /// Months included in the annual totals.
    pub months: u32,
    /// Gross pay for the year including this period.
    pub annual_gross: Decimal,
    /// Position cost for the year.
    pub annual_position_cost: Decimal,
    /// BPJS employee contributions for the year.
    pub annual_bpjs: Decimal,
    /// Annual net income.
    pub annual_net: Decimal,
    /// Tax due for the whole year.
    pub annual_tax: Decimal,
    /// Tax withheld in the earlier months.
    pub tax_paid_ytd: Decimal,
    /// `annual_tax - tax_paid_ytd`; negative means a refund.
    pub correction: Decimal,
}

/// PPh 21 for one employee and period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxResult {
    /// The method used.
    pub method: TaxMethod,
    /// Gross pay for the period.
    pub gross_pay: Decimal,
    /// Position cost deducted from gross.
    pub position_cost: Decimal,
    /// BPJS employee contributions deducted from gross.
    pub bpjs_deduction: Decimal,
    /// Monthly net income.
    pub net_income: Decimal,
    /// Non-taxable allowance for the status; zero for flat rate.
    pub ptkp: Decimal,
    /// Annual taxable base for progressive, gross pay for flat rate.
    pub taxable_base: Decimal,
    /// Bracket breakdown (progressive only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub brackets: Vec<BracketSlice>,
    /// Matched flat-rate range (flat rate only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flat_rate: Option<FlatRateMatch>,
    /// Annual tax before dividing into months (progressive only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annual_tax: Option<Decimal>,
    /// Tax for this period in whole currency units.
    pub tax_amount: Decimal,
    /// The effective rate in percent when a single rate was applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_rate: Option<Decimal>,
    /// Set when the period is exempt from withholding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exemption: Option<TaxExemption>,
    /// Set when the period carries the year-end correction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correction: Option<YearEndCorrection>,
    /// Audit steps recorded while computing.
    #[serde(default)]
    pub audit_steps: Vec<AuditStep>,
}

impl TaxResult {
    /// A zero-tax result for an exempt period.
    pub fn exempt(
        method: TaxMethod,
        gross_pay: Decimal,
        bpjs_deduction: Decimal,
        exemption: TaxExemption,
        audit_steps: Vec<AuditStep>,
    ) -> Self {
        Self {
            method,
            gross_pay,
            position_cost: Decimal::ZERO,
            bpjs_deduction,
            net_income: Decimal::ZERO,
            ptkp: Decimal::ZERO,
            taxable_base: Decimal::ZERO,
            brackets: Vec::new(),
            flat_rate: None,
            annual_tax: None,
            tax_amount: Decimal::ZERO,
            effective_rate: None,
            exemption: Some(exemption),
            correction: None,
            audit_steps,
        }
    }

    /// Returns true when the flat-rate method was used.
    pub fn is_flat_rate(&self) -> bool {
        self.method == TaxMethod::FlatRate
    }
}
