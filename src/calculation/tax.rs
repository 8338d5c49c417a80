//! PPh 21 withholding calculation.
//!
//! Two methods are supported:
//!
//! - **Progressive**: monthly net income is annualized, PTKP is subtracted,
//!   the result runs through the marginal brackets and the annual tax is
//!   divided back into a monthly amount.
//! - **Flat rate**: gross pay times the effective rate of the employee's
//!   status category, with no PTKP.
//!
//! In the final month of the year the caller may request a year-end
//! correction instead: the annual tax over year-to-date plus current
//! amounts, less tax already withheld.
//!
//! The calculator never picks the method itself; [`TaxMethodPolicy`]
//! derives the flags from settings and the period month.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::{RateConfig, Settings};
use crate::error::EngineResult;
use crate::models::{
    AuditStep, TaxExemption, TaxMethod, TaxProfile, TaxResult, YearEndCorrection, YtdContext,
};

use super::flat_rate::resolve_flat_rate;
use super::position_cost::calculate_position_cost;
use super::progressive::calculate_progressive_tax;

/// Inputs to [`calculate_tax`] for one employee and period.
#[derive(Debug, Clone)]
pub struct TaxInput<'a> {
    /// The employee's tax profile.
    pub profile: &'a TaxProfile,
    /// Gross pay for the period.
    pub gross_pay: Decimal,
    /// BPJS employee contributions for the period.
    pub bpjs_employee: Decimal,
    /// Totals of the earlier months of the year.
    pub ytd: YtdContext,
    /// Use the flat effective rate instead of progressive brackets.
    pub use_flat_rate: bool,
    /// Compute the year-end correction. Takes precedence over `use_flat_rate`.
    pub year_end_correction: bool,
}

/// Method flags for one period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSelection {
    /// Use the flat effective rate.
    pub use_flat_rate: bool,
    /// Apply the year-end correction.
    pub year_end_correction: bool,
}

/// Derives method flags from settings and the period month.
///
/// With flat rate enabled, months before the final month use the flat rate.
/// The final month always carries the progressive year-end correction.
///
/// ```
/// use pph21_engine::calculation::TaxMethodPolicy;
///
/// let policy = TaxMethodPolicy { flat_rate_enabled: true, final_month: 12 };
/// assert!(policy.select(11).use_flat_rate);
/// assert!(!policy.select(12).use_flat_rate);
/// assert!(policy.select(12).year_end_correction);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxMethodPolicy {
    /// Whether flat rate is used before the final month.
    pub flat_rate_enabled: bool,
    /// The month carrying the year-end correction.
    pub final_month: u32,
}

impl TaxMethodPolicy {
    /// Builds the policy from engine settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            flat_rate_enabled: settings.flat_rate_enabled,
            final_month: settings.annualization_months,
        }
    }

    /// Returns the flags for `month`.
    pub fn select(&self, month: u32) -> MethodSelection {
        let is_final = month == self.final_month;
        MethodSelection {
            use_flat_rate: self.flat_rate_enabled && !is_final,
            year_end_correction: is_final,
        }
    }
}

fn percent(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        Decimal::ZERO
    } else {
        (part * Decimal::ONE_HUNDRED / whole).round_dp(2)
    }
}

fn position_cost_step(step_number: u32, gross: Decimal, cost: Decimal, months: u32) -> AuditStep {
    AuditStep {
        step_number,
        rule_id: "position_cost".to_string(),
        rule_name: "Position Cost".to_string(),
        input: serde_json::json!({
            "gross_pay": gross.to_string(),
            "months": months
        }),
        output: serde_json::json!({
            "position_cost": cost.normalize().to_string()
        }),
        reasoning: format!(
            "Position cost on {} over {} month(s) = {}",
            gross,
            months,
            cost.normalize()
        ),
    }
}

fn net_income_step(
    step_number: u32,
    gross: Decimal,
    position_cost: Decimal,
    bpjs: Decimal,
    net: Decimal,
) -> AuditStep {
    AuditStep {
        step_number,
        rule_id: "net_income".to_string(),
        rule_name: "Net Income".to_string(),
        input: serde_json::json!({
            "gross_pay": gross.to_string(),
            "position_cost": position_cost.normalize().to_string(),
            "bpjs_employee": bpjs.normalize().to_string()
        }),
        output: serde_json::json!({
            "net_income": net.normalize().to_string()
        }),
        reasoning: format!(
            "{} - {} - {} = {}",
            gross,
            position_cost.normalize(),
            bpjs.normalize(),
            net.normalize()
        ),
    }
}

fn exemption_step(step_number: u32, exemption: TaxExemption) -> AuditStep {
    let reasoning = match exemption {
        TaxExemption::FinalTax => "Income is taxed under a final scheme; nothing withheld",
        TaxExemption::ZeroGross => "No gross pay this period; nothing withheld",
    };
    AuditStep {
        step_number,
        rule_id: "tax_exemption".to_string(),
        rule_name: "Tax Exemption".to_string(),
        input: serde_json::json!({ "exemption": exemption }),
        output: serde_json::json!({ "tax_amount": "0" }),
        reasoning: reasoning.to_string(),
    }
}

/// Calculates PPh 21 for one employee and period.
///
/// Final-tax employees and periods with zero gross pay withhold nothing.
/// Otherwise the method is taken from the input flags: year-end correction
/// first, then flat rate, then progressive. Every final amount is floored
/// to whole currency units.
///
/// # Arguments
///
/// * `input` - Profile, amounts and method flags
/// * `rates` - The rate snapshot
/// * `step_number` - The step number of the first audit step
///
/// # Returns
///
/// A [`TaxResult`] carrying the method and the resolved rate(s), or a
/// configuration error when a bracket, flat-rate range or PTKP amount is missing.
///
/// # Examples
///
/// ```no_run
/// use pph21_engine::calculation::{calculate_tax, TaxInput};
/// use pph21_engine::config::ConfigLoader;
/// use pph21_engine::models::{TaxProfile, TaxStatus, YtdContext};
/// use rust_decimal::Decimal;
///
/// let loader = ConfigLoader::load("./config/id2024").unwrap();
/// let profile = TaxProfile::new("EMP-001", TaxStatus::K1);
/// let input = TaxInput {
///     profile: &profile,
///     gross_pay: Decimal::new(10_000_000, 0),
///     bpjs_employee: Decimal::ZERO,
///     ytd: YtdContext::default(),
///     use_flat_rate: false,
///     year_end_correction: false,
/// };
///
/// let result = calculate_tax(&input, loader.rates(), 1).unwrap();
/// assert_eq!(result.tax_amount, Decimal::new(212_500, 0));
/// ```
pub fn calculate_tax(
    input: &TaxInput<'_>,
    rates: &RateConfig,
    step_number: u32,
) -> EngineResult<TaxResult> {
    let requested_method = if input.use_flat_rate && !input.year_end_correction {
        TaxMethod::FlatRate
    } else {
        TaxMethod::Progressive
    };

    let exemption = if input.profile.final_tax {
        Some(TaxExemption::FinalTax)
    } else if input.gross_pay.is_zero() {
        Some(TaxExemption::ZeroGross)
    } else {
        None
    };
    if let Some(exemption) = exemption {
        return Ok(TaxResult::exempt(
            requested_method,
            input.gross_pay,
            input.bpjs_employee,
            exemption,
            vec![exemption_step(step_number, exemption)],
        ));
    }

    if input.year_end_correction {
        calculate_year_end(input, rates, step_number)
    } else if input.use_flat_rate {
        calculate_flat(input, rates, step_number)
    } else {
        calculate_progressive(input, rates, step_number)
    }
}

fn calculate_flat(
    input: &TaxInput<'_>,
    rates: &RateConfig,
    step_number: u32,
) -> EngineResult<TaxResult> {
    let status = input.profile.effective_status();
    let settings = &rates.settings;
    let mut steps = Vec::new();

    let position_cost = calculate_position_cost(input.gross_pay, &settings.position_cost, 1);
    steps.push(position_cost_step(step_number, input.gross_pay, position_cost, 1));
    let net_income = input.gross_pay - position_cost - input.bpjs_employee;
    steps.push(net_income_step(
        step_number + 1,
        input.gross_pay,
        position_cost,
        input.bpjs_employee,
        net_income,
    ));

    let lookup = resolve_flat_rate(status, input.gross_pay, &rates.flat_rates, step_number + 2)?;
    steps.push(lookup.audit_step);
    let rate = lookup.matched.rate;

    let tax_amount = (input.gross_pay * rate / Decimal::ONE_HUNDRED).floor();
    steps.push(AuditStep {
        step_number: step_number + 3,
        rule_id: "flat_rate_tax".to_string(),
        rule_name: "Flat Rate Tax".to_string(),
        input: serde_json::json!({
            "gross_pay": input.gross_pay.to_string(),
            "rate": rate.normalize().to_string()
        }),
        output: serde_json::json!({
            "tax_amount": tax_amount.to_string()
        }),
        reasoning: format!(
            "{} x {}% = {} (floored)",
            input.gross_pay,
            rate.normalize(),
            tax_amount
        ),
    });

    Ok(TaxResult {
        method: TaxMethod::FlatRate,
        gross_pay: input.gross_pay,
        position_cost,
        bpjs_deduction: input.bpjs_employee,
        net_income,
        ptkp: Decimal::ZERO,
        taxable_base: input.gross_pay,
        brackets: Vec::new(),
        flat_rate: Some(lookup.matched),
        annual_tax: None,
        tax_amount,
        effective_rate: Some(rate),
        exemption: None,
        correction: None,
        audit_steps: steps,
    })
}

fn calculate_progressive(
    input: &TaxInput<'_>,
    rates: &RateConfig,
    step_number: u32,
) -> EngineResult<TaxResult> {
    let status = input.profile.effective_status();
    let settings = &rates.settings;
    let months = Decimal::from(settings.annualization_months.max(1));
    let mut steps = Vec::new();

    let position_cost = calculate_position_cost(input.gross_pay, &settings.position_cost, 1);
    steps.push(position_cost_step(step_number, input.gross_pay, position_cost, 1));
    let net_income = input.gross_pay - position_cost - input.bpjs_employee;
    steps.push(net_income_step(
        step_number + 1,
        input.gross_pay,
        position_cost,
        input.bpjs_employee,
        net_income,
    ));

    let annual_net = net_income * months;
    let ptkp = rates.ptkp_for(status)?;
    let taxable_base = (annual_net - ptkp).max(Decimal::ZERO);
    steps.push(AuditStep {
        step_number: step_number + 2,
        rule_id: "taxable_base".to_string(),
        rule_name: "Annual Taxable Base".to_string(),
        input: serde_json::json!({
            "net_income": net_income.normalize().to_string(),
            "months": settings.annualization_months,
            "status": status,
            "ptkp": ptkp.to_string()
        }),
        output: serde_json::json!({
            "annual_net": annual_net.normalize().to_string(),
            "taxable_base": taxable_base.normalize().to_string()
        }),
        reasoning: format!(
            "max(0, {} x {} - {}) = {}",
            net_income.normalize(),
            months,
            ptkp,
            taxable_base.normalize()
        ),
    });

    let progressive = calculate_progressive_tax(
        taxable_base,
        &rates.brackets,
        settings.rounding,
        step_number + 3,
    )?;
    steps.push(progressive.audit_step);

    let tax_amount = (progressive.annual_tax / months).floor();
    steps.push(AuditStep {
        step_number: step_number + 4,
        rule_id: "monthly_tax".to_string(),
        rule_name: "Monthly Tax".to_string(),
        input: serde_json::json!({
            "annual_tax": progressive.annual_tax.normalize().to_string(),
            "months": settings.annualization_months
        }),
        output: serde_json::json!({
            "tax_amount": tax_amount.to_string()
        }),
        reasoning: format!(
            "{} / {} = {} (floored)",
            progressive.annual_tax.normalize(),
            months,
            tax_amount
        ),
    });

    Ok(TaxResult {
        method: TaxMethod::Progressive,
        gross_pay: input.gross_pay,
        position_cost,
        bpjs_deduction: input.bpjs_employee,
        net_income,
        ptkp,
        taxable_base,
        brackets: progressive.slices,
        flat_rate: None,
        annual_tax: Some(progressive.annual_tax),
        tax_amount,
        effective_rate: Some(percent(progressive.annual_tax, annual_net)),
        exemption: None,
        correction: None,
        audit_steps: steps,
    })
}

fn calculate_year_end(
    input: &TaxInput<'_>,
    rates: &RateConfig,
    step_number: u32,
) -> EngineResult<TaxResult> {
    let status = input.profile.effective_status();
    let settings = &rates.settings;
    let months = input.ytd.months + 1;
    let mut steps = Vec::new();

    let position_cost = calculate_position_cost(input.gross_pay, &settings.position_cost, 1);
    let net_income = input.gross_pay - position_cost - input.bpjs_employee;

    let annual_gross = input.ytd.gross + input.gross_pay;
    let annual_bpjs = input.ytd.bpjs_employee + input.bpjs_employee;
    let annual_position_cost =
        calculate_position_cost(annual_gross, &settings.position_cost, months);
    steps.push(position_cost_step(
        step_number,
        annual_gross,
        annual_position_cost,
        months,
    ));

    let annual_net = annual_gross - annual_position_cost - annual_bpjs;
    steps.push(net_income_step(
        step_number + 1,
        annual_gross,
        annual_position_cost,
        annual_bpjs,
        annual_net,
    ));

    let ptkp = rates.ptkp_for(status)?;
    let taxable_base = (annual_net - ptkp).max(Decimal::ZERO);
    let progressive = calculate_progressive_tax(
        taxable_base,
        &rates.brackets,
        settings.rounding,
        step_number + 2,
    )?;
    steps.push(progressive.audit_step);

    let annual_tax = progressive.annual_tax.floor();
    let correction = annual_tax - input.ytd.tax_paid;
    steps.push(AuditStep {
        step_number: step_number + 3,
        rule_id: "year_end_correction".to_string(),
        rule_name: "Year-End Correction".to_string(),
        input: serde_json::json!({
            "annual_tax": annual_tax.to_string(),
            "tax_paid_ytd": input.ytd.tax_paid.to_string(),
            "months": months
        }),
        output: serde_json::json!({
            "tax_amount": correction.to_string()
        }),
        reasoning: if correction < Decimal::ZERO {
            format!(
                "{} - {} = {} (overpaid, refund due)",
                annual_tax, input.ytd.tax_paid, correction
            )
        } else {
            format!("{} - {} = {}", annual_tax, input.ytd.tax_paid, correction)
        },
    });

    Ok(TaxResult {
        method: TaxMethod::Progressive,
        gross_pay: input.gross_pay,
        position_cost,
        bpjs_deduction: input.bpjs_employee,
        net_income,
        ptkp,
        taxable_base,
        brackets: progressive.slices,
        flat_rate: None,
        annual_tax: Some(annual_tax),
        tax_amount: correction,
        effective_rate: Some(percent(annual_tax, annual_net)),
        exemption: None,
        correction: Some(YearEndCorrection {
            months,
            annual_gross,
            annual_position_cost,
            annual_bpjs,
            annual_net,
            annual_tax,
            tax_paid_ytd: input.ytd.tax_paid,
            correction,
        }),
        audit_steps: steps,
    })
}
