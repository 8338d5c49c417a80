//! Per-employee payroll pipeline.
//!
//! Runs validation, BPJS contributions and PPh 21 for one employee and
//! period, collecting warnings and audit steps into a [`PayrollOutcome`].

use std::time::Instant;

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::config::RateConfig;
use crate::error::EngineResult;
use crate::models::{
    AuditStep, AuditTrace, PayrollOutcome, PayrollTotals, PeriodInput, TaxProfile, YtdContext,
};

use super::contribution::calculate_contributions;
use super::tax::{MethodSelection, TaxInput, TaxMethodPolicy, calculate_tax};

/// Runs the pipeline with the method chosen by [`TaxMethodPolicy`].
///
/// # Arguments
///
/// * `profile` - The employee's tax profile; validated on a copy
/// * `input` - Gross pay and period data
/// * `ytd` - Totals of the earlier months of the year
/// * `rates` - The rate snapshot
///
/// # Returns
///
/// The combined outcome, or the first input or configuration error.
pub fn calculate_payroll(
    profile: &TaxProfile,
    input: &PeriodInput,
    ytd: YtdContext,
    rates: &RateConfig,
) -> EngineResult<PayrollOutcome> {
    let selection = TaxMethodPolicy::from_settings(&rates.settings).select(input.period.month);
    calculate_payroll_with(profile, input, ytd, selection, rates)
}

/// Runs the pipeline with explicit method flags.
pub fn calculate_payroll_with(
    profile: &TaxProfile,
    input: &PeriodInput,
    ytd: YtdContext,
    selection: MethodSelection,
    rates: &RateConfig,
) -> EngineResult<PayrollOutcome> {
    let start_time = Instant::now();
    let settings = &rates.settings;

    input.validate()?;

    let mut profile = profile.clone();
    let mut warnings = profile.validate(settings.dependents_policy)?;
    let status = profile.effective_status();

    let (base_salary, base_warning) = input.effective_base_salary(settings.minimum_wage);
    warnings.extend(base_warning);

    let mut steps = vec![AuditStep {
        step_number: 1,
        rule_id: "method_selection".to_string(),
        rule_name: "Method Selection".to_string(),
        input: serde_json::json!({
            "month": input.period.month,
            "flat_rate_enabled": settings.flat_rate_enabled,
            "final_month": settings.annualization_months
        }),
        output: serde_json::json!({
            "use_flat_rate": selection.use_flat_rate,
            "year_end_correction": selection.year_end_correction
        }),
        reasoning: if selection.year_end_correction {
            format!("Month {} carries the year-end correction", input.period.month)
        } else if selection.use_flat_rate {
            format!("Month {} uses the flat effective rate", input.period.month)
        } else {
            format!("Month {} uses progressive brackets", input.period.month)
        },
    }];
    steps.push(AuditStep {
        step_number: 2,
        rule_id: "bpjs_salary_base".to_string(),
        rule_name: "BPJS Salary Base".to_string(),
        input: serde_json::json!({
            "base_salary": input.base_salary.map(|b| b.to_string()),
            "minimum_wage": settings.minimum_wage.to_string()
        }),
        output: serde_json::json!({
            "salary_base": base_salary.to_string()
        }),
        reasoning: if input.base_salary.is_some_and(|b| b > Decimal::ZERO) {
            format!("Using slip base salary {}", base_salary)
        } else {
            format!("No base salary on slip; using minimum wage {}", base_salary)
        },
    });

    let contributions =
        calculate_contributions(&profile.effective_enrollment(), base_salary, &rates.bpjs, 3)?;
    let next_step = 3 + contributions.audit_steps.len() as u32;

    let tax_input = TaxInput {
        profile: &profile,
        gross_pay: input.gross_pay,
        bpjs_employee: contributions.total_employee,
        ytd,
        use_flat_rate: selection.use_flat_rate,
        year_end_correction: selection.year_end_correction,
    };
    let tax = calculate_tax(&tax_input, rates, next_step)?;

    let totals = PayrollTotals {
        gross_pay: input.gross_pay,
        bpjs_employee: contributions.total_employee,
        bpjs_employer: contributions.total_employer,
        pph21: tax.tax_amount,
        take_home_pay: input.gross_pay - contributions.total_employee - tax.tax_amount,
    };

    tracing::debug!(
        employee_id = %input.employee_id,
        period = %input.period,
        method = ?tax.method,
        pph21 = %tax.tax_amount,
        bpjs_employee = %contributions.total_employee,
        "Payroll calculated"
    );

    Ok(PayrollOutcome {
        calculation_id: Uuid::new_v4(),
        timestamp: Utc::now(),
        engine_version: env!("CARGO_PKG_VERSION").to_string(),
        employee_id: input.employee_id.clone(),
        employee_name: profile.employee_name.clone(),
        company: input.company.clone(),
        period: input.period,
        slip_id: input.slip_id.clone(),
        status,
        base_salary,
        contributions,
        tax,
        totals,
        audit_trace: AuditTrace {
            steps,
            warnings,
            duration_us: start_time.elapsed().as_micros() as u64,
        },
    })
}
