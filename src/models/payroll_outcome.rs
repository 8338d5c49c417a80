//! The result of running the per-employee pipeline.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    AuditTrace, BpjsProgram, ContributionResult, PayrollComponent, Period, SlipLineItem, TaxResult,
    TaxStatus,
};

/// Headline amounts of a payroll outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollTotals {
    /// Gross pay.
    pub gross_pay: Decimal,
    /// BPJS deducted from the employee.
    pub bpjs_employee: Decimal,
    /// BPJS paid by the employer on top of gross.
    pub bpjs_employer: Decimal,
    /// PPh 21 withheld (negative for a year-end refund).
    pub pph21: Decimal,
    /// Gross less employee BPJS and PPh 21.
    pub take_home_pay: Decimal,
}

/// Contributions and tax for one employee and period.
///
/// # Example
///
/// ```no_run
/// use pph21_engine::calculation::calculate_payroll;
/// use pph21_engine::config::ConfigLoader;
/// use pph21_engine::models::{Period, PeriodInput, TaxProfile, TaxStatus, YtdContext};
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let loader = ConfigLoader::load("./config/id2024").unwrap();
/// let profile = TaxProfile::new("EMP-001", TaxStatus::Tk0);
/// let input = PeriodInput {
///     employee_id: "EMP-001".to_string(),
///     company: "PT Maju Bersama".to_string(),
///     period: Period::new(2025, 3),
///     gross_pay: Decimal::new(10_000_000, 0),
///     start_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
///     end_date: NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
///     base_salary: Some(Decimal::new(10_000_000, 0)),
///     slip_id: "SLIP-001".to_string(),
/// };
///
/// let outcome = calculate_payroll(&profile, &input, YtdContext::default(), loader.rates()).unwrap();
/// println!("Take home: {}", outcome.totals.take_home_pay);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollOutcome {
    /// Unique identifier of this calculation.
    pub calculation_id: Uuid,
    /// When the calculation ran.
    pub timestamp: DateTime<Utc>,
    /// Version of the engine that produced the result.
    pub engine_version: String,
    /// The employee.
    pub employee_id: String,
    /// Display name.
    #[serde(default)]
    pub employee_name: Option<String>,
    /// The company.
    pub company: String,
    /// The month.
    pub period: Period,
    /// The source slip.
    pub slip_id: String,
    /// Status after validation.
    pub status: TaxStatus,
    /// BPJS salary base after fallback.
    pub base_salary: Decimal,
    /// BPJS contributions.
    pub contributions: ContributionResult,
    /// PPh 21.
    pub tax: TaxResult,
    /// Headline amounts.
    pub totals: PayrollTotals,
    /// Pipeline steps, warnings and timing.
    pub audit_trace: AuditTrace,
}

impl PayrollOutcome {
    /// The deduction and contribution lines a salary slip for this outcome carries.
    ///
    /// Programs the employee is not enrolled in are left out; PPh 21 is
    /// always present, even when zero.
    pub fn line_items(&self) -> Vec<SlipLineItem> {
        let mut items = Vec::new();
        for program in BpjsProgram::ALL {
            let contribution = self.contributions.program(program);
            if !contribution.applicable {
                continue;
            }
            let (employee, employer) = PayrollComponent::for_program(program);
            if let Some(component) = employee {
                items.push(SlipLineItem {
                    component,
                    amount: contribution.employee_amount,
                });
            }
            items.push(SlipLineItem {
                component: employer,
                amount: contribution.employer_amount,
            });
        }
        items.push(SlipLineItem {
            component: PayrollComponent::Pph21,
            amount: self.tax.tax_amount,
        });
        items
    }
}
