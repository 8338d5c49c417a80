//! BPJS contribution calculation.
//!
//! Each of the five programs is computed independently from the salary base:
//! the base is capped where the program carries a cap and the employee and
//! employer percentages are applied to the capped base.

use rust_decimal::Decimal;

use crate::config::{BpjsRates, ProgramRate};
use crate::error::{EngineError, EngineResult};
use crate::models::{
    AuditStep, BpjsEnrollment, BpjsProgram, ContributionResult, ProgramContribution,
};

fn required(value: Option<Decimal>, program: BpjsProgram, field: &str) -> EngineResult<Decimal> {
    value.ok_or_else(|| EngineError::MissingRate {
        program: program.key().to_string(),
        field: field.to_string(),
    })
}

fn percent_of(base: Decimal, percent: Decimal) -> Decimal {
    base * percent / Decimal::ONE_HUNDRED
}

/// Computes one program's contribution.
///
/// Kesehatan and JP require a salary cap; JKK and JKM have no employee share.
fn calculate_program(
    program: BpjsProgram,
    enrolled: bool,
    base_salary: Decimal,
    rate: &ProgramRate,
    step_number: u32,
) -> EngineResult<(ProgramContribution, AuditStep)> {
    let rule_id = format!("bpjs_{}", program.key());
    let rule_name = format!("BPJS {}", program.key().to_uppercase());

    if !enrolled {
        let contribution = ProgramContribution::not_applicable(program, "not enrolled");
        let audit_step = AuditStep {
            step_number,
            rule_id,
            rule_name,
            input: serde_json::json!({
                "base_salary": base_salary.to_string(),
                "enrolled": false
            }),
            output: serde_json::json!({
                "employee_amount": "0",
                "employer_amount": "0"
            }),
            reasoning: format!("Employee is not enrolled in {}", program),
        };
        return Ok((contribution, audit_step));
    }

    let (employee_percent, cap) = match program {
        BpjsProgram::Kesehatan | BpjsProgram::Jp => (
            required(rate.employee_percent, program, "employee_percent")?,
            Some(required(rate.salary_cap, program, "salary_cap")?),
        ),
        BpjsProgram::Jht => (
            required(rate.employee_percent, program, "employee_percent")?,
            rate.salary_cap,
        ),
        BpjsProgram::Jkk | BpjsProgram::Jkm => (Decimal::ZERO, rate.salary_cap),
    };
    let employer_percent = required(rate.employer_percent, program, "employer_percent")?;

    let salary_base = match cap {
        Some(cap) => base_salary.min(cap),
        None => base_salary,
    };
    let employee_amount = percent_of(salary_base, employee_percent);
    let employer_amount = percent_of(salary_base, employer_percent);

    let cap_note = match cap {
        Some(cap) if base_salary > cap => format!(" (capped from {})", base_salary),
        Some(_) | None => String::new(),
    };

    let audit_step = AuditStep {
        step_number,
        rule_id,
        rule_name,
        input: serde_json::json!({
            "base_salary": base_salary.to_string(),
            "salary_cap": cap.map(|c| c.to_string()),
            "employee_percent": employee_percent.to_string(),
            "employer_percent": employer_percent.to_string()
        }),
        output: serde_json::json!({
            "salary_base": salary_base.to_string(),
            "employee_amount": employee_amount.normalize().to_string(),
            "employer_amount": employer_amount.normalize().to_string()
        }),
        reasoning: format!(
            "{}{} x {}% = {} employee, x {}% = {} employer",
            salary_base,
            cap_note,
            employee_percent.normalize(),
            employee_amount.normalize(),
            employer_percent.normalize(),
            employer_amount.normalize()
        ),
    };

    let contribution = ProgramContribution {
        program,
        applicable: true,
        salary_base,
        employee_amount,
        employer_amount,
        reason: None,
    };
    Ok((contribution, audit_step))
}

/// Calculates BPJS contributions for one employee and period.
///
/// Programs the employee is not enrolled in contribute zero and are marked
/// not applicable. For enrolled programs the salary base is capped where the
/// program has a cap and each share is `capped_base * percent / 100`.
///
/// # Arguments
///
/// * `enrollment` - Which programs the employee participates in
/// * `base_salary` - The BPJS salary base for the period
/// * `rates` - Program percentages and caps
/// * `step_number` - The step number of the first audit step
///
/// # Returns
///
/// A [`ContributionResult`] with one audit step per program, or
/// [`EngineError::MissingRate`] when an enrolled program lacks a required
/// rate or cap.
///
/// # Examples
///
/// ```
/// use pph21_engine::calculation::calculate_contributions;
/// use pph21_engine::config::{BpjsRates, ProgramRate};
/// use pph21_engine::models::BpjsEnrollment;
/// use rust_decimal::Decimal;
///
/// let rates = BpjsRates {
///     kesehatan: ProgramRate {
///         employee_percent: Some(Decimal::ONE),
///         employer_percent: Some(Decimal::new(4, 0)),
///         salary_cap: Some(Decimal::new(12_000_000, 0)),
///     },
///     ..BpjsRates::default()
/// };
/// let enrollment = BpjsEnrollment::from_legacy(true, false);
///
/// let result = calculate_contributions(&enrollment, Decimal::new(15_000_000, 0), &rates, 1).unwrap();
/// assert_eq!(result.kesehatan.employee_amount, Decimal::new(120_000, 0));
/// assert_eq!(result.total_employer, Decimal::new(480_000, 0));
/// ```
pub fn calculate_contributions(
    enrollment: &BpjsEnrollment,
    base_salary: Decimal,
    rates: &BpjsRates,
    step_number: u32,
) -> EngineResult<ContributionResult> {
    let mut steps = Vec::with_capacity(BpjsProgram::ALL.len());
    let mut programs = Vec::with_capacity(BpjsProgram::ALL.len());

    for (offset, program) in BpjsProgram::ALL.into_iter().enumerate() {
        let (contribution, audit_step) = calculate_program(
            program,
            enrollment.is_enrolled(program),
            base_salary,
            rates.program(program),
            step_number + offset as u32,
        )?;
        programs.push(contribution);
        steps.push(audit_step);
    }

    let [kesehatan, jht, jp, jkk, jkm]: [ProgramContribution; 5] =
        programs
            .try_into()
            .map_err(|_| EngineError::CalculationError {
                message: "contribution program list is incomplete".to_string(),
            })?;
    Ok(ContributionResult::from_programs(
        kesehatan, jht, jp, jkk, jkm, steps,
    ))
}
