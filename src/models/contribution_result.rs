//! BPJS contribution result types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{AuditStep, BpjsProgram};

/// The employee and employer amounts for one BPJS program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramContribution {
    /// The program these amounts belong to.
    pub program: BpjsProgram,
    /// Whether the employee is enrolled in the program.
    pub applicable: bool,
    /// The salary base after applying the program's cap.
    pub salary_base: Decimal,
    /// The employee's share.
    pub employee_amount: Decimal,
    /// The employer's share.
    pub employer_amount: Decimal,
    /// Why the program contributed nothing, when it did not apply.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ProgramContribution {
    /// A zero contribution for a program the employee is not enrolled in.
    pub fn not_applicable(program: BpjsProgram, reason: impl Into<String>) -> Self {
        Self {
            program,
            applicable: false,
            salary_base: Decimal::ZERO,
            employee_amount: Decimal::ZERO,
            employer_amount: Decimal::ZERO,
            reason: Some(reason.into()),
        }
    }

    /// Employee plus employer share.
    pub fn total(&self) -> Decimal {
        self.employee_amount + self.employer_amount
    }
}

/// BPJS contributions for one employee and period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionResult {
    /// Health insurance.
    pub kesehatan: ProgramContribution,
    /// Old-age security.
    pub jht: ProgramContribution,
    /// Pension.
    pub jp: ProgramContribution,
    /// Work-accident insurance (employer only).
    pub jkk: ProgramContribution,
    /// Death insurance (employer only).
    pub jkm: ProgramContribution,
    /// Sum of employee shares.
    pub total_employee: Decimal,
    /// Sum of employer shares.
    pub total_employer: Decimal,
    /// Employee plus employer totals.
    pub total: Decimal,
    /// Audit steps recorded while computing.
    #[serde(default)]
    pub audit_steps: Vec<AuditStep>,
}

impl ContributionResult {
    /// Builds a result from the five programs, computing totals.
    pub fn from_programs(
        kesehatan: ProgramContribution,
        jht: ProgramContribution,
        jp: ProgramContribution,
        jkk: ProgramContribution,
        jkm: ProgramContribution,
        audit_steps: Vec<AuditStep>,
    ) -> Self {
        let mut result = Self {
            kesehatan,
            jht,
            jp,
            jkk,
            jkm,
            total_employee: Decimal::ZERO,
            total_employer: Decimal::ZERO,
            total: Decimal::ZERO,
            audit_steps,
        };
        result.total_employee = result.programs().iter().map(|p| p.employee_amount).sum();
        result.total_employer = result.programs().iter().map(|p| p.employer_amount).sum();
        result.total = result.total_employee + result.total_employer;
        result
    }

    /// The five programs in reporting order.
    pub fn programs(&self) -> [&ProgramContribution; 5] {
        [&self.kesehatan, &self.jht, &self.jp, &self.jkk, &self.jkm]
    }

    /// Returns the entry for `program`.
    pub fn program(&self, program: BpjsProgram) -> &ProgramContribution {
        match program {
            BpjsProgram::Kesehatan => &self.kesehatan,
            BpjsProgram::Jht => &self.jht,
            BpjsProgram::Jp => &self.jp,
            BpjsProgram::Jkk => &self.jkk,
            BpjsProgram::Jkm => &self.jkm,
        }
    }

    /// The employee deduction used as the BPJS input to PPh 21.
    pub fn tax_deductible(&self) -> Decimal {
        self.total_employee
    }
}
