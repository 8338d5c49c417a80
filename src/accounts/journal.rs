//! Journal entries for a computed payroll outcome.
//!
//! Posting rules:
//!
//! - employee BPJS deductions and PPh 21 are credited to their payable
//!   accounts and debited, in total, from the salary payable account
//! - employer contributions debit their expense account and credit their
//!   payable account
//!
//! A negative PPh 21 (year-end refund) posts on the opposite side of the
//! same account. Zero amounts produce no line.

use rust_decimal::Decimal;

use crate::error::EngineResult;
use crate::models::{BpjsProgram, Direction, Journal, JournalLine, PayrollComponent, PayrollOutcome};

use super::resolver::AccountLookup;

/// Builds the balanced journal for one salary slip.
///
/// # Arguments
///
/// * `outcome` - The computed contributions and tax
/// * `accounts` - Resolver used for every leg
///
/// # Returns
///
/// The journal, or [`crate::error::EngineError::UnresolvedAccount`] when a
/// leg with a non-zero amount has no mapping.
pub fn build_journal(outcome: &PayrollOutcome, accounts: &dyn AccountLookup) -> EngineResult<Journal> {
    let mut builder = JournalBuilder {
        company: &outcome.company,
        accounts,
        lines: Vec::new(),
    };
    let mut withheld = Decimal::ZERO;

    for program in BpjsProgram::ALL {
        let contribution = outcome.contributions.program(program);
        let (employee, employer) = PayrollComponent::for_program(program);

        if let Some(component) = employee {
            builder.post(component, Direction::Credit, contribution.employee_amount)?;
            withheld += contribution.employee_amount;
        }
        builder.post(employer, Direction::Debit, contribution.employer_amount)?;
        builder.post(employer, Direction::Credit, contribution.employer_amount)?;
    }

    builder.post(PayrollComponent::Pph21, Direction::Credit, outcome.tax.tax_amount)?;
    withheld += outcome.tax.tax_amount;

    builder.post(PayrollComponent::SalaryPayable, Direction::Debit, withheld)?;

    let lines = builder.lines;
    let total_debit: Decimal = lines.iter().map(|line| line.debit).sum();
    let total_credit: Decimal = lines.iter().map(|line| line.credit).sum();

    tracing::debug!(
        slip_id = %outcome.slip_id,
        company = %outcome.company,
        lines = lines.len(),
        total = %total_debit,
        "Journal built"
    );

    Ok(Journal {
        company: outcome.company.clone(),
        slip_id: outcome.slip_id.clone(),
        lines,
        total_debit,
        total_credit,
    })
}

struct JournalBuilder<'a> {
    company: &'a str,
    accounts: &'a dyn AccountLookup,
    lines: Vec<JournalLine>,
}

impl JournalBuilder<'_> {
    /// Posts `amount` on its natural side; negative amounts flip side.
    fn post(
        &mut self,
        component: PayrollComponent,
        direction: Direction,
        amount: Decimal,
    ) -> EngineResult<()> {
        if amount.is_zero() {
            return Ok(());
        }
        let account = self.accounts.resolve(component, direction, self.company)?;
        let side = if amount.is_sign_negative() {
            match direction {
                Direction::Debit => Direction::Credit,
                Direction::Credit => Direction::Debit,
            }
        } else {
            direction
        };
        let amount = amount.abs();
        let (debit, credit) = match side {
            Direction::Debit => (amount, Decimal::ZERO),
            Direction::Credit => (Decimal::ZERO, amount),
        };
        self.lines.push(JournalLine {
            account,
            component,
            debit,
            credit,
        });
        Ok(())
    }
}
