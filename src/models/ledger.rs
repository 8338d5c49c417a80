//! Ledger-facing types: payroll components, accounts, mappings and journal lines.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::BpjsProgram;

/// A logical payroll component that posts to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayrollComponent {
    /// Kesehatan, employee deduction.
    BpjsKesehatanEmployee,
    /// Kesehatan, employer contribution.
    BpjsKesehatanEmployer,
    /// JHT, employee deduction.
    BpjsJhtEmployee,
    /// JHT, employer contribution.
    BpjsJhtEmployer,
    /// JP, employee deduction.
    BpjsJpEmployee,
    /// JP, employer contribution.
    BpjsJpEmployer,
    /// JKK, employer contribution.
    BpjsJkkEmployer,
    /// JKM, employer contribution.
    BpjsJkmEmployer,
    /// PPh 21 withheld.
    Pph21,
    /// Clearing account the employee deductions are taken from.
    SalaryPayable,
}

impl PayrollComponent {
    /// Every component, in posting order.
    pub const ALL: [PayrollComponent; 10] = [
        PayrollComponent::BpjsKesehatanEmployee,
        PayrollComponent::BpjsKesehatanEmployer,
        PayrollComponent::BpjsJhtEmployee,
        PayrollComponent::BpjsJhtEmployer,
        PayrollComponent::BpjsJpEmployee,
        PayrollComponent::BpjsJpEmployer,
        PayrollComponent::BpjsJkkEmployer,
        PayrollComponent::BpjsJkmEmployer,
        PayrollComponent::Pph21,
        PayrollComponent::SalaryPayable,
    ];

    /// Stable key used in configuration and slip line items.
    pub fn key(&self) -> &'static str {
        match self {
            PayrollComponent::BpjsKesehatanEmployee => "bpjs_kesehatan_employee",
            PayrollComponent::BpjsKesehatanEmployer => "bpjs_kesehatan_employer",
            PayrollComponent::BpjsJhtEmployee => "bpjs_jht_employee",
            PayrollComponent::BpjsJhtEmployer => "bpjs_jht_employer",
            PayrollComponent::BpjsJpEmployee => "bpjs_jp_employee",
            PayrollComponent::BpjsJpEmployer => "bpjs_jp_employer",
            PayrollComponent::BpjsJkkEmployer => "bpjs_jkk_employer",
            PayrollComponent::BpjsJkmEmployer => "bpjs_jkm_employer",
            PayrollComponent::Pph21 => "pph21",
            PayrollComponent::SalaryPayable => "salary_payable",
        }
    }

    /// The employee and employer components of a BPJS program.
    ///
    /// JKK and JKM have no employee share.
    pub fn for_program(program: BpjsProgram) -> (Option<PayrollComponent>, PayrollComponent) {
        match program {
            BpjsProgram::Kesehatan => (
                Some(PayrollComponent::BpjsKesehatanEmployee),
                PayrollComponent::BpjsKesehatanEmployer,
            ),
            BpjsProgram::Jht => (
                Some(PayrollComponent::BpjsJhtEmployee),
                PayrollComponent::BpjsJhtEmployer,
            ),
            BpjsProgram::Jp => (
                Some(PayrollComponent::BpjsJpEmployee),
                PayrollComponent::BpjsJpEmployer,
            ),
            BpjsProgram::Jkk => (None, PayrollComponent::BpjsJkkEmployer),
            BpjsProgram::Jkm => (None, PayrollComponent::BpjsJkmEmployer),
        }
    }

    /// True for contributions the employer pays on top of gross pay.
    pub fn is_employer_cost(&self) -> bool {
        matches!(
            self,
            PayrollComponent::BpjsKesehatanEmployer
                | PayrollComponent::BpjsJhtEmployer
                | PayrollComponent::BpjsJpEmployer
                | PayrollComponent::BpjsJkkEmployer
                | PayrollComponent::BpjsJkmEmployer
        )
    }

    /// The ledger class a mapping for this component and leg must point at.
    ///
    /// Employer cost debits go to expense accounts; every other leg is a
    /// liability (a payable or the salary clearing account).
    pub fn required_class(&self, direction: Direction) -> AccountClass {
        match direction {
            Direction::Debit if self.is_employer_cost() => AccountClass::Expense,
            _ => AccountClass::Liability,
        }
    }
}

impl fmt::Display for PayrollComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Side of a journal line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Debit side.
    Debit,
    /// Credit side.
    Credit,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Debit => f.write_str("debit"),
            Direction::Credit => f.write_str("credit"),
        }
    }
}

/// Top-level class of a ledger account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountClass {
    /// Asset.
    Asset,
    /// Liability.
    Liability,
    /// Equity.
    Equity,
    /// Income.
    Income,
    /// Expense.
    Expense,
}

impl fmt::Display for AccountClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AccountClass::Asset => "asset",
            AccountClass::Liability => "liability",
            AccountClass::Equity => "equity",
            AccountClass::Income => "income",
            AccountClass::Expense => "expense",
        };
        f.write_str(name)
    }
}

/// An account in the ledger account directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerAccount {
    /// Account identifier, e.g. `"BPJS JHT Payable - PTM"`.
    pub id: String,
    /// Owning company.
    pub company: String,
    /// Account class.
    pub class: AccountClass,
}

/// Company metadata needed for account resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    /// Company name.
    pub name: String,
    /// Short code substituted for `{abbr}` in wildcard mappings.
    pub abbr: String,
    /// Reporting currency.
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "IDR".to_string()
}

/// Company name that matches every company.
pub const WILDCARD_COMPANY: &str = "*";

/// Maps a component leg to an account for one company or for all (`*`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountMapping {
    /// The component.
    pub component: PayrollComponent,
    /// The leg.
    pub direction: Direction,
    /// Company name, or `*` for every company.
    pub company: String,
    /// Account id; may contain `{abbr}` on wildcard mappings.
    pub account: String,
}

impl AccountMapping {
    /// Returns true for a `*` mapping.
    pub fn is_wildcard(&self) -> bool {
        self.company == WILDCARD_COMPANY
    }
}

/// One line of a generated journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalLine {
    /// Target account.
    pub account: String,
    /// The component posted.
    pub component: PayrollComponent,
    /// Debit amount.
    pub debit: Decimal,
    /// Credit amount.
    pub credit: Decimal,
}

/// A balanced journal entry for one slip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Journal {
    /// Company the entry belongs to.
    pub company: String,
    /// Source salary slip.
    pub slip_id: String,
    /// Lines in posting order.
    pub lines: Vec<JournalLine>,
    /// Sum of debits.
    pub total_debit: Decimal,
    /// Sum of credits.
    pub total_credit: Decimal,
}

impl Journal {
    /// Returns true when debits equal credits.
    pub fn is_balanced(&self) -> bool {
        self.total_debit == self.total_credit
    }
}

/// A deduction or contribution line as persisted on a salary slip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlipLineItem {
    /// The component.
    pub component: PayrollComponent,
    /// The recorded amount.
    pub amount: Decimal,
}
