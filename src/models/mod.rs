//! Core data models for the payroll deduction engine.
//!
//! This module contains the domain models shared by the calculators, the
//! aggregator and the account resolver.

mod audit;
mod contribution_result;
mod ledger;
mod payroll_outcome;
mod period_input;
mod summary;
mod tax_profile;
mod tax_result;

pub use audit::{AuditStep, AuditTrace, DataWarning, Severity};
pub use contribution_result::{ContributionResult, ProgramContribution};
pub use ledger::{
    AccountClass, AccountMapping, Company, Direction, Journal, JournalLine, LedgerAccount,
    PayrollComponent, SlipLineItem, WILDCARD_COMPANY,
};
pub use payroll_outcome::{PayrollOutcome, PayrollTotals};
pub use period_input::{Period, PeriodInput, YtdContext};
pub use summary::{
    BpjsEmployeeRow, BpjsPeriodSummary, BpjsTotals, EmployeeTaxYearSummary, FlatRateCompanyPeriod,
    FlatRateRow, MonthlyTaxRow, PeriodKey, RowChange, Summary, SummaryStatus, TaxYearKey,
};
pub use tax_profile::{BpjsEnrollment, BpjsProgram, DependentsPolicy, TaxProfile, TaxStatus};
pub use tax_result::{
    BracketSlice, FlatRateMatch, TaxExemption, TaxMethod, TaxResult, YearEndCorrection,
};
