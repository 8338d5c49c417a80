//! Period-level summary records.
//!
//! Three summaries are maintained by the aggregator:
//!
//! - [`BpjsPeriodSummary`], one per company and month, with a row per employee
//! - [`EmployeeTaxYearSummary`], one per employee and year, with a row per month
//! - [`FlatRateCompanyPeriod`], one per company and month, listing flat-rate employees
//!
//! Totals on every summary are derived from its rows. The [`Summary`] trait
//! exposes both the stored and the re-derived totals so the reconciler can
//! compare them.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::models::{ContributionResult, Period, TaxResult, TaxStatus, YtdContext};

/// Lifecycle state of a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryStatus {
    /// Accepts updates.
    #[default]
    Draft,
    /// Terminal; every mutation is rejected.
    Finalized,
}

/// Whether an upsert replaced an existing row or appended a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowChange {
    /// A new row was appended.
    Inserted,
    /// An existing row was overwritten in place.
    Updated,
}

/// Natural key of a company-month summary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeriodKey {
    /// The company.
    pub company: String,
    /// The month.
    pub period: Period,
}

impl PeriodKey {
    /// Creates a key.
    pub fn new(company: impl Into<String>, period: Period) -> Self {
        Self {
            company: company.into(),
            period,
        }
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.company, self.period)
    }
}

/// Natural key of an employee-year summary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaxYearKey {
    /// The employee.
    pub employee_id: String,
    /// The tax year.
    pub year: i32,
}

impl TaxYearKey {
    /// Creates a key.
    pub fn new(employee_id: impl Into<String>, year: i32) -> Self {
        Self {
            employee_id: employee_id.into(),
            year,
        }
    }
}

impl fmt::Display for TaxYearKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.employee_id, self.year)
    }
}

/// Behaviour shared by the three summary records.
pub trait Summary {
    /// Human-readable natural key, used in errors and logs.
    fn summary_key(&self) -> String;

    /// Current lifecycle state.
    fn status(&self) -> SummaryStatus;

    /// Moves the summary to `Finalized`.
    fn finalize(&mut self);

    /// Totals as stored on the summary.
    fn stored_totals(&self) -> Vec<(&'static str, Decimal)>;

    /// Totals re-derived from the rows.
    fn derived_totals(&self) -> Vec<(&'static str, Decimal)>;

    /// Overwrites stored totals with values derived from the rows.
    fn recompute_totals(&mut self);

    /// Removes rows sourced from `slip_id`, returning how many were removed.
    fn remove_slip(&mut self, slip_id: &str) -> usize;

    /// Returns true when a row is sourced from `slip_id`.
    fn contains_slip(&self, slip_id: &str) -> bool;

    /// Returns true once finalized.
    fn is_finalized(&self) -> bool {
        self.status() == SummaryStatus::Finalized
    }

    /// Fails with [`EngineError::SummaryFinalized`] unless the summary is a draft.
    fn ensure_draft(&self) -> EngineResult<()> {
        if self.is_finalized() {
            return Err(EngineError::SummaryFinalized {
                summary: self.summary_key(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// BPJS company-period summary
// ---------------------------------------------------------------------------

/// One employee's BPJS amounts in a company-period summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BpjsEmployeeRow {
    /// The employee.
    pub employee_id: String,
    /// Display name.
    #[serde(default)]
    pub employee_name: Option<String>,
    /// Kesehatan, employee share.
    pub kesehatan_employee: Decimal,
    /// Kesehatan, employer share.
    pub kesehatan_employer: Decimal,
    /// JHT, employee share.
    pub jht_employee: Decimal,
    /// JHT, employer share.
    pub jht_employer: Decimal,
    /// JP, employee share.
    pub jp_employee: Decimal,
    /// JP, employer share.
    pub jp_employer: Decimal,
    /// JKK, employer share.
    pub jkk_employer: Decimal,
    /// JKM, employer share.
    pub jkm_employer: Decimal,
    /// Source salary slip.
    pub slip_id: String,
}

impl BpjsEmployeeRow {
    /// Builds a row from a contribution result.
    pub fn from_contribution(
        employee_id: impl Into<String>,
        employee_name: Option<String>,
        contribution: &ContributionResult,
        slip_id: impl Into<String>,
    ) -> Self {
        Self {
            employee_id: employee_id.into(),
            employee_name,
            kesehatan_employee: contribution.kesehatan.employee_amount,
            kesehatan_employer: contribution.kesehatan.employer_amount,
            jht_employee: contribution.jht.employee_amount,
            jht_employer: contribution.jht.employer_amount,
            jp_employee: contribution.jp.employee_amount,
            jp_employer: contribution.jp.employer_amount,
            jkk_employer: contribution.jkk.employer_amount,
            jkm_employer: contribution.jkm.employer_amount,
            slip_id: slip_id.into(),
        }
    }

    /// Sum of employee shares.
    pub fn total_employee(&self) -> Decimal {
        self.kesehatan_employee + self.jht_employee + self.jp_employee
    }

    /// Sum of employer shares.
    pub fn total_employer(&self) -> Decimal {
        self.kesehatan_employer
            + self.jht_employer
            + self.jp_employer
            + self.jkk_employer
            + self.jkm_employer
    }
}

/// Column totals of a [`BpjsPeriodSummary`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BpjsTotals {
    /// Kesehatan, employee share.
    pub kesehatan_employee: Decimal,
    /// Kesehatan, employer share.
    pub kesehatan_employer: Decimal,
    /// JHT, employee share.
    pub jht_employee: Decimal,
    /// JHT, employer share.
    pub jht_employer: Decimal,
    /// JP, employee share.
    pub jp_employee: Decimal,
    /// JP, employer share.
    pub jp_employer: Decimal,
    /// JKK, employer share.
    pub jkk_employer: Decimal,
    /// JKM, employer share.
    pub jkm_employer: Decimal,
    /// All employee shares.
    pub total_employee: Decimal,
    /// All employer shares.
    pub total_employer: Decimal,
    /// Employee plus employer.
    pub grand_total: Decimal,
}

impl BpjsTotals {
    /// Sums the given rows.
    pub fn from_rows(rows: &[BpjsEmployeeRow]) -> Self {
        let mut totals = Self::default();
        for row in rows {
            totals.kesehatan_employee += row.kesehatan_employee;
            totals.kesehatan_employer += row.kesehatan_employer;
            totals.jht_employee += row.jht_employee;
            totals.jht_employer += row.jht_employer;
            totals.jp_employee += row.jp_employee;
            totals.jp_employer += row.jp_employer;
            totals.jkk_employer += row.jkk_employer;
            totals.jkm_employer += row.jkm_employer;
        }
        totals.total_employee = totals.kesehatan_employee + totals.jht_employee + totals.jp_employee;
        totals.total_employer = totals.kesehatan_employer
            + totals.jht_employer
            + totals.jp_employer
            + totals.jkk_employer
            + totals.jkm_employer;
        totals.grand_total = totals.total_employee + totals.total_employer;
        totals
    }

    fn named(&self) -> Vec<(&'static str, Decimal)> {
        vec![
            ("kesehatan_employee", self.kesehatan_employee),
            ("kesehatan_employer", self.kesehatan_employer),
            ("jht_employee", self.jht_employee),
            ("jht_employer", self.jht_employer),
            ("jp_employee", self.jp_employee),
            ("jp_employer", self.jp_employer),
            ("jkk_employer", self.jkk_employer),
            ("jkm_employer", self.jkm_employer),
            ("total_employee", self.total_employee),
            ("total_employer", self.total_employer),
            ("grand_total", self.grand_total),
        ]
    }
}

/// BPJS contributions of every employee of a company for one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BpjsPeriodSummary {
    /// Company and month.
    pub key: PeriodKey,
    /// Lifecycle state.
    pub status: SummaryStatus,
    /// Set once every expected employee has a row.
    pub complete: bool,
    /// One row per employee.
    pub rows: Vec<BpjsEmployeeRow>,
    /// Column totals.
    pub totals: BpjsTotals,
}

impl BpjsPeriodSummary {
    /// Creates an empty draft.
    pub fn new(key: PeriodKey) -> Self {
        Self {
            key,
            status: SummaryStatus::Draft,
            complete: false,
            rows: Vec::new(),
            totals: BpjsTotals::default(),
        }
    }

    /// Replaces the employee's row or appends one, then recomputes totals.
    pub fn upsert_row(&mut self, row: BpjsEmployeeRow) -> RowChange {
        let change = match self
            .rows
            .iter_mut()
            .find(|existing| existing.employee_id == row.employee_id)
        {
            Some(existing) => {
                *existing = row;
                RowChange::Updated
            }
            None => {
                self.rows.push(row);
                RowChange::Inserted
            }
        };
        self.recompute_totals();
        change
    }

    /// Returns the row for `employee_id`.
    pub fn row(&self, employee_id: &str) -> Option<&BpjsEmployeeRow> {
        self.rows.iter().find(|row| row.employee_id == employee_id)
    }

    /// Employees with a row.
    pub fn employee_ids(&self) -> Vec<&str> {
        self.rows.iter().map(|row| row.employee_id.as_str()).collect()
    }
}

impl Summary for BpjsPeriodSummary {
    fn summary_key(&self) -> String {
        format!("bpjs:{}", self.key)
    }

    fn status(&self) -> SummaryStatus {
        self.status
    }

    fn finalize(&mut self) {
        self.status = SummaryStatus::Finalized;
    }

    fn stored_totals(&self) -> Vec<(&'static str, Decimal)> {
        self.totals.named()
    }

    fn derived_totals(&self) -> Vec<(&'static str, Decimal)> {
        BpjsTotals::from_rows(&self.rows).named()
    }

    fn recompute_totals(&mut self) {
        self.totals = BpjsTotals::from_rows(&self.rows);
    }

    fn contains_slip(&self, slip_id: &str) -> bool {
        self.rows.iter().any(|row| row.slip_id == slip_id)
    }

    fn remove_slip(&mut self, slip_id: &str) -> usize {
        let before = self.rows.len();
        self.rows.retain(|row| row.slip_id != slip_id);
        let removed = before - self.rows.len();
        if removed > 0 {
            self.complete = false;
            self.recompute_totals();
        }
        removed
    }
}

// ---------------------------------------------------------------------------
// Employee tax-year summary
// ---------------------------------------------------------------------------

/// One month in an employee's tax year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyTaxRow {
    /// Month, 1-12.
    pub month: u32,
    /// Gross pay.
    pub gross_pay: Decimal,
    /// BPJS employee contributions deducted.
    pub bpjs_deduction: Decimal,
    /// PPh 21 withheld.
    pub tax_amount: Decimal,
    /// Whether the flat-rate method was used.
    pub flat_rate_used: bool,
    /// Flat rate in percent, when used.
    #[serde(default)]
    pub flat_rate: Option<Decimal>,
    /// Source salary slip.
    pub slip_id: String,
}

impl MonthlyTaxRow {
    /// Builds a row from a tax result.
    pub fn from_tax(month: u32, tax: &TaxResult, slip_id: impl Into<String>) -> Self {
        Self {
            month,
            gross_pay: tax.gross_pay,
            bpjs_deduction: tax.bpjs_deduction,
            tax_amount: tax.tax_amount,
            flat_rate_used: tax.is_flat_rate(),
            flat_rate: tax.flat_rate.as_ref().map(|m| m.rate),
            slip_id: slip_id.into(),
        }
    }
}

/// Monthly PPh 21 history of one employee for one year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeTaxYearSummary {
    /// Employee and year.
    pub key: TaxYearKey,
    /// Display name.
    #[serde(default)]
    pub employee_name: Option<String>,
    /// Lifecycle state.
    pub status: SummaryStatus,
    /// At most one row per month, ordered by month.
    pub rows: Vec<MonthlyTaxRow>,
    /// Sum of monthly gross.
    pub ytd_gross: Decimal,
    /// Sum of monthly BPJS deductions.
    pub ytd_bpjs: Decimal,
    /// Sum of monthly tax.
    pub ytd_tax: Decimal,
}

impl EmployeeTaxYearSummary {
    /// Creates an empty draft.
    pub fn new(key: TaxYearKey) -> Self {
        Self {
            key,
            employee_name: None,
            status: SummaryStatus::Draft,
            rows: Vec::new(),
            ytd_gross: Decimal::ZERO,
            ytd_bpjs: Decimal::ZERO,
            ytd_tax: Decimal::ZERO,
        }
    }

    /// Replaces the month's row or inserts one in month order, then recomputes totals.
    pub fn upsert_row(&mut self, row: MonthlyTaxRow) -> RowChange {
        let change = match self.rows.iter_mut().find(|existing| existing.month == row.month) {
            Some(existing) => {
                *existing = row;
                RowChange::Updated
            }
            None => {
                let position = self.rows.partition_point(|existing| existing.month < row.month);
                self.rows.insert(position, row);
                RowChange::Inserted
            }
        };
        self.recompute_totals();
        change
    }

    /// Returns the row for `month`.
    pub fn row(&self, month: u32) -> Option<&MonthlyTaxRow> {
        self.rows.iter().find(|row| row.month == month)
    }

    /// Year-to-date totals of the months strictly before `month`.
    ///
    /// ```
    /// use pph21_engine::models::{EmployeeTaxYearSummary, MonthlyTaxRow, TaxYearKey};
    /// use rust_decimal::Decimal;
    ///
    /// let mut summary = EmployeeTaxYearSummary::new(TaxYearKey::new("EMP-001", 2025));
    /// for month in 1..=3 {
    ///     summary.upsert_row(MonthlyTaxRow {
    ///         month,
    ///         gross_pay: Decimal::new(10_000_000, 0),
    ///         bpjs_deduction: Decimal::ZERO,
    ///         tax_amount: Decimal::new(212_500, 0),
    ///         flat_rate_used: false,
    ///         flat_rate: None,
    ///         slip_id: format!("SLIP-{}", month),
    ///     });
    /// }
    ///
    /// let ytd = summary.ytd_before(3);
    /// assert_eq!(ytd.months, 2);
    /// assert_eq!(ytd.tax_paid, Decimal::new(425_000, 0));
    /// ```
    pub fn ytd_before(&self, month: u32) -> YtdContext {
        self.rows
            .iter()
            .filter(|row| row.month < month)
            .fold(YtdContext::default(), |mut ytd, row| {
                ytd.gross += row.gross_pay;
                ytd.bpjs_employee += row.bpjs_deduction;
                ytd.tax_paid += row.tax_amount;
                ytd.months += 1;
                ytd
            })
    }

    fn sums(&self) -> (Decimal, Decimal, Decimal) {
        self.rows.iter().fold(
            (Decimal::ZERO, Decimal::ZERO, Decimal::ZERO),
            |(gross, bpjs, tax), row| {
                (
                    gross + row.gross_pay,
                    bpjs + row.bpjs_deduction,
                    tax + row.tax_amount,
                )
            },
        )
    }
}

impl Summary for EmployeeTaxYearSummary {
    fn summary_key(&self) -> String {
        format!("tax_year:{}", self.key)
    }

    fn status(&self) -> SummaryStatus {
        self.status
    }

    fn finalize(&mut self) {
        self.status = SummaryStatus::Finalized;
    }

    fn stored_totals(&self) -> Vec<(&'static str, Decimal)> {
        vec![
            ("ytd_gross", self.ytd_gross),
            ("ytd_bpjs", self.ytd_bpjs),
            ("ytd_tax", self.ytd_tax),
        ]
    }

    fn derived_totals(&self) -> Vec<(&'static str, Decimal)> {
        let (gross, bpjs, tax) = self.sums();
        vec![("ytd_gross", gross), ("ytd_bpjs", bpjs), ("ytd_tax", tax)]
    }

    fn recompute_totals(&mut self) {
        let (gross, bpjs, tax) = self.sums();
        self.ytd_gross = gross;
        self.ytd_bpjs = bpjs;
        self.ytd_tax = tax;
    }

    fn contains_slip(&self, slip_id: &str) -> bool {
        self.rows.iter().any(|row| row.slip_id == slip_id)
    }

    fn remove_slip(&mut self, slip_id: &str) -> usize {
        let before = self.rows.len();
        self.rows.retain(|row| row.slip_id != slip_id);
        let removed = before - self.rows.len();
        if removed > 0 {
            self.recompute_totals();
        }
        removed
    }
}

// ---------------------------------------------------------------------------
// Flat-rate company-period table
// ---------------------------------------------------------------------------

/// Inputs and outputs of one flat-rate employee, kept for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatRateRow {
    /// The employee.
    pub employee_id: String,
    /// Display name.
    #[serde(default)]
    pub employee_name: Option<String>,
    /// Tax status at calculation time.
    pub status: TaxStatus,
    /// NPWP on file.
    pub has_npwp: bool,
    /// NIK on file.
    pub has_nik: bool,
    /// Gross pay.
    pub gross_pay: Decimal,
    /// Position cost.
    pub position_cost: Decimal,
    /// Net income.
    pub net_income: Decimal,
    /// Applied rate in percent.
    pub rate: Decimal,
    /// PPh 21 withheld.
    pub tax_amount: Decimal,
    /// Source salary slip.
    pub slip_id: String,
}

/// Flat-rate employees of a company for one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatRateCompanyPeriod {
    /// Company and month.
    pub key: PeriodKey,
    /// Lifecycle state.
    pub status: SummaryStatus,
    /// One row per employee.
    pub rows: Vec<FlatRateRow>,
    /// Sum of gross pay.
    pub total_gross: Decimal,
    /// Sum of tax.
    pub total_tax: Decimal,
}

impl FlatRateCompanyPeriod {
    /// Creates an empty draft.
    pub fn new(key: PeriodKey) -> Self {
        Self {
            key,
            status: SummaryStatus::Draft,
            rows: Vec::new(),
            total_gross: Decimal::ZERO,
            total_tax: Decimal::ZERO,
        }
    }

    /// Replaces the employee's row or appends one, then recomputes totals.
    pub fn upsert_row(&mut self, row: FlatRateRow) -> RowChange {
        let change = match self
            .rows
            .iter_mut()
            .find(|existing| existing.employee_id == row.employee_id)
        {
            Some(existing) => {
                *existing = row;
                RowChange::Updated
            }
            None => {
                self.rows.push(row);
                RowChange::Inserted
            }
        };
        self.recompute_totals();
        change
    }

    /// Removes the employee's row, e.g. after they moved to the progressive method.
    pub fn remove_employee(&mut self, employee_id: &str) -> bool {
        let before = self.rows.len();
        self.rows.retain(|row| row.employee_id != employee_id);
        let removed = self.rows.len() != before;
        if removed {
            self.recompute_totals();
        }
        removed
    }

    /// Returns the row for `employee_id`.
    pub fn row(&self, employee_id: &str) -> Option<&FlatRateRow> {
        self.rows.iter().find(|row| row.employee_id == employee_id)
    }

    fn sums(&self) -> (Decimal, Decimal) {
        self.rows.iter().fold((Decimal::ZERO, Decimal::ZERO), |(g, t), row| {
            (g + row.gross_pay, t + row.tax_amount)
        })
    }
}

impl Summary for FlatRateCompanyPeriod {
    fn summary_key(&self) -> String {
        format!("flat_rate:{}", self.key)
    }

    fn status(&self) -> SummaryStatus {
        self.status
    }

    fn finalize(&mut self) {
        self.status = SummaryStatus::Finalized;
    }

    fn stored_totals(&self) -> Vec<(&'static str, Decimal)> {
        vec![("total_gross", self.total_gross), ("total_tax", self.total_tax)]
    }

    fn derived_totals(&self) -> Vec<(&'static str, Decimal)> {
        let (gross, tax) = self.sums();
        vec![("total_gross", gross), ("total_tax", tax)]
    }

    fn recompute_totals(&mut self) {
        let (gross, tax) = self.sums();
        self.total_gross = gross;
        self.total_tax = tax;
    }

    fn contains_slip(&self, slip_id: &str) -> bool {
        self.rows.iter().any(|row| row.slip_id == slip_id)
    }

    fn remove_slip(&mut self, slip_id: &str) -> usize {
        let before = self.rows.len();
        self.rows.retain(|row| row.slip_id != slip_id);
        let removed = before - self.rows.len();
        if removed > 0 {
            self.recompute_totals();
        }
        removed
    }
}
