//! Period input models.
//!
//! This module defines the [`Period`] a payroll run covers, the
//! per-employee [`PeriodInput`] and the [`YtdContext`] carried between months.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::models::{DataWarning, Severity};

/// A calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Period {
    /// The calendar year.
    pub year: i32,
    /// The month, 1-12.
    pub month: u32,
}

impl Period {
    /// Creates a period without validating the month.
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    /// Returns the first day of the month, or `None` when the month is invalid.
    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    /// Returns true when `date` falls inside this month.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

/// One employee's pay for one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodInput {
    /// The employee the pay belongs to.
    pub employee_id: String,
    /// The employing company.
    pub company: String,
    /// The month being paid.
    pub period: Period,
    /// Gross pay for the period.
    pub gross_pay: Decimal,
    /// First day covered by the slip (inclusive).
    pub start_date: NaiveDate,
    /// Last day covered by the slip (inclusive).
    pub end_date: NaiveDate,
    /// Salary base for BPJS. Falls back to the minimum wage when zero or unset.
    #[serde(default)]
    pub base_salary: Option<Decimal>,
    /// Reference of the source salary slip.
    pub slip_id: String,
}

impl PeriodInput {
    /// Checks the period is a real month and both dates fall inside it.
    ///
    /// # Example
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use pph21_engine::models::{Period, PeriodInput};
    /// use rust_decimal::Decimal;
    ///
    /// let input = PeriodInput {
    ///     employee_id: "EMP-001".to_string(),
    ///     company: "PT Maju".to_string(),
    ///     period: Period::new(2025, 3),
    ///     gross_pay: Decimal::new(10_000_000, 0),
    ///     start_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
    ///     end_date: NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
    ///     base_salary: None,
    ///     slip_id: "SLIP-001".to_string(),
    /// };
    ///
    /// assert!(input.validate().is_err());
    /// ```
    pub fn validate(&self) -> EngineResult<()> {
        let invalid = |message: String| EngineError::InvalidPeriod {
            employee_id: self.employee_id.clone(),
            message,
        };

        if self.period.first_day().is_none() {
            return Err(invalid(format!("{} is not a calendar month", self.period)));
        }
        if self.end_date < self.start_date {
            return Err(invalid(format!(
                "end date {} is before start date {}",
                self.end_date, self.start_date
            )));
        }
        if !self.period.contains(self.start_date) || !self.period.contains(self.end_date) {
            return Err(invalid(format!(
                "dates {} to {} are not within {}",
                self.start_date, self.end_date, self.period
            )));
        }
        if self.gross_pay < Decimal::ZERO {
            return Err(invalid(format!("gross pay {} is negative", self.gross_pay)));
        }
        Ok(())
    }

    /// Returns the BPJS salary base, substituting `minimum_wage` when unset or zero.
    pub fn effective_base_salary(&self, minimum_wage: Decimal) -> (Decimal, Option<DataWarning>) {
        match self.base_salary {
            Some(base) if base > Decimal::ZERO => (base, None),
            _ => {
                let warning = DataWarning::raise(
                    "zero_base_salary",
                    format!(
                        "Employee {} has no base salary for {}, using minimum wage {}",
                        self.employee_id, self.period, minimum_wage
                    ),
                    Severity::Low,
                );
                (minimum_wage, Some(warning))
            }
        }
    }
}

/// Year-to-date totals from the months before the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct YtdContext {
    /// Gross pay of the earlier months.
    #[serde(default)]
    pub gross: Decimal,
    /// BPJS employee contributions of the earlier months.
    #[serde(default)]
    pub bpjs_employee: Decimal,
    /// PPh 21 already withheld.
    #[serde(default)]
    pub tax_paid: Decimal,
    /// Number of months included.
    #[serde(default)]
    pub months: u32,
}

impl YtdContext {
    /// Returns true when no earlier month was recorded.
    pub fn is_empty(&self) -> bool {
        self.months == 0
    }
}
