//! Request types for the payroll deduction API.
//!
//! This module defines the JSON request structures for the `/calculate` endpoint.

use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculation::MethodSelection;
use crate::error::{EngineError, EngineResult};
use crate::models::{BpjsEnrollment, Period, PeriodInput, TaxProfile, TaxStatus, YtdContext};

/// Request body for the `/calculate` endpoint.
///
/// Contains everything needed to compute one employee's contributions and
/// withholding for one month.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationRequest {
    /// The employee's tax profile.
    pub employee: EmployeeRequest,
    /// The period being paid.
    pub period: PeriodRequest,
    /// Totals of the earlier months of the tax year.
    #[serde(default)]
    pub ytd: YtdContext,
    /// Forces a tax method instead of the configured month policy.
    #[serde(default)]
    pub method: Option<MethodSelection>,
    /// Also build the ledger journal for the slip.
    #[serde(default)]
    pub include_journal: bool,
}

/// Employee information in a calculation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployeeRequest {
    /// Unique identifier for the employee.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Status code such as `"K1"`; `"K/1"` is accepted too.
    #[serde(default)]
    pub tax_status: Option<String>,
    /// Stored dependents count.
    #[serde(default)]
    pub dependents: Option<u8>,
    /// NPWP on file.
    #[serde(default)]
    pub has_npwp: bool,
    /// NIK on file.
    #[serde(default)]
    pub has_nik: bool,
    /// Income taxed under a final scheme.
    #[serde(default)]
    pub final_tax: bool,
    /// Per-program enrollment; takes precedence over the legacy flags.
    #[serde(default)]
    pub enrollment: Option<BpjsEnrollment>,
    /// Legacy BPJS Kesehatan flag.
    #[serde(default)]
    pub bpjs_kesehatan: Option<bool>,
    /// Legacy BPJS Ketenagakerjaan flag (JHT, JP, JKK and JKM).
    #[serde(default)]
    pub bpjs_ketenagakerjaan: Option<bool>,
}

/// Pay period information in a calculation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodRequest {
    /// The employing company.
    pub company: String,
    /// Calendar year.
    pub year: i32,
    /// Month, 1-12.
    pub month: u32,
    /// Gross pay for the month.
    pub gross_pay: Decimal,
    /// Salary base for BPJS; the minimum wage applies when absent.
    #[serde(default)]
    pub base_salary: Option<Decimal>,
    /// First day covered; defaults to the first of the month.
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// Last day covered; defaults to the last of the month.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Source salary slip.
    pub slip_id: String,
}

impl EmployeeRequest {
    /// Converts the request into a [`TaxProfile`].
    ///
    /// Fails with [`EngineError::InvalidProfile`] on an unknown status code.
    pub fn into_profile(self) -> EngineResult<TaxProfile> {
        let status = self
            .tax_status
            .as_deref()
            .map(str::parse::<TaxStatus>)
            .transpose()?;

        let enrollment = match (self.enrollment, self.bpjs_kesehatan, self.bpjs_ketenagakerjaan) {
            (Some(enrollment), _, _) => Some(enrollment),
            (None, None, None) => None,
            (None, kesehatan, ketenagakerjaan) => Some(BpjsEnrollment::from_legacy(
                kesehatan.unwrap_or(false),
                ketenagakerjaan.unwrap_or(false),
            )),
        };

        Ok(TaxProfile {
            employee_id: self.id,
            employee_name: self.name,
            status,
            dependents: self.dependents,
            has_npwp: self.has_npwp,
            has_nik: self.has_nik,
            final_tax: self.final_tax,
            enrollment,
        })
    }
}

impl PeriodRequest {
    /// Converts the request into a [`PeriodInput`] for `employee_id`.
    ///
    /// Missing dates default to the bounds of the month. Fails with
    /// [`EngineError::InvalidPeriod`] when the month does not exist.
    pub fn into_input(self, employee_id: &str) -> EngineResult<PeriodInput> {
        let period = Period::new(self.year, self.month);
        let first_day = period.first_day().ok_or_else(|| EngineError::InvalidPeriod {
            employee_id: employee_id.to_string(),
            message: format!("{} is not a calendar month", period),
        })?;
        let last_day = first_day
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(first_day);

        Ok(PeriodInput {
            employee_id: employee_id.to_string(),
            company: self.company,
            period,
            gross_pay: self.gross_pay,
            start_date: self.start_date.unwrap_or(first_day),
            end_date: self.end_date.unwrap_or(last_day),
            base_salary: self.base_salary,
            slip_id: self.slip_id,
        })
    }
}
