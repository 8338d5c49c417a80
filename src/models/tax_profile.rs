//! Employee tax profile and BPJS enrollment.
//!
//! This module defines the [`TaxProfile`] read by the calculators, the
//! [`TaxStatus`] marital/dependents classification and the per-program
//! [`BpjsEnrollment`] flags.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::models::{DataWarning, Severity};

/// Marital and dependents classification used for PTKP and flat-rate lookups.
///
/// The trailing digit is the number of dependents (0-3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TaxStatus {
    /// Single, no dependents.
    #[serde(rename = "TK0")]
    Tk0,
    /// Single, one dependent.
    #[serde(rename = "TK1")]
    Tk1,
    /// Single, two dependents.
    #[serde(rename = "TK2")]
    Tk2,
    /// Single, three dependents.
    #[serde(rename = "TK3")]
    Tk3,
    /// Married, no dependents.
    #[serde(rename = "K0")]
    K0,
    /// Married, one dependent.
    #[serde(rename = "K1")]
    K1,
    /// Married, two dependents.
    #[serde(rename = "K2")]
    K2,
    /// Married, three dependents.
    #[serde(rename = "K3")]
    K3,
}

impl TaxStatus {
    /// All status codes in table order.
    pub const ALL: [TaxStatus; 8] = [
        TaxStatus::Tk0,
        TaxStatus::Tk1,
        TaxStatus::Tk2,
        TaxStatus::Tk3,
        TaxStatus::K0,
        TaxStatus::K1,
        TaxStatus::K2,
        TaxStatus::K3,
    ];

    /// Returns the status code as written in configuration (e.g. `"K1"`).
    pub fn code(&self) -> &'static str {
        match self {
            TaxStatus::Tk0 => "TK0",
            TaxStatus::Tk1 => "TK1",
            TaxStatus::Tk2 => "TK2",
            TaxStatus::Tk3 => "TK3",
            TaxStatus::K0 => "K0",
            TaxStatus::K1 => "K1",
            TaxStatus::K2 => "K2",
            TaxStatus::K3 => "K3",
        }
    }

    /// Number of dependents encoded in the trailing digit.
    ///
    /// ```
    /// use pph21_engine::models::TaxStatus;
    ///
    /// assert_eq!(TaxStatus::K2.dependents(), 2);
    /// assert_eq!(TaxStatus::Tk0.dependents(), 0);
    /// ```
    pub fn dependents(&self) -> u8 {
        match self {
            TaxStatus::Tk0 | TaxStatus::K0 => 0,
            TaxStatus::Tk1 | TaxStatus::K1 => 1,
            TaxStatus::Tk2 | TaxStatus::K2 => 2,
            TaxStatus::Tk3 | TaxStatus::K3 => 3,
        }
    }

    /// Returns true for the married (`K`) statuses.
    pub fn is_married(&self) -> bool {
        matches!(
            self,
            TaxStatus::K0 | TaxStatus::K1 | TaxStatus::K2 | TaxStatus::K3
        )
    }
}

impl fmt::Display for TaxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for TaxStatus {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace('/', "");
        TaxStatus::ALL
            .into_iter()
            .find(|status| status.code() == normalized)
            .ok_or_else(|| EngineError::InvalidProfile {
                field: "status".to_string(),
                message: format!("unknown tax status '{}'", s),
            })
    }
}

/// The five BPJS programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BpjsProgram {
    /// Health insurance (BPJS Kesehatan).
    Kesehatan,
    /// Old-age security (Jaminan Hari Tua).
    Jht,
    /// Pension (Jaminan Pensiun).
    Jp,
    /// Work-accident insurance (Jaminan Kecelakaan Kerja).
    Jkk,
    /// Death insurance (Jaminan Kematian).
    Jkm,
}

impl BpjsProgram {
    /// All programs in the order they are reported.
    pub const ALL: [BpjsProgram; 5] = [
        BpjsProgram::Kesehatan,
        BpjsProgram::Jht,
        BpjsProgram::Jp,
        BpjsProgram::Jkk,
        BpjsProgram::Jkm,
    ];

    /// Configuration key of the program.
    pub fn key(&self) -> &'static str {
        match self {
            BpjsProgram::Kesehatan => "kesehatan",
            BpjsProgram::Jht => "jht",
            BpjsProgram::Jp => "jp",
            BpjsProgram::Jkk => "jkk",
            BpjsProgram::Jkm => "jkm",
        }
    }
}

impl fmt::Display for BpjsProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Per-program BPJS enrollment flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BpjsEnrollment {
    /// Enrolled in BPJS Kesehatan.
    #[serde(default)]
    pub kesehatan: bool,
    /// Enrolled in JHT.
    #[serde(default)]
    pub jht: bool,
    /// Enrolled in JP.
    #[serde(default)]
    pub jp: bool,
    /// Enrolled in JKK.
    #[serde(default)]
    pub jkk: bool,
    /// Enrolled in JKM.
    #[serde(default)]
    pub jkm: bool,
}

impl BpjsEnrollment {
    /// Enrollment in every program.
    pub fn all() -> Self {
        Self {
            kesehatan: true,
            jht: true,
            jp: true,
            jkk: true,
            jkm: true,
        }
    }

    /// Enrollment in no program.
    pub fn none() -> Self {
        Self::default()
    }

    /// Builds enrollment from the health / employment pair used on employee records.
    ///
    /// The employment flag (BPJS Ketenagakerjaan) covers JHT, JP, JKK and JKM.
    ///
    /// ```
    /// use pph21_engine::models::{BpjsEnrollment, BpjsProgram};
    ///
    /// let enrollment = BpjsEnrollment::from_legacy(true, false);
    /// assert!(enrollment.is_enrolled(BpjsProgram::Kesehatan));
    /// assert!(!enrollment.is_enrolled(BpjsProgram::Jht));
    /// ```
    pub fn from_legacy(kesehatan: bool, ketenagakerjaan: bool) -> Self {
        Self {
            kesehatan,
            jht: ketenagakerjaan,
            jp: ketenagakerjaan,
            jkk: ketenagakerjaan,
            jkm: ketenagakerjaan,
        }
    }

    /// Returns whether the employee participates in `program`.
    pub fn is_enrolled(&self, program: BpjsProgram) -> bool {
        match program {
            BpjsProgram::Kesehatan => self.kesehatan,
            BpjsProgram::Jht => self.jht,
            BpjsProgram::Jp => self.jp,
            BpjsProgram::Jkk => self.jkk,
            BpjsProgram::Jkm => self.jkm,
        }
    }

    /// Returns true when no program is enabled.
    pub fn is_empty(&self) -> bool {
        BpjsProgram::ALL.iter().all(|p| !self.is_enrolled(*p))
    }
}

/// What to do when the stored dependents count disagrees with the status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependentsPolicy {
    /// Overwrite the count with the status digit and raise a warning.
    #[default]
    AutoCorrect,
    /// Fail validation.
    Reject,
}

/// Tax profile of one employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxProfile {
    /// Unique identifier for the employee.
    pub employee_id: String,
    /// Display name, carried into summaries.
    #[serde(default)]
    pub employee_name: Option<String>,
    /// Marital/dependents status. Defaults to TK0 with a warning when absent.
    #[serde(default)]
    pub status: Option<TaxStatus>,
    /// Stored dependents count. Derived from `status` when absent.
    #[serde(default)]
    pub dependents: Option<u8>,
    /// Employee has a registered tax ID (NPWP).
    #[serde(default)]
    pub has_npwp: bool,
    /// Employee has a national ID number (NIK) on file.
    #[serde(default)]
    pub has_nik: bool,
    /// Income is taxed under a final scheme; no monthly withholding applies.
    #[serde(default)]
    pub final_tax: bool,
    /// BPJS enrollment. Defaults to no enrollment with a warning when absent.
    #[serde(default)]
    pub enrollment: Option<BpjsEnrollment>,
}

impl TaxProfile {
    /// Creates a profile with the given status, enrolled in every BPJS program.
    pub fn new(employee_id: impl Into<String>, status: TaxStatus) -> Self {
        Self {
            employee_id: employee_id.into(),
            employee_name: None,
            status: Some(status),
            dependents: Some(status.dependents()),
            has_npwp: true,
            has_nik: true,
            final_tax: false,
            enrollment: Some(BpjsEnrollment::all()),
        }
    }

    /// Status used for lookups; TK0 when the profile has none.
    pub fn effective_status(&self) -> TaxStatus {
        self.status.unwrap_or(TaxStatus::Tk0)
    }

    /// Enrollment used for contributions; no programs when unset.
    pub fn effective_enrollment(&self) -> BpjsEnrollment {
        self.enrollment.unwrap_or_default()
    }

    /// Validates the profile, filling documented defaults.
    ///
    /// A missing status becomes TK0, missing enrollment becomes no
    /// enrollment, and a dependents count that disagrees with the status
    /// digit is handled according to `policy`. Every correction is
    /// returned as a [`DataWarning`].
    ///
    /// # Example
    ///
    /// ```
    /// use pph21_engine::models::{DependentsPolicy, TaxProfile, TaxStatus};
    ///
    /// let mut profile = TaxProfile::new("EMP-001", TaxStatus::K2);
    /// profile.dependents = Some(0);
    ///
    /// let warnings = profile.validate(DependentsPolicy::AutoCorrect).unwrap();
    /// assert_eq!(profile.dependents, Some(2));
    /// assert_eq!(warnings[0].code, "dependents_mismatch");
    /// ```
    pub fn validate(&mut self, policy: DependentsPolicy) -> EngineResult<Vec<DataWarning>> {
        let mut warnings = Vec::new();

        if self.status.is_none() {
            warnings.push(DataWarning::raise(
                "missing_tax_status",
                format!(
                    "Employee {} has no tax status, using TK0",
                    self.employee_id
                ),
                Severity::Low,
            ));
            self.status = Some(TaxStatus::Tk0);
        }

        if self.enrollment.is_none() {
            warnings.push(DataWarning::raise(
                "missing_bpjs_enrollment",
                format!(
                    "Employee {} has no BPJS enrollment set, treating as not enrolled",
                    self.employee_id
                ),
                Severity::Low,
            ));
            self.enrollment = Some(BpjsEnrollment::none());
        }

        let expected = self.effective_status().dependents();
        match self.dependents {
            None => self.dependents = Some(expected),
            Some(stored) if stored != expected => match policy {
                DependentsPolicy::AutoCorrect => {
                    warnings.push(DataWarning::raise(
                        "dependents_mismatch",
                        format!(
                            "Employee {} has {} dependents but status {}; corrected to {}",
                            self.employee_id,
                            stored,
                            self.effective_status(),
                            expected
                        ),
                        Severity::Medium,
                    ));
                    self.dependents = Some(expected);
                }
                DependentsPolicy::Reject => {
                    return Err(EngineError::InvalidProfile {
                        field: "dependents".to_string(),
                        message: format!(
                            "{} dependents does not match status {}",
                            stored,
                            self.effective_status()
                        ),
                    });
                }
            },
            Some(_) => {}
        }

        Ok(warnings)
    }
}
