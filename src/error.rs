//! Error types for the payroll deduction engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for all error conditions that can occur while computing contributions,
//! withholding tax and period summaries.

use rust_decimal::Decimal;
use thiserror::Error;

/// Broad classification of an [`EngineError`].
///
/// Configuration errors mean the rate or account setup is incomplete and
/// would silently under- or over-withhold if defaulted. State errors mean a
/// write was attempted against a summary that no longer accepts one. Input
/// errors mean the caller supplied data the engine cannot correct on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Missing or invalid configuration.
    Config,
    /// A summary lifecycle rule was violated.
    State,
    /// Invalid caller input.
    Input,
}

/// The main error type for the payroll deduction engine.
///
/// # Example
///
/// ```
/// use pph21_engine::error::{EngineError, ErrorClass};
///
/// let error = EngineError::ConfigNotFound {
///     path: "/missing/bpjs.yaml".to_string(),
/// };
/// assert_eq!(error.to_string(), "Configuration file not found: /missing/bpjs.yaml");
/// assert_eq!(error.class(), ErrorClass::Config);
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// A required contribution rate or salary cap is absent.
    #[error("Missing rate '{field}' for program '{program}'")]
    MissingRate {
        /// The BPJS program the field belongs to.
        program: String,
        /// The missing field.
        field: String,
    },

    /// A rate table failed validation (gap, overlap, misplaced open bracket).
    #[error("Invalid rate table '{table}': {message}")]
    InvalidRateTable {
        /// The table that failed validation.
        table: String,
        /// What is wrong with it.
        message: String,
    },

    /// No bracket or flat-rate range covers the given income.
    #[error("Rate table '{table}' does not cover income {income}")]
    RateNotCovered {
        /// The table that was searched.
        table: String,
        /// The income that fell outside every range.
        income: Decimal,
    },

    /// No PTKP amount is configured for a tax status.
    #[error("PTKP amount not configured for status {status}")]
    PtkpNotFound {
        /// The status code that was looked up.
        status: String,
    },

    /// No ledger account mapping matched a component.
    #[error("No account mapped for component '{component}' ({direction}) in company '{company}'")]
    UnresolvedAccount {
        /// The payroll component.
        component: String,
        /// Debit or credit.
        direction: String,
        /// The company the lookup was made for.
        company: String,
    },

    /// A mapped account is not of the ledger class its leg requires.
    #[error("Account '{account}' for '{component}' must be {expected}, found {actual}")]
    AccountClassMismatch {
        /// The mapped account.
        account: String,
        /// The component/leg the mapping serves.
        component: String,
        /// The required account class.
        expected: String,
        /// The class recorded in the account directory.
        actual: String,
    },

    /// A company-scoped mapping points at an account missing from the directory.
    #[error("Account '{account}' is not in the account directory")]
    UnknownAccount {
        /// The account that could not be found.
        account: String,
    },

    /// A period input failed validation.
    #[error("Invalid period for employee '{employee_id}': {message}")]
    InvalidPeriod {
        /// The employee the input belongs to.
        employee_id: String,
        /// A description of what made the period invalid.
        message: String,
    },

    /// A tax profile failed validation under a strict policy.
    #[error("Invalid tax profile field '{field}': {message}")]
    InvalidProfile {
        /// The field that was invalid.
        field: String,
        /// A description of what made the field invalid.
        message: String,
    },

    /// A mutation was attempted on a finalized summary.
    #[error("Summary '{summary}' is already finalized")]
    SummaryFinalized {
        /// The natural key of the summary.
        summary: String,
    },

    /// A summary cannot be marked complete because employees are missing.
    #[error("Summary '{summary}' is missing employees: {}", missing.join(", "))]
    SummaryIncomplete {
        /// The natural key of the summary.
        summary: String,
        /// Expected employees with no row.
        missing: Vec<String>,
    },

    /// A general calculation error occurred.
    #[error("Calculation error: {message}")]
    CalculationError {
        /// A description of the calculation error.
        message: String,
    },
}

impl EngineError {
    /// Returns the broad class of this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            EngineError::ConfigNotFound { .. }
            | EngineError::ConfigParseError { .. }
            | EngineError::MissingRate { .. }
            | EngineError::InvalidRateTable { .. }
            | EngineError::RateNotCovered { .. }
            | EngineError::PtkpNotFound { .. }
            | EngineError::UnresolvedAccount { .. }
            | EngineError::AccountClassMismatch { .. }
            | EngineError::UnknownAccount { .. } => ErrorClass::Config,
            EngineError::SummaryFinalized { .. } | EngineError::SummaryIncomplete { .. } => {
                ErrorClass::State
            }
            EngineError::InvalidPeriod { .. }
            | EngineError::InvalidProfile { .. }
            | EngineError::CalculationError { .. } => ErrorClass::Input,
        }
    }
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_not_found_displays_path() {
        let error = EngineError::ConfigNotFound {
            path: "/missing/file.yaml".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Configuration file not found: /missing/file.yaml"
        );
    }

    #[test]
    fn test_missing_rate_displays_program_and_field() {
        let error = EngineError::MissingRate {
            program: "jp".to_string(),
            field: "salary_cap".to_string(),
        };
        assert_eq!(error.to_string(), "Missing rate 'salary_cap' for program 'jp'");
        assert_eq!(error.class(), ErrorClass::Config);
    }

    #[test]
    fn test_rate_not_covered_displays_income() {
        let error = EngineError::RateNotCovered {
            table: "progressive".to_string(),
            income: Decimal::new(75_000_000, 0),
        };
        assert_eq!(
            error.to_string(),
            "Rate table 'progressive' does not cover income 75000000"
        );
    }

    #[test]
    fn test_unresolved_account_displays_lookup() {
        let error = EngineError::UnresolvedAccount {
            component: "bpjs_jht_employee".to_string(),
            direction: "credit".to_string(),
            company: "PT Maju".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "No account mapped for component 'bpjs_jht_employee' (credit) in company 'PT Maju'"
        );
    }

    #[test]
    fn test_summary_incomplete_lists_missing_employees() {
        let error = EngineError::SummaryIncomplete {
            summary: "PT Maju/2025-03".to_string(),
            missing: vec!["EMP-002".to_string(), "EMP-003".to_string()],
        };
        assert_eq!(
            error.to_string(),
            "Summary 'PT Maju/2025-03' is missing employees: EMP-002, EMP-003"
        );
        assert_eq!(error.class(), ErrorClass::State);
    }

    #[test]
    fn test_finalized_is_state_error() {
        let error = EngineError::SummaryFinalized {
            summary: "EMP-001/2025".to_string(),
        };
        assert_eq!(error.class(), ErrorClass::State);
    }

    #[test]
    fn test_invalid_period_is_input_error() {
        let error = EngineError::InvalidPeriod {
            employee_id: "EMP-001".to_string(),
            message: "dates span two months".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid period for employee 'EMP-001': dates span two months"
        );
        assert_eq!(error.class(), ErrorClass::Input);
    }

    #[test]
    fn test_errors_implement_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<EngineError>();
    }

    #[test]
    fn test_error_propagation_with_question_mark() {
        fn returns_ptkp_not_found() -> EngineResult<()> {
            Err(EngineError::PtkpNotFound {
                status: "K3".to_string(),
            })
        }

        fn propagates_error() -> EngineResult<()> {
            returns_ptkp_not_found()?;
            Ok(())
        }

        assert!(propagates_error().is_err());
    }
}
