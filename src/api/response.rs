//! Response types for the payroll deduction API.
//!
//! This module defines the success body, the error response structures and
//! the mapping from [`EngineError`] to HTTP status codes.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, ErrorClass};
use crate::models::{Journal, PayrollOutcome, SlipLineItem};

/// Body of a successful `/calculate` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationResponse {
    /// Contributions, tax, totals and audit trace.
    pub outcome: PayrollOutcome,
    /// Deduction and contribution lines for the salary slip.
    pub line_items: Vec<SlipLineItem>,
    /// Ledger journal, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal: Option<Journal>,
}

/// API error response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional details about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Creates a new API error with details.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details.into()),
        }
    }

    /// Creates a validation error response.
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    /// Creates a malformed JSON error response.
    pub fn malformed_json(message: impl Into<String>) -> Self {
        Self::new("MALFORMED_JSON", message)
    }
}

/// API error with HTTP status code.
pub struct ApiErrorResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The error body.
    pub error: ApiError,
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

impl From<EngineError> for ApiErrorResponse {
    fn from(error: EngineError) -> Self {
        let code = match &error {
            EngineError::ConfigNotFound { .. } | EngineError::ConfigParseError { .. } => {
                "CONFIG_ERROR"
            }
            EngineError::MissingRate { .. } => "MISSING_RATE",
            EngineError::InvalidRateTable { .. } => "INVALID_RATE_TABLE",
            EngineError::RateNotCovered { .. } => "RATE_NOT_COVERED",
            EngineError::PtkpNotFound { .. } => "PTKP_NOT_FOUND",
            EngineError::UnresolvedAccount { .. }
            | EngineError::AccountClassMismatch { .. }
            | EngineError::UnknownAccount { .. } => "ACCOUNT_ERROR",
            EngineError::InvalidPeriod { .. } => "INVALID_PERIOD",
            EngineError::InvalidProfile { .. } => "INVALID_PROFILE",
            EngineError::SummaryFinalized { .. } => "SUMMARY_FINALIZED",
            EngineError::SummaryIncomplete { .. } => "SUMMARY_INCOMPLETE",
            EngineError::CalculationError { .. } => "CALCULATION_ERROR",
        };

        let (status, details) = match error.class() {
            ErrorClass::Config => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "The engine configuration is incomplete for this request",
            ),
            ErrorClass::State => (
                StatusCode::CONFLICT,
                "The target summary no longer accepts this change",
            ),
            ErrorClass::Input => (
                StatusCode::BAD_REQUEST,
                "The request data contains invalid information",
            ),
        };

        ApiErrorResponse {
            status,
            error: ApiError::with_details(code, error.to_string(), details),
        }
    }
}
