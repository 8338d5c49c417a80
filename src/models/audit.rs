//! Audit and warning records shared by every calculation.

use serde::{Deserialize, Serialize};

/// A single step in the audit trace recording a calculation decision.
///
/// Each step captures the input, output, and reasoning for a rule application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStep {
    /// The sequential step number.
    pub step_number: u32,
    /// The unique identifier of the rule that was applied.
    pub rule_id: String,
    /// The human-readable name of the rule.
    pub rule_name: String,
    /// The input data for this step.
    pub input: serde_json::Value,
    /// The output data from this step.
    pub output: serde_json::Value,
    /// Human-readable explanation of the decision.
    pub reasoning: String,
}

/// How serious a [`DataWarning`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational; a documented default was applied.
    Low,
    /// Data was corrected and should be reviewed.
    Medium,
    /// Stored state disagreed with derived state.
    High,
}

/// A recoverable data problem that was corrected with a documented default.
///
/// Warnings never stop processing. They are logged when raised and handed
/// back to the caller alongside the result they affected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataWarning {
    /// A code identifying the type of warning.
    pub code: String,
    /// A human-readable description of the warning.
    pub message: String,
    /// The severity level.
    pub severity: Severity,
}

impl DataWarning {
    /// Creates a warning and emits it through `tracing`.
    pub fn raise(code: &str, message: impl Into<String>, severity: Severity) -> Self {
        let message = message.into();
        tracing::warn!(code, severity = ?severity, "{}", message);
        Self {
            code: code.to_string(),
            message,
            severity,
        }
    }
}

/// Pipeline-level audit record: steps outside the individual calculators,
/// the warnings raised and how long the calculation took.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuditTrace {
    /// Ordered steps.
    pub steps: Vec<AuditStep>,
    /// Warnings raised during the calculation.
    pub warnings: Vec<DataWarning>,
    /// Duration in microseconds.
    pub duration_us: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raise_keeps_code_and_message() {
        let warning = DataWarning::raise("zero_base_salary", "base salary was zero", Severity::Low);
        assert_eq!(warning.code, "zero_base_salary");
        assert_eq!(warning.message, "base salary was zero");
        assert_eq!(warning.severity, Severity::Low);
    }

    #[test]
    fn test_severity_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Severity::Medium).unwrap(), "\"medium\"");
    }

    #[test]
    fn test_audit_step_serialization() {
        let step = AuditStep {
            step_number: 1,
            rule_id: "position_cost".to_string(),
            rule_name: "Position Cost".to_string(),
            input: serde_json::json!({ "gross_pay": "10000000" }),
            output: serde_json::json!({ "position_cost": "500000" }),
            reasoning: "5% of gross capped at 500000".to_string(),
        };

        let json = serde_json::to_string(&step).unwrap();
        assert!(json.contains("\"rule_id\":\"position_cost\""));
        assert!(json.contains("\"step_number\":1"));
    }

    #[test]
    fn test_audit_trace_default_is_empty() {
        let trace = AuditTrace::default();
        assert!(trace.steps.is_empty());
        assert!(trace.warnings.is_empty());
        assert_eq!(trace.duration_us, 0);
    }
}
