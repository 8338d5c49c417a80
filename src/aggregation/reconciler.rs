//! Consistency checks for stored summaries and slip line items.
//!
//! Mismatches are never fatal: they are corrected where the record still
//! accepts writes and always reported as [`DataWarning`]s.

use crate::models::{DataWarning, PayrollOutcome, Severity, SlipLineItem, Summary};

/// Checks summaries and slip line items against the amounts they derive from.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComponentReconciler;

impl ComponentReconciler {
    /// Creates a reconciler.
    pub fn new() -> Self {
        Self
    }

    /// Re-derives every tracked total from the summary's rows and compares.
    ///
    /// Drifted totals on a draft are overwritten with the derived values.
    /// A finalized summary is left untouched and the drift is reported with
    /// high severity.
    ///
    /// # Returns
    ///
    /// One warning per drifted total; empty when consistent.
    pub fn reconcile_totals<S: Summary>(&self, summary: &mut S) -> Vec<DataWarning> {
        let stored = summary.stored_totals();
        let derived = summary.derived_totals();
        let finalized = summary.is_finalized();

        let warnings: Vec<DataWarning> = stored
            .iter()
            .zip(derived.iter())
            .filter(|((_, stored), (_, derived))| stored != derived)
            .map(|((name, stored), (_, derived))| {
                if finalized {
                    DataWarning::raise(
                        "total_mismatch_finalized",
                        format!(
                            "{}: {} is {} but rows sum to {}; summary is finalized and was not corrected",
                            summary.summary_key(),
                            name,
                            stored,
                            derived
                        ),
                        Severity::High,
                    )
                } else {
                    DataWarning::raise(
                        "total_corrected",
                        format!(
                            "{}: {} corrected from {} to {}",
                            summary.summary_key(),
                            name,
                            stored,
                            derived
                        ),
                        Severity::Medium,
                    )
                }
            })
            .collect();

        if !warnings.is_empty() && !finalized {
            summary.recompute_totals();
        }
        warnings
    }

    /// Compares slip line items with the calculated amounts.
    ///
    /// Missing items are added, drifted amounts are overwritten, and items
    /// for components the outcome does not carry (e.g. a program the
    /// employee is not enrolled in) are removed. Lines are then ordered as
    /// the calculation produces them.
    pub fn reconcile_line_items(
        &self,
        outcome: &PayrollOutcome,
        items: &mut Vec<SlipLineItem>,
    ) -> Vec<DataWarning> {
        let expected = outcome.line_items();
        let mut warnings = Vec::new();

        items.retain(|item| {
            let known = expected.iter().any(|e| e.component == item.component);
            if !known {
                warnings.push(DataWarning::raise(
                    "unexpected_line_item",
                    format!(
                        "Slip {}: removed {} ({}) not produced by the calculation",
                        outcome.slip_id, item.component, item.amount
                    ),
                    Severity::Medium,
                ));
            }
            known
        });

        for want in &expected {
            match items.iter_mut().find(|item| item.component == want.component) {
                Some(item) if item.amount != want.amount => {
                    warnings.push(DataWarning::raise(
                        "line_item_drift",
                        format!(
                            "Slip {}: {} corrected from {} to {}",
                            outcome.slip_id, want.component, item.amount, want.amount
                        ),
                        Severity::Medium,
                    ));
                    item.amount = want.amount;
                }
                Some(_) => {}
                None => {
                    warnings.push(DataWarning::raise(
                        "missing_line_item",
                        format!(
                            "Slip {}: added missing {} ({})",
                            outcome.slip_id, want.component, want.amount
                        ),
                        Severity::Low,
                    ));
                    items.push(want.clone());
                }
            }
        }

        items.sort_by_key(|item| {
            expected
                .iter()
                .position(|e| e.component == item.component)
                .unwrap_or(usize::MAX)
        });
        warnings
    }
}
