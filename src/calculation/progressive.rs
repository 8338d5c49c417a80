//! Progressive bracket tax.
//!
//! The taxable base is sliced through the brackets in ascending
//! `income_from` order; each bracket taxes the part of the base inside
//! `(income_from, income_to]`, with the open-ended bracket absorbing the rest.

use rust_decimal::Decimal;

use crate::config::{RoundingPolicy, TaxBracket};
use crate::error::{EngineError, EngineResult};
use crate::models::{AuditStep, BracketSlice};

/// The result of applying progressive brackets to an annual base.
#[derive(Debug, Clone)]
pub struct ProgressiveTax {
    /// Sum of the bracket amounts.
    pub annual_tax: Decimal,
    /// The brackets the base reached, in ascending order.
    pub slices: Vec<BracketSlice>,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Applies progressive brackets to an annual taxable base.
///
/// Brackets are sorted by `income_from` before use. Each bracket amount is
/// rounded with `rounding` before summing.
///
/// # Arguments
///
/// * `taxable_base` - Annual income after PTKP, never negative
/// * `brackets` - The bracket table
/// * `rounding` - Rounding applied to each bracket amount
/// * `step_number` - The step number for audit trail sequencing
///
/// # Returns
///
/// The annual tax with its bracket breakdown, or
/// [`EngineError::RateNotCovered`] when part of the base falls in a gap
/// between brackets or above the last closed bracket, or
/// [`EngineError::InvalidRateTable`] when brackets the base reaches overlap.
///
/// # Examples
///
/// ```
/// use pph21_engine::calculation::calculate_progressive_tax;
/// use pph21_engine::config::{RoundingPolicy, TaxBracket};
/// use rust_decimal::Decimal;
///
/// let brackets = vec![
///     TaxBracket { income_from: Decimal::ZERO, income_to: Decimal::new(60_000_000, 0), rate: Decimal::new(5, 0) },
///     TaxBracket { income_from: Decimal::new(60_000_000, 0), income_to: Decimal::ZERO, rate: Decimal::new(15, 0) },
/// ];
///
/// let result = calculate_progressive_tax(Decimal::new(100_000_000, 0), &brackets, RoundingPolicy::Floor, 1).unwrap();
/// // 60M x 5% + 40M x 15%
/// assert_eq!(result.annual_tax, Decimal::new(9_000_000, 0));
/// assert_eq!(result.slices.len(), 2);
/// ```
pub fn calculate_progressive_tax(
    taxable_base: Decimal,
    brackets: &[TaxBracket],
    rounding: RoundingPolicy,
    step_number: u32,
) -> EngineResult<ProgressiveTax> {
    let mut ordered: Vec<&TaxBracket> = brackets.iter().collect();
    ordered.sort_by(|a, b| a.income_from.cmp(&b.income_from));

    let mut slices = Vec::new();
    let mut covered = Decimal::ZERO;

    for bracket in &ordered {
        if taxable_base <= bracket.income_from {
            break;
        }
        if bracket.income_from > covered {
            return Err(EngineError::RateNotCovered {
                table: "progressive".to_string(),
                income: covered,
            });
        }
        if bracket.income_from < covered {
            return Err(EngineError::InvalidRateTable {
                table: "progressive".to_string(),
                message: format!(
                    "bracket from {} overlaps the bracket ending at {}",
                    bracket.income_from, covered
                ),
            });
        }
        let upper = if bracket.is_open_ended() {
            taxable_base
        } else {
            taxable_base.min(bracket.income_to)
        };
        let taxable_amount = upper - bracket.income_from;
        let tax = rounding.apply(taxable_amount * bracket.rate / Decimal::ONE_HUNDRED);
        slices.push(BracketSlice {
            income_from: bracket.income_from,
            income_to: bracket.income_to,
            rate: bracket.rate,
            taxable_amount,
            tax,
        });
        covered = upper;
    }

    if taxable_base > Decimal::ZERO && covered < taxable_base {
        return Err(EngineError::RateNotCovered {
            table: "progressive".to_string(),
            income: taxable_base,
        });
    }

    let annual_tax: Decimal = slices.iter().map(|s| s.tax).sum();

    let breakdown: Vec<String> = slices
        .iter()
        .map(|s| format!("{} x {}% = {}", s.taxable_amount, s.rate.normalize(), s.tax.normalize()))
        .collect();
    let audit_step = AuditStep {
        step_number,
        rule_id: "progressive_brackets".to_string(),
        rule_name: "Progressive Brackets".to_string(),
        input: serde_json::json!({
            "taxable_base": taxable_base.to_string(),
            "brackets": ordered.len(),
            "rounding": rounding
        }),
        output: serde_json::json!({
            "annual_tax": annual_tax.normalize().to_string(),
            "brackets_used": slices.len()
        }),
        reasoning: if breakdown.is_empty() {
            "Taxable base is zero".to_string()
        } else {
            breakdown.join("; ")
        },
    };

    Ok(ProgressiveTax {
        annual_tax,
        slices,
        audit_step,
    })
}
