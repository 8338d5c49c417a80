//! Flat effective rate lookup.

use rust_decimal::Decimal;

use crate::config::FlatRateTable;
use crate::error::{EngineError, EngineResult};
use crate::models::{AuditStep, FlatRateMatch, TaxStatus};

/// The resolved flat rate and its audit step.
#[derive(Debug, Clone)]
pub struct FlatRateLookup {
    /// The matched category and range.
    pub matched: FlatRateMatch,
    /// The audit step recording this lookup.
    pub audit_step: AuditStep,
}

/// Resolves the flat effective rate for a status and monthly gross pay.
///
/// The status selects a category; the category's ranges are searched for
/// the one with `income_from < gross <= income_to` (a range starting at
/// zero also includes zero, and `income_to == 0` is open-ended).
///
/// # Arguments
///
/// * `status` - The employee's tax status
/// * `gross_pay` - Monthly gross pay
/// * `table` - The flat rate table
/// * `step_number` - The step number for audit trail sequencing
///
/// # Returns
///
/// The matched range, or [`EngineError::RateNotCovered`] when the status
/// has no category or no range covers the gross.
///
/// # Examples
///
/// ```
/// use std::collections::{BTreeMap, HashMap};
/// use pph21_engine::calculation::resolve_flat_rate;
/// use pph21_engine::config::{FlatRateRange, FlatRateTable};
/// use pph21_engine::models::TaxStatus;
/// use rust_decimal::Decimal;
///
/// let mut categories = BTreeMap::new();
/// categories.insert("A".to_string(), vec![
///     FlatRateRange { income_from: Decimal::ZERO, income_to: Decimal::new(5_400_000, 0), rate: Decimal::ZERO },
///     FlatRateRange { income_from: Decimal::new(5_400_000, 0), income_to: Decimal::ZERO, rate: Decimal::ONE },
/// ]);
/// let mut status_categories = HashMap::new();
/// status_categories.insert(TaxStatus::Tk0, "A".to_string());
/// let table = FlatRateTable { categories, status_categories };
///
/// let lookup = resolve_flat_rate(TaxStatus::Tk0, Decimal::new(5_400_000, 0), &table, 1).unwrap();
/// assert_eq!(lookup.matched.rate, Decimal::ZERO);
/// ```
pub fn resolve_flat_rate(
    status: TaxStatus,
    gross_pay: Decimal,
    table: &FlatRateTable,
    step_number: u32,
) -> EngineResult<FlatRateLookup> {
    let not_covered = || EngineError::RateNotCovered {
        table: format!("flat_rate:{}", status),
        income: gross_pay,
    };

    let (category, ranges) = table.ranges_for(status).ok_or_else(not_covered)?;
    let range = ranges
        .iter()
        .find(|range| range.contains(gross_pay))
        .ok_or_else(not_covered)?;

    let matched = FlatRateMatch {
        category: category.to_string(),
        income_from: range.income_from,
        income_to: range.income_to,
        rate: range.rate,
    };

    let upper = if range.income_to.is_zero() {
        "and above".to_string()
    } else {
        format!("to {}", range.income_to)
    };
    let audit_step = AuditStep {
        step_number,
        rule_id: "flat_rate_lookup".to_string(),
        rule_name: "Flat Effective Rate Lookup".to_string(),
        input: serde_json::json!({
            "status": status,
            "gross_pay": gross_pay.to_string()
        }),
        output: serde_json::json!({
            "category": category,
            "income_from": range.income_from.to_string(),
            "income_to": range.income_to.to_string(),
            "rate": range.rate.normalize().to_string()
        }),
        reasoning: format!(
            "Status {} uses category {}; {} falls in {} {} at {}%",
            status,
            category,
            gross_pay,
            range.income_from,
            upper,
            range.rate.normalize()
        ),
    };

    Ok(FlatRateLookup {
        matched,
        audit_step,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FlatRateRange;
    use std::collections::{BTreeMap, HashMap};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn range(from: &str, to: &str, rate: &str) -> FlatRateRange {
        FlatRateRange {
            income_from: dec(from),
            income_to: dec(to),
            rate: dec(rate),
        }
    }

    fn table() -> FlatRateTable {
        let mut categories = BTreeMap::new();
        categories.insert(
            "A".to_string(),
            vec![
                range("0", "5400000", "0"),
                range("5400000", "5650000", "0.25"),
                range("5650000", "10000000", "2"),
                range("10000000", "0", "5"),
            ],
        );
        categories.insert(
            "B".to_string(),
            vec![range("0", "6200000", "0"), range("6200000", "20000000", "3")],
        );
        let mut status_categories = HashMap::new();
        status_categories.insert(TaxStatus::Tk0, "A".to_string());
        status_categories.insert(TaxStatus::K1, "B".to_string());
        FlatRateTable {
            categories,
            status_categories,
        }
    }

    #[test]
    fn test_zero_gross_matches_first_range() {
        let lookup = resolve_flat_rate(TaxStatus::Tk0, Decimal::ZERO, &table(), 1).unwrap();
        assert_eq!(lookup.matched.rate, Decimal::ZERO);
    }

    #[test]
    fn test_upper_bound_is_inclusive() {
        let lookup = resolve_flat_rate(TaxStatus::Tk0, dec("5650000"), &table(), 1).unwrap();
        assert_eq!(lookup.matched.rate, dec("0.25"));
    }

    #[test]
    fn test_lower_bound_is_exclusive() {
        let lookup = resolve_flat_rate(TaxStatus::Tk0, dec("5650001"), &table(), 1).unwrap();
        assert_eq!(lookup.matched.rate, dec("2"));
    }

    #[test]
    fn test_open_ended_range() {
        let lookup = resolve_flat_rate(TaxStatus::Tk0, dec("250000000"), &table(), 1).unwrap();
        assert_eq!(lookup.matched.rate, dec("5"));
        assert!(lookup.audit_step.reasoning.contains("and above"));
    }

    #[test]
    fn test_status_selects_category() {
        let lookup = resolve_flat_rate(TaxStatus::K1, dec("10000000"), &table(), 1).unwrap();
        assert_eq!(lookup.matched.category, "B");
        assert_eq!(lookup.matched.rate, dec("3"));
    }

    #[test]
    fn test_income_beyond_closed_category_is_not_covered() {
        let result = resolve_flat_rate(TaxStatus::K1, dec("25000000"), &table(), 1);
        match result {
            Err(EngineError::RateNotCovered { table, income }) => {
                assert_eq!(table, "flat_rate:K1");
                assert_eq!(income, dec("25000000"));
            }
            other => panic!("Expected RateNotCovered, got {:?}", other),
        }
    }

    #[test]
    fn test_unmapped_status_is_not_covered() {
        assert!(resolve_flat_rate(TaxStatus::K3, dec("10000000"), &table(), 1).is_err());
    }
}
