//! Position cost (biaya jabatan) calculation.

use rust_decimal::Decimal;

use crate::config::PositionCostConfig;

/// Returns the position cost for `gross` earned over `months` months.
///
/// The deduction is `gross * percent / 100`, capped at `monthly_cap * months`.
///
/// # Examples
///
/// ```
/// use pph21_engine::calculation::calculate_position_cost;
/// use pph21_engine::config::PositionCostConfig;
/// use rust_decimal::Decimal;
///
/// let config = PositionCostConfig {
///     percent: Decimal::new(5, 0),
///     monthly_cap: Decimal::new(500_000, 0),
/// };
///
/// assert_eq!(calculate_position_cost(Decimal::new(8_000_000, 0), &config, 1), Decimal::new(400_000, 0));
/// assert_eq!(calculate_position_cost(Decimal::new(20_000_000, 0), &config, 1), Decimal::new(500_000, 0));
/// assert_eq!(calculate_position_cost(Decimal::new(240_000_000, 0), &config, 12), Decimal::new(6_000_000, 0));
/// ```
pub fn calculate_position_cost(gross: Decimal, config: &PositionCostConfig, months: u32) -> Decimal {
    let uncapped = gross * config.percent / Decimal::ONE_HUNDRED;
    let cap = config.monthly_cap * Decimal::from(months);
    uncapped.min(cap).max(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn config() -> PositionCostConfig {
        PositionCostConfig {
            percent: dec("5"),
            monthly_cap: dec("500000"),
        }
    }

    #[test]
    fn test_below_cap_is_five_percent() {
        assert_eq!(calculate_position_cost(dec("6000000"), &config(), 1), dec("300000"));
    }

    #[test]
    fn test_exactly_at_cap() {
        assert_eq!(calculate_position_cost(dec("10000000"), &config(), 1), dec("500000"));
    }

    #[test]
    fn test_cap_scales_with_months() {
        assert_eq!(calculate_position_cost(dec("60000000"), &config(), 3), dec("1500000"));
        assert_eq!(calculate_position_cost(dec("20000000"), &config(), 3), dec("1000000"));
    }

    #[test]
    fn test_zero_gross() {
        assert_eq!(calculate_position_cost(Decimal::ZERO, &config(), 1), Decimal::ZERO);
    }
}
