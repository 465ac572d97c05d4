//! Conversions between raw token units and the decimal amounts users type and read.

use anyhow::{format_err, Result};
use regex::Regex;
use std::sync::LazyLock;

/// Places shown for wallet and staked balances.
pub const BALANCE_PLACES: usize = 2;
/// Places shown for claimable earnings.
pub const EARNINGS_PLACES: usize = 6;
/// Significant figures shown for the daily reward rate.
pub const RATE_SIGNIFICANT_FIGURES: usize = 3;

static DECIMAL_PATTERN: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^(\d*)(?:\.(\d*))?$"));

fn pow10(exp: u32) -> Option<u128> {
    10u128.checked_pow(exp)
}

/// Converts a user-entered decimal string into raw token units.
///
/// Fractional digits beyond `decimals` are rounded half-up, so "0.125" with two
/// decimals becomes 13.
pub fn natural_from_decimal(input: &str, decimals: u8) -> Result<u64> {
    let input = input.trim();
    let pattern = DECIMAL_PATTERN.as_ref().map_err(|e| format_err!("{}", e))?;
    let captures = pattern
        .captures(input)
        .ok_or_else(|| format_err!("invalid amount: {:?}", input))?;
    let whole = captures.get(1).map_or("", |m| m.as_str());
    let fraction = captures.get(2).map_or("", |m| m.as_str());
    if whole.is_empty() && fraction.is_empty() {
        return Err(format_err!("invalid amount: {:?}", input));
    }

    let decimals = decimals as usize;
    let kept = fraction.len().min(decimals);
    let mut digits = String::with_capacity(whole.len() + decimals);
    digits.push_str(whole);
    digits.push_str(&fraction[..kept]);
    digits.extend(std::iter::repeat('0').take(decimals - kept));

    let digits = digits.trim_start_matches('0');
    let mut natural: u128 = if digits.is_empty() {
        0
    } else {
        digits
            .parse()
            .map_err(|_| format_err!("amount {} is too large", input))?
    };
    if fraction.len() > decimals && fraction.as_bytes()[decimals] >= b'5' {
        natural = natural
            .checked_add(1)
            .ok_or_else(|| format_err!("amount {} is too large", input))?;
    }
    u64::try_from(natural).map_err(|_| format_err!("amount {} is too large", input))
}

/// Lenient form of [`natural_from_decimal`] for form-style inputs.
pub fn try_parse_input(input: &str, decimals: u8) -> Option<u64> {
    natural_from_decimal(input, decimals).ok()
}

pub fn decimal_from_natural(natural: u64, decimals: u8) -> f64 {
    natural as f64 / 10f64.powi(decimals as i32)
}

/// Formats raw units as a decimal with exactly `places` fractional digits,
/// rounding half-up.
pub fn format_natural(natural: u64, decimals: u8, places: usize) -> String {
    let (Some(unit), Some(shown)) = (pow10(decimals as u32), pow10(places as u32)) else {
        return format!("{:.*}", places, decimal_from_natural(natural, decimals));
    };
    let natural = natural as u128;
    let scaled = if places as u32 >= decimals as u32 {
        match pow10(places as u32 - decimals as u32) {
            Some(factor) => natural * factor,
            None => return format!("{:.*}", places, decimal_from_natural(natural as u64, decimals)),
        }
    } else {
        let divisor = unit / shown;
        (natural + divisor / 2) / divisor
    };
    let whole = scaled / shown;
    if places == 0 {
        return whole.to_string();
    }
    format!("{}.{:0width$}", whole, scaled % shown, width = places)
}

/// Formats `value` with `significant` significant figures, switching to
/// exponential notation for very large or very small magnitudes.
pub fn to_precision(value: f64, significant: usize) -> String {
    let significant = significant.max(1);
    if !value.is_finite() {
        return value.to_string();
    }
    if value == 0.0 {
        return format!("{:.*}", significant - 1, 0.0);
    }
    let exponential = format!("{:.*e}", significant - 1, value);
    let (mantissa, exponent) = match exponential.split_once('e') {
        Some((m, e)) => (m.to_string(), e.parse::<i32>().unwrap_or(0)),
        None => return exponential,
    };
    if exponent < -6 || exponent >= significant as i32 {
        let sign = if exponent < 0 { "-" } else { "+" };
        return format!("{}e{}{}", mantissa, sign, exponent.abs());
    }
    let places = (significant as i32 - 1 - exponent).max(0) as usize;
    format!("{:.*}", places, value)
}

/// Human readable countdown such as `1d 2h 3m 4s`. Days are omitted when zero.
pub fn seconds_to_duration(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;
    let secs = seconds % 60;
    if days > 0 {
        format!("{}d {}h {}m {}s", days, hours, minutes, secs)
    } else {
        format!("{}h {}m {}s", hours, minutes, secs)
    }
}

/// Share of `max_staked` taken by `entries`, floored to four decimal places.
pub fn percent_staked(entries: usize, max_staked: u64) -> Option<f64> {
    if max_staked == 0 {
        return None;
    }
    let percent = (entries as f64 * 100.0) / max_staked as f64;
    Some((percent * 10_000.0).floor() / 10_000.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use quickcheck::quickcheck;

    #[test]
    fn parses_whole_and_fractional_amounts() {
        assert_eq!(natural_from_decimal("1", 0).unwrap(), 1);
        assert_eq!(natural_from_decimal("1.5", 6).unwrap(), 1_500_000);
        assert_eq!(natural_from_decimal(".25", 2).unwrap(), 25);
        assert_eq!(natural_from_decimal("3.", 1).unwrap(), 30);
        assert_eq!(natural_from_decimal(" 007 ", 2).unwrap(), 700);
    }

    #[test]
    fn rounds_extra_fraction_digits_half_up() {
        assert_eq!(natural_from_decimal("0.125", 2).unwrap(), 13);
        assert_eq!(natural_from_decimal("0.124", 2).unwrap(), 12);
        assert_eq!(natural_from_decimal("2.5", 0).unwrap(), 3);
    }

    #[test]
    fn rejects_garbage() {
        for input in ["", ".", "-1", "1e5", "abc", "1.2.3"] {
            assert!(natural_from_decimal(input, 6).is_err(), "{input}");
        }
        assert!(natural_from_decimal("18446744073709551616", 0).is_err());
        // u128::MAX that would round up past it
        assert!(natural_from_decimal("340282366920938463463374607431768211455.5", 0).is_err());
        assert_eq!(try_parse_input("nope", 9), None);
    }

    #[test]
    fn formats_balances() {
        assert_eq!(format_natural(1_234_567, 6, BALANCE_PLACES), "1.23");
        assert_eq!(format_natural(1_235_000, 6, BALANCE_PLACES), "1.24");
        assert_eq!(format_natural(5, 0, BALANCE_PLACES), "5.00");
        assert_eq!(format_natural(42, 9, EARNINGS_PLACES), "0.000000");
        assert_eq!(format_natural(1_500, 9, EARNINGS_PLACES), "0.000002");
        assert_eq!(format_natural(7, 1, 0), "1");
    }

    #[test]
    fn precision_matches_three_significant_figures() {
        assert_eq!(to_precision(123.456, 3), "123");
        assert_eq!(to_precision(1.23456, 3), "1.23");
        assert_eq!(to_precision(0.000123456, 3), "0.000123");
        assert_eq!(to_precision(86_400.0, 3), "8.64e+4");
        assert_eq!(to_precision(9.996, 3), "10.0");
        assert_eq!(to_precision(0.0, 3), "0.00");
    }

    #[test]
    fn durations() {
        assert_eq!(seconds_to_duration(59), "0h 0m 59s");
        assert_eq!(seconds_to_duration(93_784), "1d 2h 3m 4s");
    }

    #[test]
    fn percent_is_floored() {
        assert_eq!(percent_staked(1, 3), Some(33.3333));
        assert_eq!(percent_staked(10, 0), None);
    }

    quickcheck! {
        fn duration_components_add_up(seconds: u32) -> bool {
            let rendered = seconds_to_duration(seconds as u64);
            let total: u64 = rendered
                .split_whitespace()
                .map(|part| {
                    let (value, unit) = part.split_at(part.len() - 1);
                    let value: u64 = value.parse().unwrap();
                    match unit {
                        "d" => value * 86_400,
                        "h" => value * 3_600,
                        "m" => value * 60,
                        _ => value,
                    }
                })
                .sum();
            total == seconds as u64
        }
    }

    proptest! {
        #[test]
        fn decimal_round_trips_at_display_precision(
            whole in 0u64..1_000_000,
            cents in 0u64..100,
            decimals in 2u8..=9,
        ) {
            let entered = format!("{}.{:02}", whole, cents);
            let natural = natural_from_decimal(&entered, decimals).unwrap();
            prop_assert_eq!(format_natural(natural, decimals, BALANCE_PLACES), entered);
        }
    }
}
