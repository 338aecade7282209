//! Decimal-amount parsing with integer arithmetic only.
//!
//! Statement cells arrive as human text ("$1,234.56", "£7", "12.5"). Money is
//! integer cents everywhere else in the system, so the conversion happens here
//! exactly once and never touches floating point.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum AmountError {
    #[error("'{0}' is not a decimal amount")]
    Malformed(String),
    #[error("'{0}' does not fit in 64-bit cents")]
    OutOfRange(String),
}

/// Parse an amount cell into signed cents.
///
/// Strips currency symbols, thousands separators and whitespace, accepts an
/// optional leading sign and at most two fraction digits.
pub fn parse_amount_to_cents(raw: &str) -> Result<i64, AmountError> {
    let malformed = || AmountError::Malformed(raw.trim().to_string());

    let mut s: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | ' ' | '$' | '€' | '£' | '¥'))
        .collect();
    if s.is_empty() {
        return Err(malformed());
    }

    let negative = s.starts_with('-');
    if negative || s.starts_with('+') {
        s.remove(0);
    }
    if s.is_empty() || s == "." {
        return Err(malformed());
    }

    let (int_part, frac_part) = match s.split_once('.') {
        None => (s.as_str(), ""),
        Some((int_part, frac_part)) => (int_part, frac_part),
    };
    let int_part = if int_part.is_empty() { "0" } else { int_part };

    if !int_part.chars().all(|c| c.is_ascii_digit()) {
        return Err(malformed());
    }
    if frac_part.len() > 2 || !frac_part.chars().all(|c| c.is_ascii_digit()) {
        return Err(malformed());
    }

    let int_val: i64 = int_part
        .parse()
        .map_err(|_| AmountError::OutOfRange(raw.trim().to_string()))?;
    let frac_val: i64 = match frac_part.len() {
        0 => 0,
        1 => frac_part.parse::<i64>().map_err(|_| malformed())? * 10,
        _ => frac_part.parse::<i64>().map_err(|_| malformed())?,
    };

    let cents = int_val
        .checked_mul(100)
        .and_then(|v| v.checked_add(frac_val))
        .ok_or_else(|| AmountError::OutOfRange(raw.trim().to_string()))?;

    Ok(if negative { -cents } else { cents })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("6.50", 650)]
    #[case("$6.50", 650)]
    #[case("1,234.56", 123_456)]
    #[case("12.5", 1250)]
    #[case("12", 1200)]
    #[case("0.05", 5)]
    #[case(".75", 75)]
    #[case("£7", 700)]
    #[case("€ 19.99", 1999)]
    #[case("+3.00", 300)]
    #[case("-15.00", -1500)]
    fn test_parses_common_statement_amounts(#[case] raw: &str, #[case] cents: i64) {
        assert_eq!(parse_amount_to_cents(raw), Ok(cents));
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("abc")]
    #[case("12.345")]
    #[case("1.2.3")]
    #[case("12a.50")]
    #[case("$")]
    fn test_rejects_malformed_amounts(#[case] raw: &str) {
        assert!(matches!(
            parse_amount_to_cents(raw),
            Err(AmountError::Malformed(_))
        ));
    }

    #[test]
    fn test_rejects_overflowing_amount() {
        assert!(matches!(
            parse_amount_to_cents("99999999999999999999"),
            Err(AmountError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_no_floating_point_drift_on_awkward_cents() {
        // 29.99 and friends are the classic f64 trap.
        assert_eq!(parse_amount_to_cents("29.99"), Ok(2999));
        assert_eq!(parse_amount_to_cents("0.29"), Ok(29));
        assert_eq!(parse_amount_to_cents("10.10"), Ok(1010));
    }
}
