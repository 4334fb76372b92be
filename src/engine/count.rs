//! Count rules: the valid-count predicate and the quantity input guard.

use rust_decimal::Decimal;
use std::str::FromStr;

/// Partially typed zeros that must survive while the user is still typing.
const PARTIAL_ZERO: [&str; 3] = ["0", "0,", "0."];

/// The smallest fractional unit a count may be expressed in.
#[must_use]
pub fn default_multiplicity() -> Decimal {
    Decimal::new(5, 1)
}

/// Returns true if `value` is a positive integer or a positive multiple of `multiplicity`.
#[must_use]
pub fn is_valid_count(value: Decimal, multiplicity: Decimal) -> bool {
    if value <= Decimal::ZERO {
        return false;
    }
    if value.fract().is_zero() {
        return true;
    }
    !multiplicity.is_zero() && (value % multiplicity).is_zero()
}

/// Parses a count typed with either `,` or `.` as the decimal separator.
#[must_use]
pub fn parse_count(text: &str) -> Option<Decimal> {
    let normalized = text.trim().replace(',', ".");
    if normalized.is_empty() {
        return None;
    }
    Decimal::from_str(&normalized).ok()
}

/// Outcome of feeding raw text into a quantity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityInput {
    /// Field cleared.
    Empty,
    /// A zero still being typed; kept as text, no value yet.
    Partial,
    /// A valid count.
    Value(Decimal),
    /// Not a valid count; the field must revert to empty.
    Rejected,
}

impl QuantityInput {
    /// Classifies `text` against the valid-count predicate.
    #[must_use]
    pub fn classify(text: &str, multiplicity: Decimal) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Self::Empty;
        }
        if PARTIAL_ZERO.contains(&trimmed) {
            return Self::Partial;
        }
        match parse_count(trimmed) {
            Some(v) if is_valid_count(v, multiplicity) => Self::Value(v),
            _ => Self::Rejected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_integer_counts_are_valid() {
        let m = default_multiplicity();
        assert!(is_valid_count(dec("1"), m));
        assert!(is_valid_count(dec("10"), m));
        assert!(!is_valid_count(dec("0"), m));
        assert!(!is_valid_count(dec("-2"), m));
    }

    #[test]
    fn test_fractional_counts_follow_multiplicity() {
        let m = default_multiplicity();
        assert!(is_valid_count(dec("7.5"), m));
        assert!(is_valid_count(dec("0.5"), m));
        assert!(!is_valid_count(dec("7.3"), m));
        assert!(!is_valid_count(dec("3.3"), m));
        assert!(is_valid_count(dec("0.25"), dec("0.25")));
        assert!(!is_valid_count(dec("0.5"), Decimal::ZERO));
    }

    #[test]
    fn test_parse_accepts_both_separators() {
        assert_eq!(parse_count("7,5"), Some(dec("7.5")));
        assert_eq!(parse_count(" 7.5 "), Some(dec("7.5")));
        assert_eq!(parse_count("abc"), None);
        assert_eq!(parse_count(""), None);
    }

    #[test]
    fn test_partial_zero_is_not_rejected() {
        let m = default_multiplicity();
        assert_eq!(QuantityInput::classify("0", m), QuantityInput::Partial);
        assert_eq!(QuantityInput::classify("0,", m), QuantityInput::Partial);
        assert_eq!(QuantityInput::classify("0.", m), QuantityInput::Partial);
        assert_eq!(QuantityInput::classify("0.0", m), QuantityInput::Rejected);
    }

    #[test]
    fn test_classify_values() {
        let m = default_multiplicity();
        assert_eq!(QuantityInput::classify("", m), QuantityInput::Empty);
        assert_eq!(QuantityInput::classify("7.5", m), QuantityInput::Value(dec("7.5")));
        assert_eq!(QuantityInput::classify("7,5", m), QuantityInput::Value(dec("7.5")));
        assert_eq!(QuantityInput::classify("7.3", m), QuantityInput::Rejected);
        assert_eq!(QuantityInput::classify("1e", m), QuantityInput::Rejected);
    }
}
