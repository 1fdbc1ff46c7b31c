//! Conversion between user-facing decimal token amounts and the contract's
//! fixed-point integers (18 decimals).

use ethers::types::U256;
use thiserror::Error;

pub const TOKEN_DECIMALS: usize = 18;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,
    #[error("amount `{0}` is not a plain decimal number")]
    Invalid(String),
    #[error("amount `{0}` has more than 18 fractional digits")]
    TooPrecise(String),
    #[error("amount `{0}` does not fit in 256 bits")]
    Overflow(String),
}

/// Parses a decimal amount such as `"1.5"` into base units.
///
/// Only unsigned plain decimals are accepted: no signs, exponents or digit
/// separators. Surrounding whitespace is ignored.
pub fn to_base_units(input: &str) -> Result<U256, AmountError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AmountError::Empty);
    }
    let (whole, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction)
    {
        return Err(AmountError::Invalid(trimmed.to_string()));
    }
    if fraction.len() > TOKEN_DECIMALS {
        return Err(AmountError::TooPrecise(trimmed.to_string()));
    }
    let overflow = || AmountError::Overflow(trimmed.to_string());
    let whole = if whole.is_empty() {
        U256::zero()
    } else {
        U256::from_dec_str(whole).map_err(|_| overflow())?
    };
    let fraction = format!("{fraction:0<width$}", width = TOKEN_DECIMALS);
    let fraction = U256::from_dec_str(&fraction).map_err(|_| overflow())?;
    whole
        .checked_mul(U256::exp10(TOKEN_DECIMALS))
        .and_then(|scaled| scaled.checked_add(fraction))
        .ok_or_else(overflow)
}

/// Renders base units as the shortest exact decimal string, e.g. `"1.5"`.
pub fn from_base_units(value: U256) -> String {
    let (whole, fraction) = value.div_mod(U256::exp10(TOKEN_DECIMALS));
    if fraction.is_zero() {
        return whole.to_string();
    }
    let fraction = format!("{:0>width$}", fraction.to_string(), width = TOKEN_DECIMALS);
    format!("{whole}.{}", fraction.trim_end_matches('0'))
}

/// Inserts `,` between every group of three digits in the integer part.
pub fn group_thousands(value: &str) -> String {
    let (whole, fraction) = match value.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (value, None),
    };
    let len = whole.len();
    let mut grouped = String::with_capacity(value.len() + len / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if let Some(fraction) = fraction {
        grouped.push('.');
        grouped.push_str(fraction);
    }
    grouped
}

pub fn display_amount(value: U256) -> String {
    group_thousands(&from_base_units(value))
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use proptest::prelude::*;

    fn wei(raw: &str) -> U256 {
        U256::from_dec_str(raw).unwrap()
    }

    #[test]
    fn display_amount__fractional_value__drops_trailing_zeros() {
        assert_eq!(display_amount(wei("1500000000000000000")), "1.5");
    }

    #[test]
    fn display_amount__thousands__groups_integer_part() {
        assert_eq!(display_amount(wei("1234000000000000000000")), "1,234");
        assert_eq!(
            display_amount(wei("1234567890500000000000000")),
            "1,234,567.8905"
        );
    }

    #[test]
    fn display_amount__zero__renders_plain_zero() {
        assert_eq!(display_amount(U256::zero()), "0");
    }

    #[test]
    fn from_base_units__single_wei__keeps_all_fraction_digits() {
        assert_eq!(from_base_units(U256::one()), "0.000000000000000001");
    }

    #[test]
    fn group_thousands__leaves_fraction_digits_alone() {
        assert_eq!(group_thousands("1234.5678"), "1,234.5678");
        assert_eq!(group_thousands("999"), "999");
        assert_eq!(group_thousands("100000"), "100,000");
    }

    #[test]
    fn to_base_units__accepts_plain_decimals() {
        assert_eq!(to_base_units("1.5").unwrap(), wei("1500000000000000000"));
        assert_eq!(to_base_units(" 2 ").unwrap(), wei("2000000000000000000"));
        assert_eq!(to_base_units(".5").unwrap(), wei("500000000000000000"));
        assert_eq!(to_base_units("3.").unwrap(), wei("3000000000000000000"));
        assert_eq!(to_base_units("0.000000000000000001").unwrap(), U256::one());
    }

    #[test]
    fn to_base_units__rejects_malformed_input() {
        assert_eq!(to_base_units("   "), Err(AmountError::Empty));
        assert_eq!(to_base_units("."), Err(AmountError::Invalid(".".into())));
        assert_eq!(to_base_units("-1"), Err(AmountError::Invalid("-1".into())));
        assert_eq!(
            to_base_units("1,000"),
            Err(AmountError::Invalid("1,000".into()))
        );
        assert_eq!(
            to_base_units("1.2.3"),
            Err(AmountError::Invalid("1.2.3".into()))
        );
        assert_eq!(
            to_base_units("1e18"),
            Err(AmountError::Invalid("1e18".into()))
        );
    }

    #[test]
    fn to_base_units__too_many_fraction_digits__is_rejected() {
        let input = "0.0000000000000000001";
        assert_eq!(
            to_base_units(input),
            Err(AmountError::TooPrecise(input.into()))
        );
    }

    #[test]
    fn to_base_units__whole_part_too_large__is_overflow_not_panic() {
        let input = format!("1{}", "0".repeat(65));

        assert_eq!(to_base_units(&input), Err(AmountError::Overflow(input.clone())));
    }

    #[test]
    fn to_base_units__u256_max_boundary() {
        // given
        let largest = from_base_units(U256::MAX);
        let past_largest = (U256::MAX / U256::exp10(TOKEN_DECIMALS) + U256::one()).to_string();
        let too_many_digits = "9".repeat(80);

        // then
        assert_eq!(to_base_units(&largest), Ok(U256::MAX));
        assert_eq!(
            to_base_units(&past_largest),
            Err(AmountError::Overflow(past_largest.clone()))
        );
        assert_eq!(
            to_base_units(&too_many_digits),
            Err(AmountError::Overflow(too_many_digits.clone()))
        );
    }

    fn canonical(whole: &str, fraction: &str) -> String {
        let whole = whole.trim_start_matches('0');
        let whole = if whole.is_empty() { "0" } else { whole };
        let fraction = fraction.trim_end_matches('0');
        if fraction.is_empty() {
            whole.to_string()
        } else {
            format!("{whole}.{fraction}")
        }
    }

    proptest! {
        #[test]
        fn to_base_units__round_trips_through_display(
            whole in "[0-9]{1,15}",
            fraction in "[0-9]{0,18}",
        ) {
            let input = if fraction.is_empty() {
                whole.clone()
            } else {
                format!("{whole}.{fraction}")
            };
            let base = to_base_units(&input).unwrap();
            prop_assert_eq!(from_base_units(base), canonical(&whole, &fraction));
        }
    }
}
