//! Value object trait and the `Money` value object.
//!
//! Value objects have **no identity**: two instances with the same attribute
//! values are equal. They are immutable; to "modify" one, build a new one.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Marker trait for value objects.
///
/// The trait requires:
/// - **Clone**: value objects are cheap to copy
/// - **PartialEq**: value objects are compared by their attribute values
/// - **Debug**: value objects should be debuggable
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

/// Currency unit for catalog prices.
///
/// The catalog is single-currency; formatting happens only at presentation time.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
        }
    }
}

/// A monetary amount in minor units (cents) plus a fixed currency.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    pub amount_cents: u64,
    #[serde(default)]
    pub currency: Currency,
}

impl ValueObject for Money {}

impl Money {
    pub fn usd_cents(amount_cents: u64) -> Self {
        Self {
            amount_cents,
            currency: Currency::Usd,
        }
    }

    /// Parse a legacy price string such as `"12.34 $"`, `"$12.34"` or `"12"`.
    ///
    /// Used once at the import boundary; at most two fractional digits.
    pub fn parse_legacy(raw: &str) -> DomainResult<Self> {
        let cleaned: String = raw
            .trim()
            .trim_start_matches('$')
            .trim_end_matches('$')
            .trim()
            .trim_end_matches("USD")
            .trim()
            .chars()
            .filter(|c| *c != ',')
            .collect();

        if cleaned.is_empty() {
            return Err(DomainError::validation("price cannot be empty"));
        }

        let (whole, frac) = match cleaned.split_once('.') {
            Some((w, f)) => (w, f),
            None => (cleaned.as_str(), ""),
        };

        if whole.is_empty() && frac.is_empty() {
            return Err(DomainError::validation(format!("invalid price: {raw:?}")));
        }
        if frac.len() > 2 {
            return Err(DomainError::validation(format!(
                "price has more than two decimal places: {raw:?}"
            )));
        }
        let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
        if !all_digits(whole) || !all_digits(frac) {
            return Err(DomainError::validation(format!("invalid price: {raw:?}")));
        }

        let whole: u64 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|_| DomainError::validation(format!("price out of range: {raw:?}")))?
        };
        let frac: u64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<u64>().unwrap_or(0) * 10,
            _ => frac.parse::<u64>().unwrap_or(0),
        };

        let amount_cents = whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(frac))
            .ok_or_else(|| DomainError::validation(format!("price out of range: {raw:?}")))?;

        Ok(Self::usd_cents(amount_cents))
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{}.{:02} {}",
            self.amount_cents / 100,
            self.amount_cents % 100,
            self.currency.code()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_legacy_suffix_form() {
        assert_eq!(Money::parse_legacy("12.34 $").unwrap(), Money::usd_cents(1234));
        assert_eq!(Money::parse_legacy("$12.5").unwrap(), Money::usd_cents(1250));
        assert_eq!(Money::parse_legacy("7").unwrap(), Money::usd_cents(700));
        assert_eq!(Money::parse_legacy("1,299.00 USD").unwrap(), Money::usd_cents(129_900));
    }

    #[test]
    fn rejects_malformed_prices() {
        for raw in ["", "$", "abc", "1.234", "12.3.4", "-5"] {
            assert!(
                matches!(Money::parse_legacy(raw), Err(DomainError::Validation(_))),
                "expected {raw:?} to be rejected"
            );
        }
    }

    #[test]
    fn display_formats_minor_units() {
        assert_eq!(Money::usd_cents(1205).to_string(), "12.05 USD");
        assert_eq!(Money::usd_cents(0).to_string(), "0.00 USD");
    }

    proptest! {
        /// Property: formatting then parsing yields the same amount.
        #[test]
        fn display_output_parses_back(cents in 0u64..10_000_000u64) {
            let money = Money::usd_cents(cents);
            prop_assert_eq!(Money::parse_legacy(&money.to_string()).unwrap(), money);
        }
    }
}
