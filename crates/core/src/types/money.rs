//! Decimal money representation with minor-unit conversion.

use core::fmt;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A monetary amount with its currency.
///
/// Amounts are held in the currency's major unit (dollars, not cents) as a
/// [`Decimal`]. Payment processors take minor units; [`Money::to_minor_units`]
/// does that conversion in exactly one place so callers never pre-convert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the currency's major unit.
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency: CurrencyCode,
}

impl Money {
    /// Create a new amount.
    #[must_use]
    pub const fn new(amount: Decimal, currency: CurrencyCode) -> Self {
        Self { amount, currency }
    }

    /// Zero in the given currency.
    #[must_use]
    pub const fn zero(currency: CurrencyCode) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency,
        }
    }

    /// Build an amount from minor units (e.g. cents).
    #[must_use]
    pub fn from_minor_units(minor: i64, currency: CurrencyCode) -> Self {
        Self {
            amount: Decimal::new(minor, 2),
            currency,
        }
    }

    /// Convert to minor units (e.g. cents), rounding midpoints away from
    /// zero.
    ///
    /// Returns `None` if the scaled amount does not fit in an `i64`.
    #[must_use]
    pub fn to_minor_units(&self) -> Option<i64> {
        (self.amount * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
    }

    /// Format for display (e.g. "$19.99").
    #[must_use]
    pub fn display(&self) -> String {
        format!("{}{:.2}", self.currency.symbol(), self.amount)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency.code())
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CurrencyCode {
    #[default]
    Usd,
    Eur,
    Gbp,
    Cad,
    Aud,
}

impl CurrencyCode {
    /// Display symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Usd | Self::Cad | Self::Aud => "$",
            Self::Eur => "\u{20ac}",
            Self::Gbp => "\u{a3}",
        }
    }

    /// Three-letter uppercase code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
            Self::Cad => "CAD",
            Self::Aud => "AUD",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_to_minor_units_exact() {
        let price = Money::new(Decimal::new(1999, 2), CurrencyCode::Usd);
        assert_eq!(price.to_minor_units(), Some(1999));
    }

    #[test]
    fn test_to_minor_units_rounds_half_up() {
        // 10.005 dollars -> 1000.5 cents -> 1001
        let price = Money::new(Decimal::new(10_005, 3), CurrencyCode::Usd);
        assert_eq!(price.to_minor_units(), Some(1001));

        // 10.004 dollars -> 1000.4 cents -> 1000
        let price = Money::new(Decimal::new(10_004, 3), CurrencyCode::Usd);
        assert_eq!(price.to_minor_units(), Some(1000));
    }

    #[test]
    fn test_from_minor_units() {
        let price = Money::from_minor_units(162_00, CurrencyCode::Usd);
        assert_eq!(price.amount, Decimal::new(162_00, 2));
        assert_eq!(price.display(), "$162.00");
    }

    #[test]
    fn test_currency_serde_lowercase() {
        // Stripe wants lowercase currency codes on the wire
        let json = serde_json::to_string(&CurrencyCode::Usd).unwrap();
        assert_eq!(json, "\"usd\"");
    }

    #[test]
    fn test_display() {
        let price = Money::new(Decimal::new(58_99, 2), CurrencyCode::Usd);
        assert_eq!(price.display(), "$58.99");
        assert_eq!(price.to_string(), "58.99 USD");
    }
}
