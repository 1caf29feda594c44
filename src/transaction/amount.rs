//! Fixed-point currency amounts.

use std::{fmt::Display, str::FromStr};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::validation::ValidationError;

/// The number of fractional digits used for all currency values.
pub const CURRENCY_SCALE: u32 = 2;

/// The largest amount a single transaction may record.
const MAX_AMOUNT: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// The magnitude of money moved by a transaction.
///
/// Always strictly positive with at most two fractional digits. The sign of a
/// transaction comes from its [TransactionType](super::TransactionType), never
/// from the amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    /// Create an amount from a decimal.
    ///
    /// # Errors
    ///
    /// Returns a [ValidationError] for the field `amount` if `value` is zero,
    /// negative, larger than one billion or has more than two fractional digits.
    pub fn new(value: Decimal) -> Result<Self, ValidationError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(ValidationError::new("amount", "must not be negative"));
        }

        if value.is_zero() {
            return Err(ValidationError::new("amount", "must be greater than zero"));
        }

        if value.normalize().scale() > CURRENCY_SCALE {
            return Err(ValidationError::new(
                "amount",
                "must have at most two decimal places",
            ));
        }

        if value > MAX_AMOUNT {
            return Err(ValidationError::new(
                "amount",
                format!("must be at most {MAX_AMOUNT}"),
            ));
        }

        let mut value = value;
        value.rescale(CURRENCY_SCALE);

        Ok(Self(value))
    }

    /// Create an amount from a whole number of cents.
    ///
    /// The caller should ensure that `cents` is positive.
    pub fn from_cents_unchecked(cents: i64) -> Self {
        Self(Decimal::new(cents, CURRENCY_SCALE))
    }

    /// The amount as a whole number of cents.
    pub fn cents(&self) -> i64 {
        let mut value = self.0;
        value.rescale(CURRENCY_SCALE);
        // Bounded by MAX_AMOUNT, so the cents always fit in an i64.
        value.mantissa() as i64
    }

    /// The amount as a decimal.
    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl FromStr for Amount {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return Err(ValidationError::new("amount", "must not be empty"));
        }

        let not_a_number =
            || ValidationError::new("amount", format!("\"{trimmed}\" is not a number"));

        // An optional sign, then digits with at most one decimal point.
        let unsigned = trimmed.strip_prefix(['+', '-']).unwrap_or(trimmed);
        let is_plain_decimal = unsigned.chars().any(|c| c.is_ascii_digit())
            && unsigned.chars().all(|c| c.is_ascii_digit() || c == '.')
            && unsigned.matches('.').count() <= 1;

        if !is_plain_decimal {
            return Err(not_a_number());
        }

        let value = Decimal::from_str(trimmed).map_err(|_| not_a_number())?;

        Amount::new(value)
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = ValidationError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Amount::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(value: Amount) -> Self {
        value.0
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Round a computed currency value to two decimal places for output.
///
/// Midpoints are rounded away from zero and the result always carries exactly
/// two fractional digits, e.g. `7` becomes `7.00`.
pub fn round_currency(value: Decimal) -> Decimal {
    let mut rounded =
        value.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(CURRENCY_SCALE);
    rounded
}
