//! Decimal payment amounts.
//!
//! A transfer request carries its amount as a plain decimal string in the
//! asset's display units (`"1.5"` SOL, `"10.25"` USDC). [`Amount`] keeps the
//! exact decimal value so that the precision check against the asset's
//! decimals and the conversion to integer base units never go through
//! floating point.
//!
//! # Example
//!
//! ```rust
//! use solana_pay_types::amount::Amount;
//!
//! let amount: Amount = "1.5".parse().unwrap();
//! assert_eq!(amount.decimal_places(), 1);
//! assert_eq!(amount.to_base_units(9).unwrap(), 1_500_000_000);
//! ```

use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::LazyLock;

/// Wire format of an amount: digits with an optional fractional part.
static AMOUNT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(\.\d+)?$").expect("valid amount pattern"));

/// A non-negative decimal amount in display units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(Decimal);

/// Errors that can occur when parsing or converting an [`Amount`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AmountError {
    /// The input is not a plain non-negative decimal.
    #[error("Invalid number format")]
    InvalidFormat,
    /// The value does not fit the target representation.
    #[error("Amount out of range")]
    OutOfRange,
    /// The amount has more decimal places than the asset supports.
    #[error("Too big of a precision: {amount} vs {asset} on asset")]
    WrongPrecision {
        /// Decimal places in the amount.
        amount: u32,
        /// Decimal places supported by the asset.
        asset: u32,
    },
    /// The input has more significant digits than a `Decimal` holds exactly.
    #[error("Amount precision exceeds what can be represented exactly")]
    PrecisionLoss,
}

impl Amount {
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    /// Parses a plain decimal string such as `"10"` or `"0.25"`.
    ///
    /// Signs, exponents, separators and currency symbols are rejected: the
    /// payment URL format only allows digits and a single decimal point.
    ///
    /// The value is kept exactly. Input whose significant digits do not fit a
    /// `Decimal` fails with [`AmountError::PrecisionLoss`] instead of being rounded.
    pub fn parse(input: &str) -> Result<Self, AmountError> {
        if !AMOUNT_PATTERN.is_match(input) {
            return Err(AmountError::InvalidFormat);
        }
        let decimal = Decimal::from_str_exact(trim_fraction_zeros(input)).map_err(|e| match e {
            rust_decimal::Error::Underflow => AmountError::PrecisionLoss,
            _ => AmountError::OutOfRange,
        })?;
        Ok(Amount(decimal))
    }

    /// Builds an amount from integer base units and the asset's decimals.
    pub fn from_base_units(units: u64, decimals: u8) -> Result<Self, AmountError> {
        let decimal = Decimal::try_from_i128_with_scale(i128::from(units), u32::from(decimals))
            .map_err(|_| AmountError::OutOfRange)?;
        Ok(Amount(decimal))
    }

    /// Number of significant decimal places. Trailing zeros do not count.
    pub fn decimal_places(&self) -> u32 {
        self.0.normalize().scale()
    }

    /// Converts to integer base units of an asset with `decimals` decimal places.
    ///
    /// The product is floored, so the result never exceeds the literal amount.
    pub fn to_base_units(&self, decimals: u8) -> Result<u64, AmountError> {
        let places = self.decimal_places();
        let asset = u32::from(decimals);
        if places > asset {
            return Err(AmountError::WrongPrecision {
                amount: places,
                asset,
            });
        }
        let multiplier = 10u64
            .checked_pow(asset)
            .ok_or(AmountError::OutOfRange)?;
        let scaled = self
            .0
            .checked_mul(Decimal::from(multiplier))
            .ok_or(AmountError::OutOfRange)?
            .floor();
        scaled.to_u64().ok_or(AmountError::OutOfRange)
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Difference `self - other`, or `None` when it would be negative.
    pub fn checked_sub(&self, other: &Amount) -> Option<Amount> {
        let diff = self.0.checked_sub(other.0)?;
        if diff.is_sign_negative() && !diff.is_zero() {
            None
        } else {
            Some(Amount(diff))
        }
    }
}

/// Drops insignificant trailing zeros of the fractional part, and the point
/// itself when nothing is left after it.
fn trim_fraction_zeros(input: &str) -> &str {
    match input.split_once('.') {
        Some((whole, fraction)) => {
            let significant = fraction.trim_end_matches('0').len();
            if significant == 0 {
                whole
            } else {
                &input[..whole.len() + 1 + significant]
            }
        }
        None => input,
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Amount::parse(s)
    }
}

impl TryFrom<&str> for Amount {
    type Error = AmountError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Amount::from_str(value)
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Amount(Decimal::from(value))
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Amount::parse(&s).map_err(serde::de::Error::custom)
    }
}
