//! Monetary amount validation.
//!
//! # Responsibility
//! - Turn raw request numbers into validated minor-unit amounts.
//! - Keep integer and decimal deployments on one storage representation.
//!
//! # Invariants
//! - Stored amounts are `i64` minor units: `major * AmountMode::scale()`.
//! - A validated amount never exceeds `MAX_AMOUNT_UNITS` major units.
//! - Fractional input is rejected, never truncated.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Upper bound for any single amount and any ledger field, in major units.
pub const MAX_AMOUNT_UNITS: i64 = 99_999_999;

/// Numeric representation used by one deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountMode {
    /// Whole currency units only.
    #[default]
    Integer,
    /// Currency units with two fractional digits.
    Decimal,
}

impl AmountMode {
    /// Number of minor units per major unit.
    pub fn scale(self) -> i64 {
        match self {
            Self::Integer => 1,
            Self::Decimal => 100,
        }
    }

    /// Largest representable value in minor units.
    pub fn max_minor(self) -> i64 {
        MAX_AMOUNT_UNITS * self.scale()
    }

    /// Converts minor units back to a major-unit float for display.
    pub fn to_major(self, minor: i64) -> f64 {
        minor as f64 / self.scale() as f64
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Decimal => "decimal",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "integer" | "int" => Some(Self::Integer),
            "decimal" | "float" => Some(Self::Decimal),
            _ => None,
        }
    }
}

/// Number as it arrives on the wire, before validation.
///
/// JSON numbers are read from their literal text, so `1.0005` keeps all four
/// fractional digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawAmount(#[serde(with = "rust_decimal::serde::arbitrary_precision")] Decimal);

impl RawAmount {
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    pub fn value(self) -> Decimal {
        self.0
    }
}

impl From<i64> for RawAmount {
    fn from(value: i64) -> Self {
        Self(Decimal::from(value))
    }
}

impl From<Decimal> for RawAmount {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl Display for RawAmount {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Amount rejection reasons.
#[derive(Debug, Clone, PartialEq)]
pub enum AmountError {
    /// Value is negative or above the ceiling.
    OutOfRange { value: String },
    /// Value carries more fractional digits than the mode allows.
    NonIntegral { value: String, mode: AmountMode },
}

impl Display for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfRange { value } => write!(
                f,
                "amount {value} is outside the allowed range 0..={MAX_AMOUNT_UNITS}"
            ),
            Self::NonIntegral {
                value,
                mode: AmountMode::Integer,
            } => write!(f, "amount {value} must be a whole number"),
            Self::NonIntegral {
                value,
                mode: AmountMode::Decimal,
            } => write!(f, "amount {value} has more than two fractional digits"),
        }
    }
}

impl Error for AmountError {}

/// Validated amount in minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    /// Validates a raw wire number against `mode`.
    ///
    /// # Errors
    /// - `OutOfRange` for negative or too large values.
    /// - `NonIntegral` for fractions the mode cannot represent.
    pub fn validate(raw: RawAmount, mode: AmountMode) -> Result<Self, AmountError> {
        let value = raw.value();
        let out_of_range = || AmountError::OutOfRange {
            value: raw.to_string(),
        };
        if value < Decimal::ZERO || value > Decimal::from(MAX_AMOUNT_UNITS) {
            return Err(out_of_range());
        }
        let scaled = value
            .checked_mul(Decimal::from(mode.scale()))
            .ok_or_else(out_of_range)?;
        if !scaled.fract().is_zero() {
            return Err(AmountError::NonIntegral {
                value: raw.to_string(),
                mode,
            });
        }
        scaled.to_i64().map(Self).ok_or_else(out_of_range)
    }

    /// Wraps an already-scaled minor-unit value read back from storage.
    pub fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    pub fn minor(self) -> i64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}
