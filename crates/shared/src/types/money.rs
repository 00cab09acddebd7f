//! Integer-cents amounts and deterministic rounding.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Balances are stored as whole cents (`i64`); every fractional intermediate
//! (tax, rule output, marketplace shares) is a `rust_decimal::Decimal` that is
//! rounded back to cents with one of the modes below.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// An amount in the smallest currency unit (e.g., cents).
pub type Cents = i64;

/// Rounding mode used by tax and marketplace calculations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundingMode {
    /// Round half to even (banker's rounding).
    #[default]
    HalfEven,
    /// Round half away from zero.
    HalfUp,
}

impl RoundingMode {
    const fn strategy(self) -> RoundingStrategy {
        match self {
            Self::HalfEven => RoundingStrategy::MidpointNearestEven,
            Self::HalfUp => RoundingStrategy::MidpointAwayFromZero,
        }
    }
}

impl std::fmt::Display for RoundingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HalfEven => write!(f, "HALF_EVEN"),
            Self::HalfUp => write!(f, "HALF_UP"),
        }
    }
}

impl std::str::FromStr for RoundingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "HALF_EVEN" => Ok(Self::HalfEven),
            "HALF_UP" => Ok(Self::HalfUp),
            _ => Err(format!("Unknown rounding mode: {s}")),
        }
    }
}

/// Rounds half to even at the given number of decimal places.
#[must_use]
pub fn bankers_rounding(value: Decimal, decimal_places: u32) -> Decimal {
    value.round_dp_with_strategy(decimal_places, RoundingStrategy::MidpointNearestEven)
}

/// Rounds half away from zero at the given number of decimal places.
#[must_use]
pub fn round_half_up(value: Decimal, decimal_places: u32) -> Decimal {
    value.round_dp_with_strategy(decimal_places, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounds a fractional amount of cents to whole cents.
///
/// Values outside the `i64` range saturate.
#[must_use]
pub fn round_to_cents(value: Decimal, mode: RoundingMode) -> Cents {
    let rounded = value.round_dp_with_strategy(0, mode.strategy());
    rounded.to_i64().unwrap_or(if rounded.is_sign_negative() {
        i64::MIN
    } else {
        i64::MAX
    })
}
