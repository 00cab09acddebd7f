//! Runtime values produced by rule evaluation.

use std::str::FromStr;

use rust_decimal::Decimal;

/// A value produced while evaluating a rule.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleValue {
    /// Result of reading a field that does not exist in the context.
    Undefined,
    /// A decimal number.
    Number(Decimal),
    /// A boolean.
    Bool(bool),
    /// A string.
    Str(String),
}

impl RuleValue {
    /// Coerces the value to a number. `Undefined` and unparsable strings are 0.
    #[must_use]
    pub fn to_number(&self) -> Decimal {
        match self {
            Self::Number(n) => *n,
            Self::Bool(true) => Decimal::ONE,
            Self::Bool(false) | Self::Undefined => Decimal::ZERO,
            Self::Str(s) => Decimal::from_str(s.trim()).unwrap_or(Decimal::ZERO),
        }
    }

    /// Coerces the value to a boolean. `Undefined` is false.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Number(n) => !n.is_zero(),
            Self::Bool(b) => *b,
            Self::Str(s) => !s.is_empty(),
            Self::Undefined => false,
        }
    }

    /// Returns true for the undefined sentinel.
    #[must_use]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Strict equality: values of different kinds are never equal.
    #[must_use]
    pub fn strict_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Undefined, Self::Undefined) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for RuleValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Undefined => f.write_str("undefined"),
            Self::Number(n) => write!(f, "{}", n.normalize()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<Decimal> for RuleValue {
    fn from(n: Decimal) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for RuleValue {
    fn from(n: i64) -> Self {
        Self::Number(Decimal::from(n))
    }
}

impl From<bool> for RuleValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for RuleValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl<T: Into<RuleValue>> From<Option<T>> for RuleValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Undefined, Into::into)
    }
}
