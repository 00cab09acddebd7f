//! Value validation errors.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::rules::RuleError;

/// Errors raised when validating a value before creation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueError {
    /// Currency code is missing.
    #[error("Currency is required")]
    CurrencyRequired,

    /// Balance is negative.
    #[error("Balance cannot be negative: {0}")]
    NegativeBalance(i64),

    /// Uses remaining is negative.
    #[error("Uses remaining cannot be negative: {0}")]
    NegativeUsesRemaining(i64),

    /// Both a fixed balance and a balance rule were given.
    #[error("A value cannot have both a balance and a balance rule")]
    BalanceWithBalanceRule,

    /// A rule failed to compile.
    #[error("Invalid {field}: {source}")]
    InvalidRule {
        /// Which rule field failed.
        field: &'static str,
        /// The compilation error.
        source: RuleError,
    },

    /// Seller liability outside [0, 1].
    #[error("Discount seller liability must be between 0 and 1, got {0}")]
    SellerLiabilityOutOfRange(Decimal),

    /// Both the constant and the rule form of seller liability were given.
    #[error("Discount seller liability and discount seller liability rule are mutually exclusive")]
    SellerLiabilityWithRule,

    /// Seller liability on a value that is not a discount.
    #[error("Discount seller liability requires discount to be true")]
    SellerLiabilityRequiresDiscount,

    /// Generic code options on a value that is not a generic code.
    #[error("Generic code options require is_generic_code to be true")]
    GenericCodeOptionsRequireGenericCode,

    /// A per-contact balance on a generic code that uses a balance rule.
    #[error("Per-contact balance cannot be combined with a balance rule")]
    PerContactBalanceWithBalanceRule,

    /// `start_date` is not before `end_date`.
    #[error("Start date must be before end date")]
    InvalidDateRange,
}

impl ValueError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidRule { .. } => "INVALID_RULE",
            Self::SellerLiabilityOutOfRange(_)
            | Self::SellerLiabilityWithRule
            | Self::SellerLiabilityRequiresDiscount => "INVALID_SELLER_LIABILITY",
            Self::InvalidDateRange => "INVALID_DATE_RANGE",
            _ => "INVALID_VALUE",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidRule { .. } => 422,
            _ => 400,
        }
    }
}
