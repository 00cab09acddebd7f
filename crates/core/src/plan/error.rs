//! Planning errors.
//!
//! Every planning error is a validation error: it is detected before any
//! write and is never retried.

use tessera_shared::types::{Cents, IdError, TransactionId, ValueId};
use thiserror::Error;

use super::types::TransactionType;
use crate::rules::RuleError;
use crate::value::ValueError;

/// Errors that can occur while planning a transaction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    // ========== Request Errors ==========
    /// The request is malformed.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A checkout source is malformed.
    #[error("Invalid source: {0}")]
    InvalidSource(String),

    /// An identifier is invalid.
    #[error(transparent)]
    InvalidId(#[from] IdError),

    /// Value creation input is invalid.
    #[error(transparent)]
    InvalidValue(#[from] ValueError),

    /// A rule failed to compile.
    #[error(transparent)]
    Rule(#[from] RuleError),

    // ========== Lookup Errors ==========
    /// Value not found.
    #[error("Value not found: {0}")]
    ValueNotFound(ValueId),

    /// No value has the given code.
    #[error("No value found for code")]
    CodeNotFound,

    /// Transaction not found.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    // ========== Value State Errors ==========
    /// Value currency differs from the transaction currency.
    #[error("Value {value_id} is in {actual}, transaction is in {expected}")]
    CurrencyMismatch {
        /// The value.
        value_id: ValueId,
        /// Transaction currency.
        expected: String,
        /// Value currency.
        actual: String,
    },

    /// Value is inactive.
    #[error("Value {0} is inactive")]
    ValueInactive(ValueId),

    /// Value is frozen.
    #[error("Value {0} is frozen")]
    ValueFrozen(ValueId),

    /// Value is canceled.
    #[error("Value {0} is canceled")]
    ValueCanceled(ValueId),

    /// Value is outside its validity window.
    #[error("Value {0} is not valid at this time")]
    ValueNotValidNow(ValueId),

    /// A balance delta against a value without a balance.
    #[error("Value {0} has no balance to change")]
    NullBalance(ValueId),

    /// A uses delta against a value with unlimited uses.
    #[error("Value {0} has unlimited uses")]
    NullUsesRemaining(ValueId),

    /// Not enough balance and no remainder allowed.
    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        /// The value, `None` for the checkout as a whole.
        value_id: Option<ValueId>,
        /// Amount requested.
        requested: Cents,
        /// Amount available.
        available: Cents,
    },

    /// Not enough uses.
    #[error("Insufficient uses on value {value_id}")]
    InsufficientUses {
        /// The value.
        value_id: ValueId,
    },

    // ========== Generic Code Errors ==========
    /// A per-contact generic code used directly in a checkout.
    #[error("Generic code {0} must be attached to a contact before use")]
    GenericCodeMustBeAttached(ValueId),

    /// Attach of a value that is not a per-contact generic code.
    #[error("Value {0} is not an attachable generic code")]
    NotAttachable(ValueId),

    // ========== Chain Errors ==========
    /// Predecessor already has a successor.
    #[error("Transaction {0} has already been captured, voided or reversed")]
    AlreadyChained(TransactionId),

    /// Reverse of a pending transaction.
    #[error("Transaction {0} is pending and must be captured or voided")]
    TransactionPending(TransactionId),

    /// Capture or void of a transaction that is not pending.
    #[error("Transaction {0} is not pending")]
    TransactionNotPending(TransactionId),

    /// The transaction type cannot be chained this way.
    #[error("Cannot {action} a {transaction_type} transaction")]
    InvalidChain {
        /// Chain operation attempted.
        action: TransactionType,
        /// Type of the predecessor.
        transaction_type: TransactionType,
    },

    /// Processor refunds cannot be reversed.
    #[error("Transaction {0} contains a processor refund and cannot be reversed")]
    CannotReverseRefund(TransactionId),
}

impl PlanError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::InvalidSource(_) => "INVALID_SOURCE",
            Self::InvalidId(_) => "INVALID_ID",
            Self::InvalidValue(e) => e.error_code(),
            Self::Rule(e) => e.error_code(),
            Self::ValueNotFound(_) | Self::CodeNotFound => "VALUE_NOT_FOUND",
            Self::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            Self::CurrencyMismatch { .. } => "WRONG_CURRENCY",
            Self::ValueInactive(_) => "VALUE_INACTIVE",
            Self::ValueFrozen(_) => "VALUE_FROZEN",
            Self::ValueCanceled(_) => "VALUE_CANCELED",
            Self::ValueNotValidNow(_) => "VALUE_NOT_VALID_NOW",
            Self::NullBalance(_) => "NULL_BALANCE",
            Self::NullUsesRemaining(_) => "NULL_USES_REMAINING",
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::InsufficientUses { .. } => "INSUFFICIENT_USES",
            Self::GenericCodeMustBeAttached(_) => "GENERIC_CODE_MUST_BE_ATTACHED",
            Self::NotAttachable(_) => "VALUE_NOT_ATTACHABLE",
            Self::AlreadyChained(_) => "TRANSACTION_ALREADY_CHAINED",
            Self::TransactionPending(_) => "TRANSACTION_PENDING",
            Self::TransactionNotPending(_) => "TRANSACTION_NOT_PENDING",
            Self::InvalidChain { .. } => "INVALID_CHAIN",
            Self::CannotReverseRefund(_) => "CANNOT_REVERSE_REFUND",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidRequest(_) | Self::InvalidSource(_) | Self::InvalidId(_) => 400,
            Self::InvalidValue(e) => e.http_status_code(),
            Self::ValueNotFound(_) | Self::CodeNotFound | Self::TransactionNotFound(_) => 404,
            Self::AlreadyChained(_) => 409,
            _ => 422,
        }
    }
}
