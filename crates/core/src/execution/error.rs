//! Execution error types.

use tessera_shared::types::{ContactId, TransactionId, ValueId};
use thiserror::Error;

use crate::plan::PlanError;

/// Errors reported by the payment processor, classified by how callers react.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessorError {
    /// The card was declined.
    #[error("Card declined: {message}")]
    CardDeclined {
        /// Processor message.
        message: String,
        /// Processor decline code.
        decline_code: Option<String>,
    },

    /// The processor rejected the request.
    #[error("Invalid processor request: {message}")]
    InvalidRequest {
        /// Processor message.
        message: String,
    },

    /// Too many requests.
    #[error("Processor rate limit exceeded: {message}")]
    RateLimited {
        /// Processor message.
        message: String,
    },

    /// Any other failure, including network errors.
    #[error("Processor error: {message}")]
    Other {
        /// Processor or transport message.
        message: String,
    },
}

impl ProcessorError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::CardDeclined { .. } => "PROCESSOR_CARD_DECLINED",
            Self::InvalidRequest { .. } => "PROCESSOR_INVALID_REQUEST",
            Self::RateLimited { .. } => "PROCESSOR_RATE_LIMITED",
            Self::Other { .. } => "PROCESSOR_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::CardDeclined { .. } => 402,
            Self::InvalidRequest { .. } => 400,
            Self::RateLimited { .. } => 429,
            Self::Other { .. } => 502,
        }
    }
}

/// Errors that can occur while executing plans.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecutionError {
    // ========== Validation Errors ==========
    /// The plan was rejected before any write.
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// A processor step was planned but no processor is configured.
    #[error("No payment processor is configured")]
    ProcessorNotConfigured,

    // ========== Conflict Errors ==========
    /// A transaction with this id already exists.
    #[error("Transaction {0} already exists")]
    TransactionExists(TransactionId),

    /// Another value of the tenant already uses this code.
    #[error("A value with code {0} already exists")]
    DuplicateCode(String),

    /// The contact already claimed this generic code.
    #[error("Generic code {value_id} has already been attached to contact {contact_id}")]
    AlreadyClaimed {
        /// Generic code.
        value_id: ValueId,
        /// Claimant.
        contact_id: ContactId,
    },

    /// The predecessor gained a successor concurrently.
    #[error("Transaction {0} has already been captured, voided or reversed")]
    AlreadyChained(TransactionId),

    /// A guarded update matched no row: the snapshot was stale.
    #[error("Conflict on value {value_id}: {reason}")]
    Conflict {
        /// Value whose guard failed.
        value_id: ValueId,
        /// What the guard checked.
        reason: String,
    },

    /// The planner gave up after repeated conflicts.
    #[error("Transaction could not be committed after {attempts} attempts")]
    ReplanLimitExceeded {
        /// Attempts made.
        attempts: u32,
    },

    // ========== Fatal Errors ==========
    /// A guarded update matched more than one row.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// The processor failed.
    #[error(transparent)]
    Processor(#[from] ProcessorError),

    /// Processor effects could not be compensated.
    #[error("Transaction {transaction_id} completed with irregularities: {reason}")]
    Irrecoverable {
        /// Transaction being executed.
        transaction_id: TransactionId,
        /// What went wrong.
        reason: String,
        /// Processor objects left in place (charge or refund ids).
        unresolved: Vec<String>,
    },

    /// Storage failure.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl ExecutionError {
    /// Returns true when replanning against a fresh snapshot may succeed.
    #[must_use]
    pub fn is_replanable(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Plan(e) => e.error_code(),
            Self::ProcessorNotConfigured => "PROCESSOR_NOT_CONFIGURED",
            Self::TransactionExists(_) => "TRANSACTION_EXISTS",
            Self::DuplicateCode(_) => "VALUE_CODE_EXISTS",
            Self::AlreadyClaimed { .. } => "ALREADY_CLAIMED",
            Self::AlreadyChained(_) => "TRANSACTION_ALREADY_CHAINED",
            Self::Conflict { .. } => "CONFLICT",
            Self::ReplanLimitExceeded { .. } => "REPLAN_LIMIT_EXCEEDED",
            Self::InvariantViolation(_) => "INVARIANT_VIOLATION",
            Self::Processor(e) => e.error_code(),
            Self::Irrecoverable { .. } => "COMPLETED_WITH_IRREGULARITIES",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::Plan(e) => e.http_status_code(),
            Self::ProcessorNotConfigured => 422,
            Self::TransactionExists(_)
            | Self::DuplicateCode(_)
            | Self::AlreadyClaimed { .. }
            | Self::AlreadyChained(_)
            | Self::Conflict { .. }
            | Self::ReplanLimitExceeded { .. } => 409,
            Self::Processor(e) => e.http_status_code(),
            Self::Irrecoverable { .. } => 207,
            Self::InvariantViolation(_) | Self::Storage(_) => 500,
        }
    }
}
