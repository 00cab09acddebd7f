//! Seams to storage and to the payment processor.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tessera_shared::types::{Cents, TenantId};

use super::error::{ExecutionError, ProcessorError};
use crate::plan::{ProcessorReceipt, TransactionPlan};
use crate::transaction::Transaction;

/// Durable storage of the ledger.
///
/// `commit` applies every plan inside one storage transaction: either all
/// plans are committed or none is.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Commits plans and returns the realized transactions.
    ///
    /// Implementations report:
    /// - `TransactionExists` on a duplicate transaction id
    /// - `AlreadyChained` when the predecessor already has a successor
    /// - `Conflict` when a guarded update matches no row
    /// - `InvariantViolation` when it matches more than one
    async fn commit(
        &self,
        tenant_id: &TenantId,
        plans: &[TransactionPlan],
    ) -> Result<Vec<Transaction>, ExecutionError>;
}

/// Charge request sent to the processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeRequest {
    /// Tokenized payment source.
    pub source: String,
    /// Amount in cents.
    pub amount: Cents,
    /// Currency.
    pub currency: String,
    /// Capture immediately.
    pub capture: bool,
    /// Idempotency key.
    pub idempotency_key: String,
}

/// Refund request sent to the processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundRequest {
    /// Charge to refund.
    pub charge_id: String,
    /// Amount in cents.
    pub amount: Cents,
    /// Reason recorded on the refund.
    pub reason: String,
    /// Idempotency key.
    pub idempotency_key: String,
}

/// Capture request sent to the processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRequest {
    /// Charge to capture.
    pub charge_id: String,
    /// Amount in cents.
    pub amount: Cents,
    /// Idempotency key.
    pub idempotency_key: String,
}

/// External card processor.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Creates a charge.
    async fn charge(&self, request: &ChargeRequest) -> Result<ProcessorReceipt, ProcessorError>;

    /// Refunds a charge (or releases an uncaptured one).
    async fn refund(&self, request: &RefundRequest) -> Result<ProcessorReceipt, ProcessorError>;

    /// Captures an authorized charge.
    async fn capture(&self, request: &CaptureRequest) -> Result<ProcessorReceipt, ProcessorError>;
}
