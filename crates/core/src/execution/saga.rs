//! Saga coordination across the processor and the ledger.
//!
//! Processor calls always precede the ledger commit. When the commit fails,
//! completed charges are refunded; refunds and captures cannot be undone and
//! are reported as irrecoverable.

use tessera_shared::types::{TenantId, TransactionId};

use super::error::ExecutionError;
use super::traits::{CaptureRequest, ChargeRequest, LedgerStore, PaymentProcessor, RefundRequest};
use crate::plan::{PlanStep, ProcessorAction, ProcessorReceipt, TransactionPlan};
use crate::transaction::Transaction;

/// Reason recorded on compensating refunds.
pub const ROLLBACK_REASON: &str = "ledger_commit_failed";

/// Idempotency key of a processor step.
///
/// Replan attempts get their own keys so that a charge refunded during
/// compensation is not replayed from the processor's idempotency cache.
#[must_use]
pub fn idempotency_key(transaction_id: &TransactionId, step_index: usize, attempt: u32) -> String {
    if attempt == 0 {
        format!("{transaction_id}-{step_index}")
    } else {
        format!("{transaction_id}-{step_index}-{attempt}")
    }
}

/// A processor call that succeeded.
struct Completed {
    transaction_id: TransactionId,
    step_index: usize,
    idempotency_key: String,
    action: ProcessorAction,
    receipt: ProcessorReceipt,
}

/// Executes processor steps, then commits the ledger; compensates on failure.
///
/// Receipts are written back into the plans so the committed transaction
/// records the processor ids.
///
/// # Errors
///
/// Returns the processor or storage error that aborted the saga, or
/// `Irrecoverable` when compensation could not restore the processor side.
pub async fn execute(
    store: &dyn LedgerStore,
    processor: &dyn PaymentProcessor,
    tenant_id: &TenantId,
    plans: &mut [TransactionPlan],
    attempt: u32,
) -> Result<Vec<Transaction>, ExecutionError> {
    let mut completed: Vec<Completed> = Vec::new();

    for plan in plans.iter_mut() {
        let transaction_id = plan.id.clone();
        let currency = plan.currency.clone();

        for (step_index, step) in plan.steps.iter_mut().enumerate() {
            let PlanStep::Processor(step) = step else {
                continue;
            };
            let key = idempotency_key(&transaction_id, step_index, attempt);
            step.idempotency_key = Some(key.clone());

            let result = match &step.action {
                ProcessorAction::Charge {
                    source,
                    amount,
                    capture,
                } => {
                    processor
                        .charge(&ChargeRequest {
                            source: source.clone(),
                            amount: *amount,
                            currency: currency.clone(),
                            capture: *capture,
                            idempotency_key: key.clone(),
                        })
                        .await
                }
                ProcessorAction::Refund {
                    charge_id,
                    amount,
                    reason,
                } => {
                    processor
                        .refund(&RefundRequest {
                            charge_id: charge_id.clone(),
                            amount: *amount,
                            reason: reason.clone(),
                            idempotency_key: key.clone(),
                        })
                        .await
                }
                ProcessorAction::Capture { charge_id, amount } => {
                    processor
                        .capture(&CaptureRequest {
                            charge_id: charge_id.clone(),
                            amount: *amount,
                            idempotency_key: key.clone(),
                        })
                        .await
                }
            };

            match result {
                Ok(receipt) => {
                    tracing::info!(
                        transaction_id = %transaction_id,
                        step_index,
                        kind = step.action.kind(),
                        charge_id = %receipt.charge_id,
                        "processor step completed"
                    );
                    step.receipt = Some(receipt.clone());
                    completed.push(Completed {
                        transaction_id: transaction_id.clone(),
                        step_index,
                        idempotency_key: key,
                        action: step.action.clone(),
                        receipt,
                    });
                }
                Err(err) => {
                    tracing::warn!(
                        transaction_id = %transaction_id,
                        step_index,
                        error = %err,
                        "processor step failed, compensating"
                    );
                    compensate(processor, &transaction_id, &completed).await?;
                    return Err(err.into());
                }
            }
        }
    }

    match store.commit(tenant_id, plans).await {
        Ok(transactions) => Ok(transactions),
        Err(err) => {
            let transaction_id = plans
                .first()
                .map(|p| p.id.clone())
                .ok_or_else(|| ExecutionError::InvariantViolation("saga without plans".into()))?;
            tracing::warn!(
                transaction_id = %transaction_id,
                error = %err,
                "ledger commit failed after processor steps, compensating"
            );
            compensate(processor, &transaction_id, &completed).await?;
            Err(err)
        }
    }
}

/// Refunds every completed charge, newest first.
///
/// Completed refunds and captures stay in place; they and any failed refund
/// are reported through `Irrecoverable`.
async fn compensate(
    processor: &dyn PaymentProcessor,
    transaction_id: &TransactionId,
    completed: &[Completed],
) -> Result<(), ExecutionError> {
    let mut unresolved = Vec::new();

    for call in completed.iter().rev() {
        match &call.action {
            ProcessorAction::Charge { amount, .. } => {
                let request = RefundRequest {
                    charge_id: call.receipt.charge_id.clone(),
                    amount: *amount,
                    reason: ROLLBACK_REASON.to_string(),
                    idempotency_key: format!("{}-rollback", call.idempotency_key),
                };
                match processor.refund(&request).await {
                    Ok(refund) => tracing::info!(
                        transaction_id = %call.transaction_id,
                        step_index = call.step_index,
                        charge_id = %call.receipt.charge_id,
                        refund_id = %refund.id,
                        "charge refunded"
                    ),
                    Err(err) => {
                        tracing::error!(
                            transaction_id = %call.transaction_id,
                            step_index = call.step_index,
                            charge_id = %call.receipt.charge_id,
                            error = %err,
                            "compensating refund failed"
                        );
                        unresolved.push(call.receipt.charge_id.clone());
                    }
                }
            }
            ProcessorAction::Refund { .. } | ProcessorAction::Capture { .. } => {
                tracing::error!(
                    transaction_id = %call.transaction_id,
                    step_index = call.step_index,
                    charge_id = %call.receipt.charge_id,
                    object_id = %call.receipt.id,
                    kind = call.action.kind(),
                    "processor step cannot be undone"
                );
                unresolved.push(call.receipt.id.clone());
            }
        }
    }

    if unresolved.is_empty() {
        return Ok(());
    }

    Err(ExecutionError::Irrecoverable {
        transaction_id: transaction_id.clone(),
        reason: "processor effects could not be rolled back".into(),
        unresolved,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idempotency_keys() {
        let id = TransactionId::parse("checkout-1").unwrap();
        assert_eq!(idempotency_key(&id, 2, 0), "checkout-1-2");
        assert_eq!(idempotency_key(&id, 2, 3), "checkout-1-2-3");
    }
}
