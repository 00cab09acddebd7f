//! Capture, void and reverse planners.
//!
//! Chain plans link to their predecessor through `previous_transaction_id`;
//! the storage layer sets the predecessor's `next_transaction_id` exactly once.

use tessera_shared::types::Cents;

use super::context::PlanContext;
use super::error::PlanError;
use super::request::ChainRequest;
use super::types::{
    InternalPlanStep, LedgerPlanStep, PlanStep, ProcessorAction, ProcessorPlanStep,
    TransactionPlan, TransactionType,
};
use crate::transaction::{Transaction, TransactionStep};
use crate::value::Value;

const REVERSE_REASON: &str = "reversed";
const VOID_REASON: &str = "voided";

/// Plans the reversal of a completed transaction.
///
/// Reversing a capture undoes the effects of the captured root, so `root`
/// must be given in that case.
///
/// # Errors
///
/// Returns `PlanError` when the predecessor cannot be reversed.
pub fn plan_reverse(
    request: &ChainRequest,
    previous: &Transaction,
    root: Option<&Transaction>,
    values: &[Value],
    ctx: &PlanContext<'_>,
) -> Result<TransactionPlan, PlanError> {
    ensure_unchained(previous)?;
    if previous.pending {
        return Err(PlanError::TransactionPending(previous.id.clone()));
    }
    if matches!(
        previous.transaction_type,
        TransactionType::Reverse | TransactionType::Void
    ) {
        return Err(PlanError::InvalidChain {
            action: TransactionType::Reverse,
            transaction_type: previous.transaction_type,
        });
    }

    let effects = if previous.transaction_type == TransactionType::Capture {
        root.filter(|r| r.id == previous.root_transaction_id)
            .ok_or_else(|| PlanError::TransactionNotFound(previous.root_transaction_id.clone()))?
    } else {
        previous
    };

    let steps = invert_steps(effects, values, REVERSE_REASON)?;
    Ok(chained_plan(request, previous, TransactionType::Reverse, steps, ctx))
}

/// Plans the void of a pending transaction.
///
/// # Errors
///
/// Returns `PlanError` when the predecessor is not pending or already chained.
pub fn plan_void(
    request: &ChainRequest,
    previous: &Transaction,
    values: &[Value],
    ctx: &PlanContext<'_>,
) -> Result<TransactionPlan, PlanError> {
    ensure_unchained(previous)?;
    if !previous.pending {
        return Err(PlanError::TransactionNotPending(previous.id.clone()));
    }

    let steps = invert_steps(previous, values, VOID_REASON)?;
    Ok(chained_plan(request, previous, TransactionType::Void, steps, ctx))
}

/// Plans the capture of a pending transaction. Only processor charges move;
/// the ledger effects were applied when the transaction was created.
///
/// # Errors
///
/// Returns `PlanError` when the predecessor is not pending or already chained.
pub fn plan_capture(
    request: &ChainRequest,
    previous: &Transaction,
    ctx: &PlanContext<'_>,
) -> Result<TransactionPlan, PlanError> {
    ensure_unchained(previous)?;
    if !previous.pending {
        return Err(PlanError::TransactionNotPending(previous.id.clone()));
    }

    let mut steps = Vec::new();
    for step in &previous.steps {
        if let TransactionStep::Processor(processor) = step {
            if let ProcessorAction::Charge { amount, .. } = &processor.action {
                steps.push(PlanStep::Processor(ProcessorPlanStep::new(ProcessorAction::Capture {
                    charge_id: charge_id(previous, processor.charge_id.as_deref())?,
                    amount: *amount,
                })));
            }
        }
    }

    Ok(chained_plan(request, previous, TransactionType::Capture, steps, ctx))
}

fn ensure_unchained(previous: &Transaction) -> Result<(), PlanError> {
    if previous.next_transaction_id.is_some() {
        return Err(PlanError::AlreadyChained(previous.id.clone()));
    }
    Ok(())
}

fn charge_id(previous: &Transaction, charge_id: Option<&str>) -> Result<String, PlanError> {
    charge_id.map(ToString::to_string).ok_or_else(|| {
        PlanError::InvalidRequest(format!(
            "processor step of transaction {} has no charge id",
            previous.id
        ))
    })
}

/// Negates every effect of `effects`. Ledger inversions may touch frozen and
/// canceled values.
fn invert_steps(
    effects: &Transaction,
    values: &[Value],
    reason: &str,
) -> Result<Vec<PlanStep>, PlanError> {
    let mut steps = Vec::with_capacity(effects.steps.len());

    for step in &effects.steps {
        match step {
            TransactionStep::Ledger(ledger) => {
                let amount: Cents = ledger.balance_change.map_or(0, |c| -c);
                let uses = ledger.uses_remaining_change.map(|c| -c);
                if amount == 0 && uses.unwrap_or(0) == 0 {
                    continue;
                }
                let value = values
                    .iter()
                    .find(|v| v.id == ledger.value_id)
                    .ok_or_else(|| PlanError::ValueNotFound(ledger.value_id.clone()))?;
                steps.push(PlanStep::Ledger(LedgerPlanStep {
                    allow_frozen: true,
                    allow_canceled: true,
                    ..LedgerPlanStep::update(value.clone(), amount, uses)
                }));
            }
            TransactionStep::Internal(internal) => {
                steps.push(PlanStep::Internal(InternalPlanStep {
                    internal_id: internal.internal_id.clone(),
                    balance: internal.balance_after,
                    amount: -internal.balance_change,
                    pretax: false,
                    before_ledger: false,
                }));
            }
            TransactionStep::Processor(processor) => match &processor.action {
                ProcessorAction::Charge { amount, .. } => {
                    steps.push(PlanStep::Processor(ProcessorPlanStep::new(ProcessorAction::Refund {
                        charge_id: charge_id(effects, processor.charge_id.as_deref())?,
                        amount: *amount,
                        reason: reason.to_string(),
                    })));
                }
                ProcessorAction::Refund { .. } => {
                    return Err(PlanError::CannotReverseRefund(effects.id.clone()));
                }
                ProcessorAction::Capture { .. } => {}
            },
        }
    }

    Ok(steps)
}

fn chained_plan(
    request: &ChainRequest,
    previous: &Transaction,
    transaction_type: TransactionType,
    steps: Vec<PlanStep>,
    ctx: &PlanContext<'_>,
) -> TransactionPlan {
    let mut plan = TransactionPlan::new(
        request.id.clone(),
        transaction_type,
        previous.currency.clone(),
        ctx.now,
        ctx.created_by,
    );
    plan.steps = steps;
    plan.metadata.clone_from(&request.metadata);
    plan.previous_transaction_id = Some(previous.id.clone());
    plan.root_transaction_id = previous.root_transaction_id.clone();
    plan
}
