//! Credit, debit and transfer planners.
//!
//! Fixed signed deltas against one or two values: no line items, no tax.

use tessera_shared::types::Cents;

use super::context::PlanContext;
use super::error::PlanError;
use super::request::{CreditRequest, DebitRequest, TransferRequest, TransferSource};
use super::types::{
    LedgerPlanStep, PlanStep, ProcessorAction, ProcessorPlanStep, TransactionPlan,
    TransactionTotals, TransactionType,
};
use crate::value::Value;

/// Checks that a value can be transacted against in `currency`.
///
/// # Errors
///
/// Returns the matching state error.
pub fn ensure_usable(value: &Value, currency: &str, ctx: &PlanContext<'_>) -> Result<(), PlanError> {
    if value.currency != currency {
        return Err(PlanError::CurrencyMismatch {
            value_id: value.id.clone(),
            expected: currency.to_string(),
            actual: value.currency.clone(),
        });
    }
    if value.canceled {
        return Err(PlanError::ValueCanceled(value.id.clone()));
    }
    if value.frozen {
        return Err(PlanError::ValueFrozen(value.id.clone()));
    }
    if !value.active {
        return Err(PlanError::ValueInactive(value.id.clone()));
    }
    if !value.is_within_validity(ctx.now) {
        return Err(PlanError::ValueNotValidNow(value.id.clone()));
    }
    Ok(())
}

fn validate_deltas(amount: Option<Cents>, uses: Option<i64>, value: &Value) -> Result<(), PlanError> {
    if amount.is_none() && uses.is_none() {
        return Err(PlanError::InvalidRequest("one of amount or uses is required".into()));
    }
    if amount.is_some_and(|a| a <= 0) {
        return Err(PlanError::InvalidRequest("amount must be positive".into()));
    }
    if uses.is_some_and(|u| u <= 0) {
        return Err(PlanError::InvalidRequest("uses must be positive".into()));
    }
    if amount.is_some() && value.balance.is_none() {
        return Err(PlanError::NullBalance(value.id.clone()));
    }
    if uses.is_some() && value.uses_remaining.is_none() {
        return Err(PlanError::NullUsesRemaining(value.id.clone()));
    }
    Ok(())
}

/// Plans a credit.
///
/// # Errors
///
/// Returns `PlanError` for invalid deltas or an unusable value.
pub fn plan_credit(
    request: &CreditRequest,
    value: &Value,
    ctx: &PlanContext<'_>,
) -> Result<TransactionPlan, PlanError> {
    validate_deltas(request.amount, request.uses, value)?;
    ensure_usable(value, &request.currency, ctx)?;

    let mut plan = TransactionPlan::new(
        request.id.clone(),
        TransactionType::Credit,
        request.currency.clone(),
        ctx.now,
        ctx.created_by,
    );
    plan.steps = vec![PlanStep::Ledger(LedgerPlanStep::update(
        value.clone(),
        request.amount.unwrap_or(0),
        request.uses,
    ))];
    plan.metadata.clone_from(&request.metadata);
    Ok(plan)
}

/// Plans a debit.
///
/// Without `allow_remainder` the full amount is planned and the executor
/// rejects it if the balance is short.
///
/// # Errors
///
/// Returns `PlanError` for invalid deltas or an unusable value.
pub fn plan_debit(
    request: &DebitRequest,
    value: &Value,
    ctx: &PlanContext<'_>,
) -> Result<TransactionPlan, PlanError> {
    validate_deltas(request.amount, request.uses, value)?;
    ensure_usable(value, &request.currency, ctx)?;

    let requested = request.amount.unwrap_or(0);
    let taken = take(requested, value.balance, request.allow_remainder);
    let uses = request
        .uses
        .map(|u| -take(u, value.uses_remaining, request.allow_remainder));

    let mut plan = TransactionPlan::new(
        request.id.clone(),
        TransactionType::Debit,
        request.currency.clone(),
        ctx.now,
        ctx.created_by,
    );
    plan.steps = vec![PlanStep::Ledger(LedgerPlanStep::update(value.clone(), -taken, uses))];
    plan.totals = Some(TransactionTotals {
        remainder: requested - taken,
        ..TransactionTotals::default()
    });
    plan.metadata.clone_from(&request.metadata);
    plan.pending = request.pending;
    Ok(plan)
}

/// Plans a transfer from a ledger value or a card charge into a value.
///
/// `source_value` must be given for ledger sources.
///
/// # Errors
///
/// Returns `PlanError` for invalid amounts or unusable values.
pub fn plan_transfer(
    request: &TransferRequest,
    source_value: Option<&Value>,
    destination: &Value,
    ctx: &PlanContext<'_>,
) -> Result<TransactionPlan, PlanError> {
    if request.amount <= 0 {
        return Err(PlanError::InvalidRequest("amount must be positive".into()));
    }
    ensure_usable(destination, &request.currency, ctx)?;
    if destination.balance.is_none() {
        return Err(PlanError::NullBalance(destination.id.clone()));
    }

    let (source_step, taken) = match &request.source {
        TransferSource::Ledger { value_id } => {
            let source = source_value
                .filter(|v| &v.id == value_id)
                .ok_or_else(|| PlanError::ValueNotFound(value_id.clone()))?;
            if source.id == destination.id {
                return Err(PlanError::InvalidRequest(
                    "source and destination must differ".into(),
                ));
            }
            ensure_usable(source, &request.currency, ctx)?;
            if source.balance.is_none() {
                return Err(PlanError::NullBalance(source.id.clone()));
            }
            let taken = take(request.amount, source.balance, request.allow_remainder);
            (
                PlanStep::Ledger(LedgerPlanStep::update(source.clone(), -taken, None)),
                taken,
            )
        }
        TransferSource::Processor(processor) => {
            let amount = processor
                .max_amount
                .map_or(request.amount, |max| request.amount.min(max));
            if amount < request.amount && !request.allow_remainder {
                return Err(PlanError::InsufficientBalance {
                    value_id: None,
                    requested: request.amount,
                    available: amount,
                });
            }
            (
                PlanStep::Processor(ProcessorPlanStep::new(ProcessorAction::Charge {
                    source: processor.source.clone(),
                    amount,
                    capture: true,
                })),
                amount,
            )
        }
    };

    let mut plan = TransactionPlan::new(
        request.id.clone(),
        TransactionType::Transfer,
        request.currency.clone(),
        ctx.now,
        ctx.created_by,
    );
    plan.steps = vec![
        source_step,
        PlanStep::Ledger(LedgerPlanStep::update(destination.clone(), taken, None)),
    ];
    plan.totals = Some(TransactionTotals {
        remainder: request.amount - taken,
        ..TransactionTotals::default()
    });
    plan.metadata.clone_from(&request.metadata);
    Ok(plan)
}

/// With `allow_remainder`, takes at most what is available on a non-null
/// dimension.
fn take(requested: i64, available: Option<i64>, allow_remainder: bool) -> i64 {
    match available {
        Some(available) if allow_remainder => requested.min(available.max(0)),
        _ => requested,
    }
}
