//! Transaction record types.
//!
//! A transaction is immutable once committed. Its steps record the balances
//! read back at commit time, not the planned deltas.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tessera_shared::types::{Cents, ContactId, TenantId, TransactionId, ValueId};

use crate::plan::types::{
    InternalPlanStep, LedgerAction, LedgerPlanStep, LineItem, PlanStep, ProcessorAction,
    ProcessorPlanStep, TransactionPlan, TransactionTotals, TransactionType,
};
use crate::value::Value;

/// Realized effect on a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerTransactionStep {
    /// Value changed.
    pub value_id: ValueId,
    /// Owner of the value.
    pub contact_id: Option<ContactId>,
    /// Code of the value.
    pub code: Option<String>,
    /// Balance before the step.
    pub balance_before: Option<Cents>,
    /// Balance after the step.
    pub balance_after: Option<Cents>,
    /// Balance delta.
    pub balance_change: Option<Cents>,
    /// Uses before the step.
    pub uses_remaining_before: Option<i64>,
    /// Uses after the step.
    pub uses_remaining_after: Option<i64>,
    /// Uses delta.
    pub uses_remaining_change: Option<i64>,
}

impl LedgerTransactionStep {
    /// Builds the step from the row read back after the write.
    #[must_use]
    pub fn realized(step: &LedgerPlanStep, after: &Value) -> Self {
        let (balance_before, balance_change) = realized_dimension(
            step.action,
            after.balance,
            step.amount,
        );
        let (uses_before, uses_change) = realized_dimension(
            step.action,
            after.uses_remaining,
            step.uses.unwrap_or(0),
        );

        Self {
            value_id: after.id.clone(),
            contact_id: after.contact_id.clone(),
            code: after.code.clone(),
            balance_before,
            balance_after: after.balance,
            balance_change,
            uses_remaining_before: uses_before,
            uses_remaining_after: after.uses_remaining,
            uses_remaining_change: uses_change,
        }
    }

    /// Projects the step from the planning snapshot (simulation).
    #[must_use]
    pub fn projected(step: &LedgerPlanStep) -> Self {
        let mut after = step.value.clone();
        after.balance = step.balance_after();
        after.uses_remaining = step.uses_after();
        Self::realized(step, &after)
    }
}

/// Returns `(before, change)` for one dimension; both `None` when the
/// dimension is null.
fn realized_dimension(action: LedgerAction, after: Option<i64>, delta: i64) -> (Option<i64>, Option<i64>) {
    match (action, after) {
        (_, None) => (None, None),
        (LedgerAction::Insert, Some(after)) => (Some(0), Some(after)),
        (LedgerAction::Update, Some(after)) => (Some(after - delta), Some(delta)),
    }
}

/// Realized processor operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorTransactionStep {
    /// Operation performed.
    pub action: ProcessorAction,
    /// Signed amount (charges negative).
    pub amount: Cents,
    /// Idempotency key used.
    pub idempotency_key: Option<String>,
    /// Charge the operation belongs to.
    pub charge_id: Option<String>,
    /// Object created (charge, refund).
    pub object_id: Option<String>,
}

impl From<&ProcessorPlanStep> for ProcessorTransactionStep {
    fn from(step: &ProcessorPlanStep) -> Self {
        Self {
            action: step.action.clone(),
            amount: step.action.signed_amount(),
            idempotency_key: step.idempotency_key.clone(),
            charge_id: step.receipt.as_ref().map(|r| r.charge_id.clone()),
            object_id: step.receipt.as_ref().map(|r| r.id.clone()),
        }
    }
}

/// Realized internal adjustment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalTransactionStep {
    /// Caller-defined id.
    pub internal_id: String,
    /// Declared balance before the step.
    pub balance_before: Cents,
    /// Balance after the step.
    pub balance_after: Cents,
    /// Signed delta.
    pub balance_change: Cents,
}

impl From<&InternalPlanStep> for InternalTransactionStep {
    fn from(step: &InternalPlanStep) -> Self {
        Self {
            internal_id: step.internal_id.clone(),
            balance_before: step.balance,
            balance_after: step.balance + step.amount,
            balance_change: step.amount,
        }
    }
}

/// A realized step, tagged by rail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rail", rename_all = "snake_case")]
pub enum TransactionStep {
    /// Internal ledger.
    Ledger(LedgerTransactionStep),
    /// External processor.
    Processor(ProcessorTransactionStep),
    /// Internal adjustment rail.
    Internal(InternalTransactionStep),
}

/// A committed (or simulated) transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Transaction id.
    pub id: TransactionId,
    /// Transaction type.
    pub transaction_type: TransactionType,
    /// Currency.
    pub currency: String,
    /// Realized steps in plan order.
    pub steps: Vec<TransactionStep>,
    /// Priced line items (checkout only).
    pub line_items: Option<Vec<LineItem>>,
    /// Totals.
    pub totals: Option<TransactionTotals>,
    /// Metadata.
    pub metadata: Option<JsonValue>,
    /// Awaiting capture or void.
    pub pending: bool,
    /// First transaction of the chain.
    pub root_transaction_id: TransactionId,
    /// Predecessor in the chain.
    pub previous_transaction_id: Option<TransactionId>,
    /// Successor in the chain, set exactly once.
    pub next_transaction_id: Option<TransactionId>,
    /// Creation time.
    pub created_date: DateTime<Utc>,
    /// Caller identity.
    pub created_by: String,
    /// Computed without writing.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub simulated: bool,
}

impl Transaction {
    /// Builds the record of a committed plan from its realized steps.
    #[must_use]
    pub fn from_plan(tenant_id: &TenantId, plan: &TransactionPlan, steps: Vec<TransactionStep>) -> Self {
        Self {
            tenant_id: tenant_id.clone(),
            id: plan.id.clone(),
            transaction_type: plan.transaction_type,
            currency: plan.currency.clone(),
            steps,
            line_items: plan.line_items.clone(),
            totals: plan.totals,
            metadata: plan.metadata.clone(),
            pending: plan.pending,
            root_transaction_id: plan.root_transaction_id.clone(),
            previous_transaction_id: plan.previous_transaction_id.clone(),
            next_transaction_id: None,
            created_date: plan.created_date,
            created_by: plan.created_by.clone(),
            simulated: false,
        }
    }

    /// Projects a plan without writing anything.
    #[must_use]
    pub fn simulate(tenant_id: &TenantId, plan: &TransactionPlan) -> Self {
        let steps = plan
            .steps
            .iter()
            .map(|step| match step {
                PlanStep::Ledger(s) => TransactionStep::Ledger(LedgerTransactionStep::projected(s)),
                PlanStep::Processor(s) => TransactionStep::Processor(s.into()),
                PlanStep::Internal(s) => TransactionStep::Internal(s.into()),
            })
            .collect();

        Self {
            simulated: true,
            ..Self::from_plan(tenant_id, plan, steps)
        }
    }

    /// Ledger steps in order.
    pub fn ledger_steps(&self) -> impl Iterator<Item = &LedgerTransactionStep> {
        self.steps.iter().filter_map(|s| match s {
            TransactionStep::Ledger(step) => Some(step),
            _ => None,
        })
    }
}
