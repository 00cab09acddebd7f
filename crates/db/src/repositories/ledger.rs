//! SQL implementation of the ledger store.
//!
//! Every plan of one execution is committed inside a single database
//! transaction. Ledger updates are conditional: the guards re-check the
//! state the planner saw, and an update that matches no row reports a
//! replanable conflict instead of overdrawing the value.

use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait, QueryFilter, Set, SqlErr,
    TransactionTrait,
};
use tessera_core::execution::{ExecutionError, LedgerStore};
use tessera_core::plan::{LedgerAction, LedgerPlanStep, PlanStep, TransactionPlan};
use tessera_core::transaction::{
    InternalTransactionStep, LedgerTransactionStep, ProcessorTransactionStep, Transaction, TransactionStep,
};
use tessera_shared::types::TenantId;

use super::error::RepositoryError;
use super::value::{self, ValueRow, encode_json};
use crate::entities::{internal_steps, ledger_steps, processor_steps, transactions, values};

/// Ledger store backed by a `SeaORM` connection.
#[derive(Debug, Clone)]
pub struct SqlLedgerStore {
    db: DatabaseConnection,
}

impl SqlLedgerStore {
    /// Creates a new ledger store.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LedgerStore for SqlLedgerStore {
    async fn commit(
        &self,
        tenant_id: &TenantId,
        plans: &[TransactionPlan],
    ) -> Result<Vec<Transaction>, ExecutionError> {
        let txn = self.db.begin().await.map_err(storage)?;

        let mut committed = Vec::with_capacity(plans.len());
        for plan in plans {
            committed.push(commit_plan(&txn, tenant_id, plan).await?);
        }

        txn.commit().await.map_err(storage)?;
        Ok(committed)
    }
}

/// Writes one plan. Dropping `txn` on error rolls every write back.
async fn commit_plan(
    txn: &DatabaseTransaction,
    tenant_id: &TenantId,
    plan: &TransactionPlan,
) -> Result<Transaction, ExecutionError> {
    insert_header(txn, tenant_id, plan).await?;

    if let Some(previous) = &plan.previous_transaction_id {
        let result = transactions::Entity::update_many()
            .col_expr(transactions::Column::NextTransactionId, Expr::value(plan.id.as_str()))
            .filter(transactions::Column::TenantId.eq(tenant_id.as_str()))
            .filter(transactions::Column::Id.eq(previous.as_str()))
            .filter(transactions::Column::NextTransactionId.is_null())
            .exec(txn)
            .await
            .map_err(storage)?;

        if result.rows_affected == 0 {
            tracing::debug!(
                transaction_id = %plan.id,
                previous_transaction_id = %previous,
                "predecessor already chained"
            );
            return Err(ExecutionError::AlreadyChained(previous.clone()));
        }
    }

    let mut steps = Vec::with_capacity(plan.steps.len());
    for (step_index, step) in plan.steps.iter().enumerate() {
        let realized = match step {
            PlanStep::Ledger(step) => {
                let realized = match step.action {
                    LedgerAction::Update => apply_update(txn, tenant_id, plan, step).await?,
                    LedgerAction::Insert => apply_insert(txn, step).await?,
                };
                insert_ledger_step(txn, tenant_id, plan, step_index, &realized).await?;
                TransactionStep::Ledger(realized)
            }
            PlanStep::Processor(step) => {
                let realized = ProcessorTransactionStep::from(step);
                insert_processor_step(txn, tenant_id, plan, step_index, &realized).await?;
                TransactionStep::Processor(realized)
            }
            PlanStep::Internal(step) => {
                let realized = InternalTransactionStep::from(step);
                insert_internal_step(txn, tenant_id, plan, step_index, &realized).await?;
                TransactionStep::Internal(realized)
            }
        };
        steps.push(realized);
    }

    Ok(Transaction::from_plan(tenant_id, plan, steps))
}

async fn insert_header(
    txn: &DatabaseTransaction,
    tenant_id: &TenantId,
    plan: &TransactionPlan,
) -> Result<(), ExecutionError> {
    let header = transactions::ActiveModel {
        tenant_id: Set(tenant_id.to_string()),
        id: Set(plan.id.to_string()),
        transaction_type: Set(plan.transaction_type.as_str().to_string()),
        currency: Set(plan.currency.clone()),
        line_items: Set(encode_json(plan.line_items.as_ref())?),
        totals: Set(encode_json(plan.totals.as_ref())?),
        metadata: Set(encode_json(plan.metadata.as_ref())?),
        pending: Set(plan.pending),
        root_transaction_id: Set(plan.root_transaction_id.to_string()),
        previous_transaction_id: Set(plan.previous_transaction_id.as_ref().map(ToString::to_string)),
        next_transaction_id: Set(None),
        created_date: Set(plan.created_date),
        created_by: Set(plan.created_by.clone()),
    };

    match transactions::Entity::insert(header).exec_without_returning(txn).await {
        Ok(_) => Ok(()),
        Err(err) if is_unique_violation(&err) => {
            tracing::debug!(transaction_id = %plan.id, "duplicate transaction id");
            Err(ExecutionError::TransactionExists(plan.id.clone()))
        }
        Err(err) => Err(storage(err)),
    }
}

/// Applies a balance/uses delta under the state guards and reads the row back.
async fn apply_update(
    txn: &DatabaseTransaction,
    tenant_id: &TenantId,
    plan: &TransactionPlan,
    step: &LedgerPlanStep,
) -> Result<LedgerTransactionStep, ExecutionError> {
    let snapshot = &step.value;
    let mut update = values::Entity::update_many()
        .col_expr(values::Column::UpdatedDate, Expr::value(plan.created_date))
        .filter(values::Column::TenantId.eq(tenant_id.as_str()))
        .filter(values::Column::Id.eq(snapshot.id.as_str()))
        .filter(values::Column::Active.eq(true));
    if !step.allow_frozen {
        update = update.filter(values::Column::Frozen.eq(false));
    }
    if !step.allow_canceled {
        update = update.filter(values::Column::Canceled.eq(false));
    }

    // Deltas against null dimensions are ignored; the planner rejects them.
    if snapshot.balance.is_some() && step.amount != 0 {
        update = update
            .col_expr(values::Column::Balance, Expr::col(values::Column::Balance).add(step.amount))
            .filter(values::Column::Balance.is_not_null());
        if step.amount < 0 {
            update = update.filter(values::Column::Balance.gte(-step.amount));
        }
    }
    if let (Some(_), Some(uses)) = (snapshot.uses_remaining, step.uses)
        && uses != 0
    {
        update = update
            .col_expr(
                values::Column::UsesRemaining,
                Expr::col(values::Column::UsesRemaining).add(uses),
            )
            .filter(values::Column::UsesRemaining.is_not_null());
        if uses < 0 {
            update = update.filter(values::Column::UsesRemaining.gte(-uses));
        }
    }

    let result = update.exec(txn).await.map_err(storage)?;
    match result.rows_affected {
        0 => {
            tracing::debug!(
                transaction_id = %plan.id,
                value_id = %snapshot.id,
                amount = step.amount,
                "ledger guard rejected update"
            );
            return Err(ExecutionError::Conflict {
                value_id: snapshot.id.clone(),
                reason: "value state changed since planning".into(),
            });
        }
        1 => {}
        n => {
            tracing::error!(transaction_id = %plan.id, value_id = %snapshot.id, rows = n, "update matched several rows");
            return Err(ExecutionError::InvariantViolation(format!(
                "update of value {} matched {n} rows",
                snapshot.id
            )));
        }
    }

    let after = value::find(txn, tenant_id, &snapshot.id).await?.ok_or_else(|| {
        ExecutionError::InvariantViolation(format!("value {} vanished after update", snapshot.id))
    })?;
    Ok(LedgerTransactionStep::realized(step, &after))
}

async fn apply_insert(
    txn: &DatabaseTransaction,
    step: &LedgerPlanStep,
) -> Result<LedgerTransactionStep, ExecutionError> {
    let row = step.value.to_active_model()?;

    match values::Entity::insert(row).exec_without_returning(txn).await {
        Ok(_) => Ok(LedgerTransactionStep::realized(step, &step.value)),
        Err(err) if is_unique_violation(&err) => Err(match &step.value.code {
            Some(code) => ExecutionError::DuplicateCode(code.clone()),
            None => ExecutionError::InvariantViolation(format!(
                "value {} already exists",
                step.value.id
            )),
        }),
        Err(err) => Err(storage(err)),
    }
}

async fn insert_ledger_step(
    txn: &DatabaseTransaction,
    tenant_id: &TenantId,
    plan: &TransactionPlan,
    step_index: usize,
    step: &LedgerTransactionStep,
) -> Result<(), ExecutionError> {
    let row = ledger_steps::ActiveModel {
        tenant_id: Set(tenant_id.to_string()),
        transaction_id: Set(plan.id.to_string()),
        step_index: Set(index(step_index)?),
        value_id: Set(step.value_id.to_string()),
        contact_id: Set(step.contact_id.as_ref().map(ToString::to_string)),
        code: Set(step.code.clone()),
        balance_before: Set(step.balance_before),
        balance_after: Set(step.balance_after),
        balance_change: Set(step.balance_change),
        uses_remaining_before: Set(step.uses_remaining_before),
        uses_remaining_after: Set(step.uses_remaining_after),
        uses_remaining_change: Set(step.uses_remaining_change),
    };
    ledger_steps::Entity::insert(row)
        .exec_without_returning(txn)
        .await
        .map_err(storage)?;
    Ok(())
}

async fn insert_processor_step(
    txn: &DatabaseTransaction,
    tenant_id: &TenantId,
    plan: &TransactionPlan,
    step_index: usize,
    step: &ProcessorTransactionStep,
) -> Result<(), ExecutionError> {
    let row = processor_steps::ActiveModel {
        tenant_id: Set(tenant_id.to_string()),
        transaction_id: Set(plan.id.to_string()),
        step_index: Set(index(step_index)?),
        kind: Set(step.action.kind().to_string()),
        action: Set(serde_json::to_string(&step.action).map_err(RepositoryError::from)?),
        amount: Set(step.amount),
        idempotency_key: Set(step.idempotency_key.clone()),
        charge_id: Set(step.charge_id.clone()),
        object_id: Set(step.object_id.clone()),
    };
    processor_steps::Entity::insert(row)
        .exec_without_returning(txn)
        .await
        .map_err(storage)?;
    Ok(())
}

async fn insert_internal_step(
    txn: &DatabaseTransaction,
    tenant_id: &TenantId,
    plan: &TransactionPlan,
    step_index: usize,
    step: &InternalTransactionStep,
) -> Result<(), ExecutionError> {
    let row = internal_steps::ActiveModel {
        tenant_id: Set(tenant_id.to_string()),
        transaction_id: Set(plan.id.to_string()),
        step_index: Set(index(step_index)?),
        internal_id: Set(step.internal_id.clone()),
        balance_before: Set(step.balance_before),
        balance_after: Set(step.balance_after),
        balance_change: Set(step.balance_change),
    };
    internal_steps::Entity::insert(row)
        .exec_without_returning(txn)
        .await
        .map_err(storage)?;
    Ok(())
}

fn index(step_index: usize) -> Result<i32, ExecutionError> {
    i32::try_from(step_index)
        .map_err(|_| ExecutionError::InvariantViolation(format!("step index {step_index} out of range")))
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

fn storage(err: DbErr) -> ExecutionError {
    ExecutionError::Storage(err.to_string())
}
