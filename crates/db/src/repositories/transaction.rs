//! Transaction repository: reads committed transactions back with their steps.

use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter};
use tessera_core::plan::{ProcessorAction, TransactionType};
use tessera_core::transaction::{
    InternalTransactionStep, LedgerTransactionStep, ProcessorTransactionStep, Transaction, TransactionStep,
};
use tessera_shared::types::{TenantId, TransactionId};

use super::error::RepositoryError;
use super::value::decode_json;
use crate::entities::{internal_steps, ledger_steps, processor_steps, transactions};

const TABLE: &str = "transactions";

/// Read access to committed transactions.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    db: DatabaseConnection,
}

impl TransactionRepository {
    /// Creates a new transaction repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Gets a transaction with its steps in plan order.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails or a row cannot be decoded.
    pub async fn get(&self, tenant_id: &TenantId, id: &TransactionId) -> Result<Option<Transaction>, RepositoryError> {
        get(&self.db, tenant_id, id).await
    }
}

pub(crate) async fn get<C: ConnectionTrait>(
    conn: &C,
    tenant_id: &TenantId,
    id: &TransactionId,
) -> Result<Option<Transaction>, RepositoryError> {
    let Some(header) = transactions::Entity::find_by_id((tenant_id.to_string(), id.to_string()))
        .one(conn)
        .await?
    else {
        return Ok(None);
    };

    let mut indexed: Vec<(i32, TransactionStep)> = Vec::new();

    let ledger = ledger_steps::Entity::find()
        .filter(ledger_steps::Column::TenantId.eq(tenant_id.as_str()))
        .filter(ledger_steps::Column::TransactionId.eq(id.as_str()))
        .all(conn)
        .await?;
    for row in ledger {
        indexed.push((row.step_index, TransactionStep::Ledger(ledger_step(row)?)));
    }

    let processor = processor_steps::Entity::find()
        .filter(processor_steps::Column::TenantId.eq(tenant_id.as_str()))
        .filter(processor_steps::Column::TransactionId.eq(id.as_str()))
        .all(conn)
        .await?;
    for row in processor {
        let action: ProcessorAction = serde_json::from_str(&row.action)?;
        indexed.push((
            row.step_index,
            TransactionStep::Processor(ProcessorTransactionStep {
                action,
                amount: row.amount,
                idempotency_key: row.idempotency_key,
                charge_id: row.charge_id,
                object_id: row.object_id,
            }),
        ));
    }

    let internal = internal_steps::Entity::find()
        .filter(internal_steps::Column::TenantId.eq(tenant_id.as_str()))
        .filter(internal_steps::Column::TransactionId.eq(id.as_str()))
        .all(conn)
        .await?;
    for row in internal {
        indexed.push((
            row.step_index,
            TransactionStep::Internal(InternalTransactionStep {
                internal_id: row.internal_id,
                balance_before: row.balance_before,
                balance_after: row.balance_after,
                balance_change: row.balance_change,
            }),
        ));
    }

    indexed.sort_by_key(|(index, _)| *index);
    let steps = indexed.into_iter().map(|(_, step)| step).collect();
    header_to_transaction(header, steps).map(Some)
}

fn ledger_step(row: ledger_steps::Model) -> Result<LedgerTransactionStep, RepositoryError> {
    Ok(LedgerTransactionStep {
        value_id: row
            .value_id
            .parse()
            .map_err(|e| RepositoryError::corrupt("ledger_steps", e))?,
        contact_id: row
            .contact_id
            .as_deref()
            .map(str::parse)
            .transpose()
            .map_err(|e| RepositoryError::corrupt("ledger_steps", e))?,
        code: row.code,
        balance_before: row.balance_before,
        balance_after: row.balance_after,
        balance_change: row.balance_change,
        uses_remaining_before: row.uses_remaining_before,
        uses_remaining_after: row.uses_remaining_after,
        uses_remaining_change: row.uses_remaining_change,
    })
}

fn header_to_transaction(
    header: transactions::Model,
    steps: Vec<TransactionStep>,
) -> Result<Transaction, RepositoryError> {
    let parse_id = |raw: &str| TransactionId::parse(raw).map_err(|e| RepositoryError::corrupt(TABLE, e));

    Ok(Transaction {
        tenant_id: TenantId::parse(header.tenant_id.as_str()).map_err(|e| RepositoryError::corrupt(TABLE, e))?,
        id: parse_id(&header.id)?,
        transaction_type: header
            .transaction_type
            .parse::<TransactionType>()
            .map_err(|e| RepositoryError::corrupt(TABLE, e))?,
        currency: header.currency,
        steps,
        line_items: decode_json(header.line_items.as_deref())?,
        totals: decode_json(header.totals.as_deref())?,
        metadata: decode_json(header.metadata.as_deref())?,
        pending: header.pending,
        root_transaction_id: parse_id(&header.root_transaction_id)?,
        previous_transaction_id: header.previous_transaction_id.as_deref().map(parse_id).transpose()?,
        next_transaction_id: header.next_transaction_id.as_deref().map(parse_id).transpose()?,
        created_date: header.created_date,
        created_by: header.created_by,
        simulated: false,
    })
}
