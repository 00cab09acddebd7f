//! Transaction service.
//!
//! Wires snapshot loading, the pure planners and the executor together. Each
//! operation hands the executor a planner closure that reloads its snapshots
//! on every attempt, so a replan after a conflict always sees fresh rows.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::DatabaseConnection;
use tessera_core::execution::{ExecuteOptions, ExecutionError, PaymentProcessor, TransactionExecutor};
use tessera_core::plan::{
    AttachRequest, ChainRequest, CheckoutRequest, CreditRequest, DebitRequest, PlanContext, PlanError,
    SourceRequest, TransactionType, TransferRequest, TransferSource, plan_attach, plan_capture, plan_checkout,
    plan_create_value, plan_credit, plan_debit, plan_reverse, plan_transfer, plan_void,
};
use tessera_core::plan::request::LedgerLookup;
use tessera_core::rules::RuleCache;
use tessera_core::transaction::Transaction;
use tessera_core::value::{CreateValueInput, Value, derive_attached_value_id};
use tessera_shared::config::EngineConfig;
use tessera_shared::types::{RoundingMode, TenantId, TransactionId, ValueId};

use crate::repositories::{SqlLedgerStore, TransactionRepository, ValueRepository};

/// Entry point for every ledger operation of a tenant.
pub struct TransactionService {
    values: ValueRepository,
    transactions: TransactionRepository,
    executor: TransactionExecutor,
    rules: Arc<RuleCache>,
    rounding_mode: RoundingMode,
}

impl TransactionService {
    /// Creates a service without a payment processor.
    #[must_use]
    pub fn new(db: DatabaseConnection, rules: Arc<RuleCache>, engine: &EngineConfig) -> Self {
        let store = Arc::new(SqlLedgerStore::new(db.clone()));
        Self {
            values: ValueRepository::new(db.clone()),
            transactions: TransactionRepository::new(db),
            executor: TransactionExecutor::new(store, engine.max_replan_attempts),
            rules,
            rounding_mode: engine.default_rounding_mode,
        }
    }

    /// Enables processor sources.
    #[must_use]
    pub fn with_processor(self, processor: Arc<dyn PaymentProcessor>) -> Self {
        Self {
            executor: self.executor.with_processor(processor),
            ..self
        }
    }

    fn context<'a>(&'a self, created_by: &'a str) -> PlanContext<'a> {
        PlanContext {
            rounding_mode: self.rounding_mode,
            ..PlanContext::new(&self.rules, Utc::now(), created_by)
        }
    }

    /// Gets a value.
    ///
    /// # Errors
    ///
    /// Returns `ValueNotFound` or a storage error.
    pub async fn get_value(&self, tenant_id: &TenantId, id: &ValueId) -> Result<Value, ExecutionError> {
        self.values
            .find(tenant_id, id)
            .await?
            .ok_or_else(|| PlanError::ValueNotFound(id.clone()).into())
    }

    /// Gets a committed transaction.
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotFound` or a storage error.
    pub async fn get_transaction(
        &self,
        tenant_id: &TenantId,
        id: &TransactionId,
    ) -> Result<Transaction, ExecutionError> {
        self.transactions
            .get(tenant_id, id)
            .await?
            .ok_or_else(|| PlanError::TransactionNotFound(id.clone()).into())
    }

    /// Creates a value through an `initial_balance` transaction.
    ///
    /// # Errors
    ///
    /// Returns a validation error, `TransactionExists` for a duplicate id or
    /// `DuplicateCode` for a code already in use.
    pub async fn create_value(
        &self,
        tenant_id: &TenantId,
        input: &CreateValueInput,
        created_by: &str,
    ) -> Result<Value, ExecutionError> {
        self.executor
            .execute(
                tenant_id,
                move || async move {
                    let ctx = self.context(created_by);
                    Ok(vec![plan_create_value(tenant_id, input, &ctx)?])
                },
                ExecuteOptions::default(),
            )
            .await?;

        tracing::info!(tenant_id = %tenant_id, value_id = %input.id, "value created");
        self.get_value(tenant_id, &input.id).await
    }

    /// Pays for line items from the requested sources.
    ///
    /// # Errors
    ///
    /// Returns planning, conflict, processor or storage errors.
    pub async fn checkout(
        &self,
        tenant_id: &TenantId,
        request: &CheckoutRequest,
        created_by: &str,
    ) -> Result<Transaction, ExecutionError> {
        let options = ExecuteOptions {
            simulate: request.simulate,
            allow_remainder: request.allow_remainder,
        };
        let transactions = self
            .executor
            .execute(
                tenant_id,
                move || async move {
                    let values = self.load_sources(tenant_id, &request.sources).await?;
                    let ctx = self.context(created_by);
                    Ok(vec![plan_checkout(request, &values, &ctx)?])
                },
                options,
            )
            .await?;
        single(transactions)
    }

    /// Adds balance or uses to a value.
    ///
    /// # Errors
    ///
    /// Returns planning, conflict or storage errors.
    pub async fn credit(
        &self,
        tenant_id: &TenantId,
        request: &CreditRequest,
        created_by: &str,
    ) -> Result<Transaction, ExecutionError> {
        let options = ExecuteOptions {
            simulate: request.simulate,
            allow_remainder: false,
        };
        let transactions = self
            .executor
            .execute(
                tenant_id,
                move || async move {
                    let value = self.get_value(tenant_id, &request.value_id).await?;
                    let ctx = self.context(created_by);
                    Ok(vec![plan_credit(request, &value, &ctx)?])
                },
                options,
            )
            .await?;
        single(transactions)
    }

    /// Removes balance or uses from a value.
    ///
    /// # Errors
    ///
    /// Returns planning, conflict or storage errors.
    pub async fn debit(
        &self,
        tenant_id: &TenantId,
        request: &DebitRequest,
        created_by: &str,
    ) -> Result<Transaction, ExecutionError> {
        let options = ExecuteOptions {
            simulate: request.simulate,
            allow_remainder: request.allow_remainder,
        };
        let transactions = self
            .executor
            .execute(
                tenant_id,
                move || async move {
                    let value = self.get_value(tenant_id, &request.value_id).await?;
                    let ctx = self.context(created_by);
                    Ok(vec![plan_debit(request, &value, &ctx)?])
                },
                options,
            )
            .await?;
        single(transactions)
    }

    /// Moves balance from a value or a card charge into a value.
    ///
    /// # Errors
    ///
    /// Returns planning, conflict, processor or storage errors.
    pub async fn transfer(
        &self,
        tenant_id: &TenantId,
        request: &TransferRequest,
        created_by: &str,
    ) -> Result<Transaction, ExecutionError> {
        let options = ExecuteOptions {
            simulate: request.simulate,
            allow_remainder: request.allow_remainder,
        };
        let transactions = self
            .executor
            .execute(
                tenant_id,
                move || async move {
                    let destination = self.get_value(tenant_id, &request.destination).await?;
                    let source = match &request.source {
                        TransferSource::Ledger { value_id } => Some(self.get_value(tenant_id, value_id).await?),
                        TransferSource::Processor(_) => None,
                    };
                    let ctx = self.context(created_by);
                    Ok(vec![plan_transfer(request, source.as_ref(), &destination, &ctx)?])
                },
                options,
            )
            .await?;
        single(transactions)
    }

    /// Claims a generic code for a contact and returns the contact's new value.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyClaimed` when the contact attached this code before.
    pub async fn attach(
        &self,
        tenant_id: &TenantId,
        request: &AttachRequest,
        created_by: &str,
    ) -> Result<Value, ExecutionError> {
        let transactions = self
            .executor
            .execute(
                tenant_id,
                move || async move {
                    // A used-up template would otherwise fail the overdraw check first.
                    let child_id = derive_attached_value_id(&request.value_id, &request.contact_id)
                        .map_err(PlanError::from)?;
                    if self.values.find(tenant_id, &child_id).await?.is_some() {
                        return Err(ExecutionError::AlreadyClaimed {
                            value_id: request.value_id.clone(),
                            contact_id: request.contact_id.clone(),
                        });
                    }
                    let generic_code = self.get_value(tenant_id, &request.value_id).await?;
                    let ctx = self.context(created_by);
                    Ok(vec![plan_attach(&generic_code, &request.contact_id, &ctx)?])
                },
                ExecuteOptions::default(),
            )
            .await
            .map_err(|err| match err {
                ExecutionError::TransactionExists(_) => ExecutionError::AlreadyClaimed {
                    value_id: request.value_id.clone(),
                    contact_id: request.contact_id.clone(),
                },
                other => other,
            })?;

        let transaction = single(transactions)?;
        let child_id = ValueId::parse(transaction.id.as_str()).map_err(PlanError::from)?;
        tracing::info!(
            tenant_id = %tenant_id,
            value_id = %request.value_id,
            contact_id = %request.contact_id,
            attached_value_id = %child_id,
            "generic code attached"
        );
        self.get_value(tenant_id, &child_id).await
    }

    /// Undoes a completed transaction.
    ///
    /// # Errors
    ///
    /// Returns planning, chain, processor or storage errors.
    pub async fn reverse(
        &self,
        tenant_id: &TenantId,
        request: &ChainRequest,
        created_by: &str,
    ) -> Result<Transaction, ExecutionError> {
        let options = ExecuteOptions {
            simulate: request.simulate,
            allow_remainder: false,
        };
        let transactions = self
            .executor
            .execute(
                tenant_id,
                move || async move {
                    let previous = self
                        .get_transaction(tenant_id, &request.previous_transaction_id)
                        .await?;
                    let root = if previous.transaction_type == TransactionType::Capture {
                        Some(self.get_transaction(tenant_id, &previous.root_transaction_id).await?)
                    } else {
                        None
                    };
                    let effects = root.as_ref().unwrap_or(&previous);
                    let values = self.load_step_values(tenant_id, effects).await?;
                    let ctx = self.context(created_by);
                    Ok(vec![plan_reverse(request, &previous, root.as_ref(), &values, &ctx)?])
                },
                options,
            )
            .await?;
        single(transactions)
    }

    /// Cancels a pending transaction.
    ///
    /// # Errors
    ///
    /// Returns planning, chain, processor or storage errors.
    pub async fn void(
        &self,
        tenant_id: &TenantId,
        request: &ChainRequest,
        created_by: &str,
    ) -> Result<Transaction, ExecutionError> {
        let options = ExecuteOptions {
            simulate: request.simulate,
            allow_remainder: false,
        };
        let transactions = self
            .executor
            .execute(
                tenant_id,
                move || async move {
                    let previous = self
                        .get_transaction(tenant_id, &request.previous_transaction_id)
                        .await?;
                    let values = self.load_step_values(tenant_id, &previous).await?;
                    let ctx = self.context(created_by);
                    Ok(vec![plan_void(request, &previous, &values, &ctx)?])
                },
                options,
            )
            .await?;
        single(transactions)
    }

    /// Completes a pending transaction.
    ///
    /// # Errors
    ///
    /// Returns planning, chain, processor or storage errors.
    pub async fn capture(
        &self,
        tenant_id: &TenantId,
        request: &ChainRequest,
        created_by: &str,
    ) -> Result<Transaction, ExecutionError> {
        let options = ExecuteOptions {
            simulate: request.simulate,
            allow_remainder: false,
        };
        let transactions = self
            .executor
            .execute(
                tenant_id,
                move || async move {
                    let previous = self
                        .get_transaction(tenant_id, &request.previous_transaction_id)
                        .await?;
                    let ctx = self.context(created_by);
                    Ok(vec![plan_capture(request, &previous, &ctx)?])
                },
                options,
            )
            .await?;
        single(transactions)
    }

    /// Loads every value the ledger sources of a checkout can resolve to.
    async fn load_sources(
        &self,
        tenant_id: &TenantId,
        sources: &[SourceRequest],
    ) -> Result<Vec<Value>, ExecutionError> {
        let mut loaded: Vec<Value> = Vec::new();
        for source in sources {
            let SourceRequest::Ledger(ledger) = source else {
                continue;
            };
            let found = match ledger.lookup()? {
                LedgerLookup::ValueId(id) => self.values.find(tenant_id, id).await?.into_iter().collect(),
                LedgerLookup::Code(code) => self.values.find_by_code(tenant_id, code).await?.into_iter().collect(),
                LedgerLookup::Contact(contact_id) => self.values.list_by_contact(tenant_id, contact_id).await?,
            };
            for value in found {
                if !loaded.iter().any(|v| v.id == value.id) {
                    loaded.push(value);
                }
            }
        }
        Ok(loaded)
    }

    /// Loads fresh snapshots of the values a transaction touched.
    async fn load_step_values(
        &self,
        tenant_id: &TenantId,
        transaction: &Transaction,
    ) -> Result<Vec<Value>, ExecutionError> {
        let ids: Vec<ValueId> = transaction.ledger_steps().map(|s| s.value_id.clone()).collect();
        Ok(self.values.find_many(tenant_id, &ids).await?)
    }
}

fn single(transactions: Vec<Transaction>) -> Result<Transaction, ExecutionError> {
    transactions
        .into_iter()
        .next()
        .ok_or_else(|| ExecutionError::InvariantViolation("execution produced no transaction".into()))
}
