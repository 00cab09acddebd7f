//! Plan/commit loop.
//!
//! Plans are computed from snapshots read without locks. The commit re-checks
//! every snapshot through guarded updates; when a guard fails the executor
//! asks the planner for a fresh plan, a bounded number of times.

use std::future::Future;
use std::sync::Arc;

use tessera_shared::types::TenantId;

use super::error::ExecutionError;
use super::saga;
use super::traits::{LedgerStore, PaymentProcessor};
use crate::plan::{LedgerAction, PlanError, TransactionPlan};
use crate::transaction::Transaction;

/// Per-request execution switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecuteOptions {
    /// Return the projected transactions without writing anything.
    pub simulate: bool,
    /// Accept plans that leave part of the payable amount unpaid.
    pub allow_remainder: bool,
}

/// Commits plans produced by a planner, replanning on conflicts.
pub struct TransactionExecutor {
    store: Arc<dyn LedgerStore>,
    processor: Option<Arc<dyn PaymentProcessor>>,
    max_replan_attempts: u32,
}

impl TransactionExecutor {
    /// Creates an executor without a payment processor.
    #[must_use]
    pub fn new(store: Arc<dyn LedgerStore>, max_replan_attempts: u32) -> Self {
        Self {
            store,
            processor: None,
            max_replan_attempts,
        }
    }

    /// Enables the processor rail.
    #[must_use]
    pub fn with_processor(mut self, processor: Arc<dyn PaymentProcessor>) -> Self {
        self.processor = Some(processor);
        self
    }

    /// Plans and commits, retrying the whole cycle after a conflict.
    ///
    /// `planner` is called once per attempt and must reload its snapshots
    /// each time. All plans it returns are committed together.
    ///
    /// # Errors
    ///
    /// Returns the planner's error, a pre-commit check failure, the first
    /// non-replanable commit error, or `ReplanLimitExceeded`.
    pub async fn execute<F, Fut>(
        &self,
        tenant_id: &TenantId,
        planner: F,
        options: ExecuteOptions,
    ) -> Result<Vec<Transaction>, ExecutionError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Vec<TransactionPlan>, ExecutionError>>,
    {
        let mut attempt: u32 = 0;

        loop {
            let mut plans = planner().await?;
            for plan in &plans {
                check_plan(plan, options)?;
            }

            if options.simulate {
                return Ok(plans
                    .iter()
                    .map(|plan| Transaction::simulate(tenant_id, plan))
                    .collect());
            }

            let result = if plans.iter().any(TransactionPlan::has_processor_steps) {
                let processor = self
                    .processor
                    .as_deref()
                    .ok_or(ExecutionError::ProcessorNotConfigured)?;
                saga::execute(self.store.as_ref(), processor, tenant_id, &mut plans, attempt).await
            } else {
                self.store.commit(tenant_id, &plans).await
            };

            match result {
                Ok(transactions) => {
                    for transaction in &transactions {
                        tracing::info!(
                            tenant_id = %tenant_id,
                            transaction_id = %transaction.id,
                            transaction_type = %transaction.transaction_type,
                            attempt,
                            "transaction committed"
                        );
                    }
                    return Ok(transactions);
                }
                Err(err) if err.is_replanable() => {
                    if attempt >= self.max_replan_attempts {
                        tracing::warn!(
                            tenant_id = %tenant_id,
                            attempts = attempt + 1,
                            error = %err,
                            "giving up after repeated conflicts"
                        );
                        return Err(ExecutionError::ReplanLimitExceeded {
                            attempts: attempt + 1,
                        });
                    }
                    attempt += 1;
                    tracing::debug!(tenant_id = %tenant_id, attempt, error = %err, "replanning");
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Rejects plans that would leave a value or the checkout short.
fn check_plan(plan: &TransactionPlan, options: ExecuteOptions) -> Result<(), ExecutionError> {
    let remainder = plan.remainder();
    if remainder > 0 && !options.allow_remainder {
        let payable = plan.totals.map_or(0, |t| t.payable);
        return Err(PlanError::InsufficientBalance {
            value_id: None,
            requested: payable,
            available: payable - remainder,
        }
        .into());
    }

    for step in plan.ledger_steps() {
        if step.action != LedgerAction::Update {
            continue;
        }
        if let (Some(before), Some(after)) = (step.value.balance, step.balance_after())
            && after < 0
        {
            return Err(PlanError::InsufficientBalance {
                value_id: Some(step.value.id.clone()),
                requested: -step.amount,
                available: before,
            }
            .into());
        }
        if step.uses_after().is_some_and(|uses| uses < 0) {
            return Err(PlanError::InsufficientUses {
                value_id: step.value.id.clone(),
            }
            .into());
        }
    }

    Ok(())
}
