//! Transaction planning.
//!
//! Planners are pure functions from a request, value snapshots and a
//! [`PlanContext`] to a [`TransactionPlan`]. They never touch storage; the
//! executor commits what they produce.

pub mod attach;
pub mod chain;
pub mod checkout;
pub mod context;
pub mod error;
pub mod request;
pub mod simple;
pub mod types;

#[cfg(test)]
mod checkout_props;
#[cfg(test)]
mod tests;

pub use attach::{plan_attach, plan_create_value};
pub use chain::{plan_capture, plan_reverse, plan_void};
pub use checkout::plan_checkout;
pub use context::PlanContext;
pub use error::PlanError;
pub use request::{
    AttachRequest, ChainRequest, CheckoutRequest, CreditRequest, DebitRequest, InternalSource,
    LedgerSource, LineItemRequest, ProcessorSource, SourceRequest, TransferRequest, TransferSource,
};
pub use simple::{plan_credit, plan_debit, plan_transfer};
pub use types::{
    LedgerAction, LedgerPlanStep, LineItem, PlanStep, ProcessorAction, ProcessorPlanStep,
    ProcessorReceipt, TransactionPlan, TransactionTotals, TransactionType,
};
