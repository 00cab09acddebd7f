//! Transaction plan types.
//!
//! A plan is the pre-commit description of a transaction: which rails move
//! how much, in which order. Plans are produced by the pure planners and
//! consumed by the executor.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tessera_shared::types::{Cents, TransactionId};

use crate::value::Value;

/// Transaction type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Creation of a value.
    InitialBalance,
    /// Purchase paid from one or more sources.
    Checkout,
    /// Fixed increase of a value.
    Credit,
    /// Fixed decrease of a value.
    Debit,
    /// Movement from one source to a value.
    Transfer,
    /// Claim of a generic code by a contact.
    Attach,
    /// Completion of a pending transaction.
    Capture,
    /// Cancellation of a pending transaction.
    Void,
    /// Undo of a completed transaction.
    Reverse,
}

impl TransactionType {
    /// Wire name of the type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InitialBalance => "initial_balance",
            Self::Checkout => "checkout",
            Self::Credit => "credit",
            Self::Debit => "debit",
            Self::Transfer => "transfer",
            Self::Attach => "attach",
            Self::Capture => "capture",
            Self::Void => "void",
            Self::Reverse => "reverse",
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initial_balance" => Ok(Self::InitialBalance),
            "checkout" => Ok(Self::Checkout),
            "credit" => Ok(Self::Credit),
            "debit" => Ok(Self::Debit),
            "transfer" => Ok(Self::Transfer),
            "attach" => Ok(Self::Attach),
            "capture" => Ok(Self::Capture),
            "void" => Ok(Self::Void),
            "reverse" => Ok(Self::Reverse),
            _ => Err(format!("Unknown transaction type: {s}")),
        }
    }
}

/// Kind of line item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineItemType {
    /// A product.
    #[default]
    Product,
    /// Shipping.
    Shipping,
    /// A fee.
    Fee,
}

impl std::fmt::Display for LineItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Product => write!(f, "product"),
            Self::Shipping => write!(f, "shipping"),
            Self::Fee => write!(f, "fee"),
        }
    }
}

/// Computed amounts of one line item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineTotal {
    /// `unit_price * quantity`.
    pub subtotal: Cents,
    /// Amount tax was computed on.
    pub taxable: Cents,
    /// Tax.
    pub tax: Cents,
    /// Discount applied by discount values.
    pub discount: Cents,
    /// Amount still unpaid.
    pub remainder: Cents,
    /// `subtotal + tax - discount`.
    pub payable: Cents,
}

/// A priced line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// Kind of item.
    pub r#type: LineItemType,
    /// Product id.
    pub product_id: Option<String>,
    /// Variant id.
    pub variant_id: Option<String>,
    /// Price of one unit.
    pub unit_price: Cents,
    /// Quantity.
    pub quantity: i64,
    /// Tax rate, e.g. `0.10`.
    pub tax_rate: Option<Decimal>,
    /// Share of the price kept by the marketplace.
    pub marketplace_rate: Option<Decimal>,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Free-form metadata.
    pub metadata: Option<JsonValue>,
    /// Computed amounts.
    pub line_total: LineTotal,
}

/// Marketplace accounting for multi-seller checkouts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketplaceTotals {
    /// Seller share of the line items before discounts.
    pub seller_gross: Cents,
    /// Discounts funded by the seller.
    pub seller_discount: Cents,
    /// `seller_gross - seller_discount`.
    pub seller_net: Cents,
}

/// Transaction totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionTotals {
    /// Sum of line subtotals.
    pub subtotal: Cents,
    /// Sum of line tax.
    pub tax: Cents,
    /// Sum of line discounts.
    pub discount: Cents,
    /// Discount paid by ledger values.
    pub discount_ledger: Cents,
    /// Sum of line payable.
    pub payable: Cents,
    /// Non-discount amount paid by ledger values.
    pub paid_ledger: Cents,
    /// Amount charged to the processor.
    pub paid_processor: Cents,
    /// Amount paid by internal sources.
    pub paid_internal: Cents,
    /// Amount left unpaid.
    pub remainder: Cents,
    /// Present when the checkout involves marketplace accounting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marketplace: Option<MarketplaceTotals>,
}

/// What a ledger step does to its value row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerAction {
    /// Conditional update of an existing row.
    Update,
    /// Insert of a new row.
    Insert,
}

/// Step against the internal ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerPlanStep {
    /// Snapshot of the value at planning time (the full row for inserts).
    pub value: Value,
    /// Signed balance delta. Ignored when the value has no balance.
    pub amount: Cents,
    /// Signed uses delta.
    pub uses: Option<i64>,
    /// Update or insert.
    pub action: LedgerAction,
    /// Permit the step on a frozen value.
    #[serde(default)]
    pub allow_frozen: bool,
    /// Permit the step on a canceled value.
    #[serde(default)]
    pub allow_canceled: bool,
}

impl LedgerPlanStep {
    /// An update step with the default guards.
    #[must_use]
    pub fn update(value: Value, amount: Cents, uses: Option<i64>) -> Self {
        Self {
            value,
            amount,
            uses,
            action: LedgerAction::Update,
            allow_frozen: false,
            allow_canceled: false,
        }
    }

    /// An insert step for a new value row.
    #[must_use]
    pub fn insert(value: Value) -> Self {
        let amount = value.balance.unwrap_or(0);
        let uses = value.uses_remaining;
        Self {
            value,
            amount,
            uses,
            action: LedgerAction::Insert,
            allow_frozen: false,
            allow_canceled: false,
        }
    }

    /// Balance after the step, `None` when the value has no balance.
    #[must_use]
    pub fn balance_after(&self) -> Option<Cents> {
        match self.action {
            LedgerAction::Insert => self.value.balance,
            LedgerAction::Update => self.value.balance.map(|b| b.saturating_add(self.amount)),
        }
    }

    /// Uses after the step, `None` when the value has unlimited uses.
    #[must_use]
    pub fn uses_after(&self) -> Option<i64> {
        match self.action {
            LedgerAction::Insert => self.value.uses_remaining,
            LedgerAction::Update => self
                .value
                .uses_remaining
                .map(|u| u.saturating_add(self.uses.unwrap_or(0))),
        }
    }
}

/// Processor operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProcessorAction {
    /// Charge a payment source.
    Charge {
        /// Tokenized payment source.
        source: String,
        /// Amount to charge.
        amount: Cents,
        /// Capture immediately, or only authorize.
        capture: bool,
    },
    /// Refund a charge.
    Refund {
        /// Charge to refund.
        charge_id: String,
        /// Amount to refund.
        amount: Cents,
        /// Refund reason.
        reason: String,
    },
    /// Capture an authorized charge.
    Capture {
        /// Charge to capture.
        charge_id: String,
        /// Amount to capture.
        amount: Cents,
    },
}

impl ProcessorAction {
    /// Signed amount from the shopper's point of view: charges are negative.
    #[must_use]
    pub fn signed_amount(&self) -> Cents {
        match self {
            Self::Charge { amount, .. } => -amount,
            Self::Refund { amount, .. } => *amount,
            Self::Capture { .. } => 0,
        }
    }

    /// Wire name of the operation.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Charge { .. } => "charge",
            Self::Refund { .. } => "refund",
            Self::Capture { .. } => "capture",
        }
    }
}

/// Result returned by the processor for one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorReceipt {
    /// Id of the object created (charge or refund id).
    pub id: String,
    /// Charge the object belongs to.
    pub charge_id: String,
    /// Amount the processor reports.
    pub amount: Cents,
}

/// Step against the external processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorPlanStep {
    /// Operation.
    pub action: ProcessorAction,
    /// Idempotency key, assigned when the step is executed.
    pub idempotency_key: Option<String>,
    /// Processor receipt, present after execution.
    pub receipt: Option<ProcessorReceipt>,
}

impl ProcessorPlanStep {
    /// Creates an unexecuted step.
    #[must_use]
    pub fn new(action: ProcessorAction) -> Self {
        Self {
            action,
            idempotency_key: None,
            receipt: None,
        }
    }
}

/// Bookkeeping-only step on an internal source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalPlanStep {
    /// Caller-defined id.
    pub internal_id: String,
    /// Caller-declared available balance.
    pub balance: Cents,
    /// Signed delta.
    pub amount: Cents,
    /// Applied before tax.
    #[serde(default)]
    pub pretax: bool,
    /// Applied before ledger values.
    #[serde(default)]
    pub before_ledger: bool,
}

/// A plan step, tagged by rail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rail", rename_all = "snake_case")]
pub enum PlanStep {
    /// Internal ledger.
    Ledger(LedgerPlanStep),
    /// External processor.
    Processor(ProcessorPlanStep),
    /// Internal adjustment rail.
    Internal(InternalPlanStep),
}

impl PlanStep {
    /// Signed amount of the step.
    #[must_use]
    pub fn amount(&self) -> Cents {
        match self {
            Self::Ledger(step) => step.amount,
            Self::Processor(step) => step.action.signed_amount(),
            Self::Internal(step) => step.amount,
        }
    }
}

/// Pre-commit description of a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPlan {
    /// Transaction id (caller supplied).
    pub id: TransactionId,
    /// Transaction type.
    pub transaction_type: TransactionType,
    /// Currency.
    pub currency: String,
    /// Steps in application order.
    pub steps: Vec<PlanStep>,
    /// Priced line items (checkout only).
    pub line_items: Option<Vec<LineItem>>,
    /// Totals.
    pub totals: Option<TransactionTotals>,
    /// Request metadata.
    pub metadata: Option<JsonValue>,
    /// Whether the transaction awaits capture or void.
    pub pending: bool,
    /// Predecessor in a chain.
    pub previous_transaction_id: Option<TransactionId>,
    /// First transaction of the chain (its own id when unchained).
    pub root_transaction_id: TransactionId,
    /// Planning time.
    pub created_date: DateTime<Utc>,
    /// Caller identity.
    pub created_by: String,
}

impl TransactionPlan {
    /// Creates an empty plan for an unchained transaction.
    #[must_use]
    pub fn new(
        id: TransactionId,
        transaction_type: TransactionType,
        currency: impl Into<String>,
        created_date: DateTime<Utc>,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            root_transaction_id: id.clone(),
            id,
            transaction_type,
            currency: currency.into(),
            steps: Vec::new(),
            line_items: None,
            totals: None,
            metadata: None,
            pending: false,
            previous_transaction_id: None,
            created_date,
            created_by: created_by.into(),
        }
    }

    /// Unpaid amount, 0 when the plan has no totals.
    #[must_use]
    pub fn remainder(&self) -> Cents {
        self.totals.map_or(0, |t| t.remainder)
    }

    /// Whether any step targets the external processor.
    #[must_use]
    pub fn has_processor_steps(&self) -> bool {
        self.steps.iter().any(|s| matches!(s, PlanStep::Processor(_)))
    }

    /// Ledger steps in plan order.
    pub fn ledger_steps(&self) -> impl Iterator<Item = &LedgerPlanStep> {
        self.steps.iter().filter_map(|s| match s {
            PlanStep::Ledger(step) => Some(step),
            _ => None,
        })
    }
}
