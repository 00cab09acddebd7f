//! Planner inputs.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use rust_decimal::Decimal;
use tessera_shared::types::{Cents, ContactId, RoundingMode, TransactionId, ValueId};

use super::error::PlanError;
use super::types::LineItemType;

/// A line item as submitted by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemRequest {
    /// Kind of item.
    #[serde(default)]
    pub r#type: LineItemType,
    /// Product id.
    pub product_id: Option<String>,
    /// Variant id.
    pub variant_id: Option<String>,
    /// Price of one unit.
    pub unit_price: Cents,
    /// Quantity, defaults to 1.
    pub quantity: Option<i64>,
    /// Tax rate.
    pub tax_rate: Option<Decimal>,
    /// Marketplace rate.
    pub marketplace_rate: Option<Decimal>,
    /// Tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Metadata.
    pub metadata: Option<JsonValue>,
}

/// A ledger source: exactly one of `value_id`, `code`, `contact_id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSource {
    /// A specific value.
    pub value_id: Option<ValueId>,
    /// A value by code.
    pub code: Option<String>,
    /// Every value of a contact.
    pub contact_id: Option<ContactId>,
}

/// Which lookup a ledger source resolves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerLookup<'a> {
    /// By value id.
    ValueId(&'a ValueId),
    /// By code.
    Code(&'a str),
    /// By contact.
    Contact(&'a ContactId),
}

impl LedgerSource {
    /// Source for one value.
    #[must_use]
    pub fn value(value_id: ValueId) -> Self {
        Self {
            value_id: Some(value_id),
            ..Self::default()
        }
    }

    /// Returns the single lookup this source names.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::InvalidSource` unless exactly one key is set.
    pub fn lookup(&self) -> Result<LedgerLookup<'_>, PlanError> {
        match (&self.value_id, &self.code, &self.contact_id) {
            (Some(id), None, None) => Ok(LedgerLookup::ValueId(id)),
            (None, Some(code), None) => Ok(LedgerLookup::Code(code)),
            (None, None, Some(contact)) => Ok(LedgerLookup::Contact(contact)),
            _ => Err(PlanError::InvalidSource(
                "ledger source must name exactly one of valueId, code, contactId".into(),
            )),
        }
    }
}

/// A card processor source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorSource {
    /// Tokenized payment source.
    pub source: String,
    /// Upper bound on the charge.
    pub max_amount: Option<Cents>,
}

/// A bookkeeping-only source tracked by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalSource {
    /// Caller-defined id.
    pub internal_id: String,
    /// Available balance.
    pub balance: Cents,
    /// Applied before tax.
    #[serde(default)]
    pub pretax: bool,
    /// Applied before ledger values.
    #[serde(default)]
    pub before_ledger: bool,
}

/// A payment source of a checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rail", rename_all = "snake_case")]
pub enum SourceRequest {
    /// Internal ledger.
    Ledger(LedgerSource),
    /// Card processor.
    Processor(ProcessorSource),
    /// Internal adjustment.
    Internal(InternalSource),
}

/// A checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    /// Transaction id.
    pub id: TransactionId,
    /// Currency.
    pub currency: String,
    /// Items purchased.
    pub line_items: Vec<LineItemRequest>,
    /// Payment sources in caller order.
    pub sources: Vec<SourceRequest>,
    /// Accept an unpaid remainder.
    #[serde(default)]
    pub allow_remainder: bool,
    /// Compute without writing.
    #[serde(default)]
    pub simulate: bool,
    /// Authorize now, capture later.
    #[serde(default)]
    pub pending: bool,
    /// Tax rounding mode.
    pub rounding_mode: Option<RoundingMode>,
    /// Metadata.
    pub metadata: Option<JsonValue>,
}

/// A fixed credit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditRequest {
    /// Transaction id.
    pub id: TransactionId,
    /// Value credited.
    pub value_id: ValueId,
    /// Currency.
    pub currency: String,
    /// Balance to add.
    pub amount: Option<Cents>,
    /// Uses to add.
    pub uses: Option<i64>,
    /// Compute without writing.
    #[serde(default)]
    pub simulate: bool,
    /// Metadata.
    pub metadata: Option<JsonValue>,
}

/// A fixed debit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebitRequest {
    /// Transaction id.
    pub id: TransactionId,
    /// Value debited.
    pub value_id: ValueId,
    /// Currency.
    pub currency: String,
    /// Balance to take.
    pub amount: Option<Cents>,
    /// Uses to take.
    pub uses: Option<i64>,
    /// Take what is available and report the rest as remainder.
    #[serde(default)]
    pub allow_remainder: bool,
    /// Compute without writing.
    #[serde(default)]
    pub simulate: bool,
    /// Authorize now, capture later.
    #[serde(default)]
    pub pending: bool,
    /// Metadata.
    pub metadata: Option<JsonValue>,
}

/// Where a transfer takes money from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rail", rename_all = "snake_case")]
pub enum TransferSource {
    /// A ledger value.
    Ledger {
        /// Source value.
        value_id: ValueId,
    },
    /// A card charge.
    Processor(ProcessorSource),
}

/// A transfer from a source to a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    /// Transaction id.
    pub id: TransactionId,
    /// Source.
    pub source: TransferSource,
    /// Destination value.
    pub destination: ValueId,
    /// Currency.
    pub currency: String,
    /// Amount to move.
    pub amount: Cents,
    /// Move what is available and report the rest as remainder.
    #[serde(default)]
    pub allow_remainder: bool,
    /// Compute without writing.
    #[serde(default)]
    pub simulate: bool,
    /// Metadata.
    pub metadata: Option<JsonValue>,
}

/// Claim of a generic code by a contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachRequest {
    /// Generic code being claimed.
    pub value_id: ValueId,
    /// Claimant.
    pub contact_id: ContactId,
}

/// Capture, void or reverse of an earlier transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainRequest {
    /// Id of the new transaction.
    pub id: TransactionId,
    /// Transaction being captured, voided or reversed.
    pub previous_transaction_id: TransactionId,
    /// Compute without writing.
    #[serde(default)]
    pub simulate: bool,
    /// Metadata.
    pub metadata: Option<JsonValue>,
}
