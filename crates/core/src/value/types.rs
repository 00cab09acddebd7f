//! Value types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tessera_shared::types::{Cents, ContactId, ProgramId, TenantId, ValueId};

/// A rule attached to a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Rule source.
    pub rule: String,
    /// Human-readable explanation shown to shoppers.
    #[serde(default)]
    pub explanation: String,
}

impl Rule {
    /// Creates a rule with the given source and explanation.
    pub fn new(rule: impl Into<String>, explanation: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            explanation: explanation.into(),
        }
    }
}

/// Allotment each claimant receives when attaching a generic code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerContactOptions {
    /// Balance moved to each claimant.
    pub balance: Option<Cents>,
    /// Uses moved to each claimant.
    pub uses_remaining: Option<i64>,
}

/// Options of a generic code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenericCodeOptions {
    /// Per-claimant allotment; when set the code must be attached before use.
    pub per_contact: Option<PerContactOptions>,
}

/// A stored value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Value {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Value id.
    pub id: ValueId,
    /// ISO currency code.
    pub currency: String,
    /// Balance in cents, `None` when the value is rule-based.
    pub balance: Option<Cents>,
    /// Remaining uses, `None` for unlimited.
    pub uses_remaining: Option<i64>,
    /// Program the value was issued from.
    pub program_id: Option<ProgramId>,
    /// Owner.
    pub contact_id: Option<ContactId>,
    /// Redemption code.
    pub code: Option<String>,
    /// Whether the code is shared by many shoppers.
    pub is_generic_code: bool,
    /// Generic code options.
    pub generic_code_options: Option<GenericCodeOptions>,
    /// Generic code this value was attached from.
    pub attached_from_value_id: Option<ValueId>,
    /// Applied before tax.
    pub pretax: bool,
    /// Whether the value can be transacted against.
    pub active: bool,
    /// Temporarily blocked.
    pub frozen: bool,
    /// Permanently blocked.
    pub canceled: bool,
    /// Counted as a discount rather than a payment.
    pub discount: bool,
    /// Share of the discount funded by the seller.
    pub discount_seller_liability: Option<Decimal>,
    /// Rule form of `discount_seller_liability`.
    pub discount_seller_liability_rule: Option<Rule>,
    /// Line items the value may pay for.
    pub redemption_rule: Option<Rule>,
    /// Computes the amount available per line item.
    pub balance_rule: Option<Rule>,
    /// Start of the validity window.
    pub start_date: Option<DateTime<Utc>>,
    /// End of the validity window.
    pub end_date: Option<DateTime<Utc>>,
    /// Free-form metadata.
    pub metadata: JsonValue,
    /// Creation time.
    pub created_date: DateTime<Utc>,
    /// Last mutation time.
    pub updated_date: DateTime<Utc>,
    /// Caller identity that created the value.
    pub created_by: String,
}

impl Value {
    /// Whether `now` falls inside the validity window.
    #[must_use]
    pub fn is_within_validity(&self, now: DateTime<Utc>) -> bool {
        self.start_date.is_none_or(|start| start <= now) && self.end_date.is_none_or(|end| now < end)
    }

    /// Whether this is a generic code template that must be attached before use.
    #[must_use]
    pub fn requires_attach(&self) -> bool {
        self.is_generic_code
            && self
                .generic_code_options
                .as_ref()
                .is_some_and(|options| options.per_contact.is_some())
    }

    /// Returns the seller liability as rule source, a constant becoming a
    /// degenerate rule.
    #[must_use]
    pub fn seller_liability_source(&self) -> Option<String> {
        self.discount_seller_liability_rule
            .as_ref()
            .map(|rule| rule.rule.clone())
            .or_else(|| self.discount_seller_liability.map(|constant| constant.to_string()))
    }
}

/// Input for creating a value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateValueInput {
    /// Value id (also the id of the `initial_balance` transaction).
    pub id: ValueId,
    /// ISO currency code.
    pub currency: String,
    /// Starting balance; defaults to 0 when there is no balance rule.
    pub balance: Option<Cents>,
    /// Starting uses.
    pub uses_remaining: Option<i64>,
    /// Program.
    pub program_id: Option<ProgramId>,
    /// Owner.
    pub contact_id: Option<ContactId>,
    /// Redemption code.
    pub code: Option<String>,
    /// Whether the code is generic.
    #[serde(default)]
    pub is_generic_code: bool,
    /// Generic code options.
    pub generic_code_options: Option<GenericCodeOptions>,
    /// Applied before tax.
    #[serde(default)]
    pub pretax: bool,
    /// Defaults to true.
    pub active: Option<bool>,
    /// Frozen at creation.
    #[serde(default)]
    pub frozen: bool,
    /// Counted as a discount.
    #[serde(default)]
    pub discount: bool,
    /// Constant seller liability.
    pub discount_seller_liability: Option<Decimal>,
    /// Seller liability rule.
    pub discount_seller_liability_rule: Option<Rule>,
    /// Redemption rule.
    pub redemption_rule: Option<Rule>,
    /// Balance rule.
    pub balance_rule: Option<Rule>,
    /// Start of validity.
    pub start_date: Option<DateTime<Utc>>,
    /// End of validity.
    pub end_date: Option<DateTime<Utc>>,
    /// Metadata.
    pub metadata: Option<JsonValue>,
}

impl CreateValueInput {
    /// Creates an input with every optional attribute unset.
    pub fn new(id: ValueId, currency: impl Into<String>) -> Self {
        Self {
            id,
            currency: currency.into(),
            balance: None,
            uses_remaining: None,
            program_id: None,
            contact_id: None,
            code: None,
            is_generic_code: false,
            generic_code_options: None,
            pretax: false,
            active: None,
            frozen: false,
            discount: false,
            discount_seller_liability: None,
            discount_seller_liability_rule: None,
            redemption_rule: None,
            balance_rule: None,
            start_date: None,
            end_date: None,
            metadata: None,
        }
    }
}
