//! Read-only evaluation context exposed to rules.
//!
//! Field names follow the wire format (`currentLineItem.lineTotal.subtotal`).
//! Any path that does not resolve yields [`RuleValue::Undefined`].

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use tessera_shared::types::Cents;

use super::value::RuleValue;
use crate::plan::types::{LineItem, LineTotal, TransactionTotals};

/// Per-value fields available under `value.*`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueContext<'a> {
    /// Signed amount this value has contributed so far in the plan.
    pub balance_change: Cents,
    /// Metadata of the value being evaluated.
    pub metadata: Option<&'a JsonValue>,
}

/// Context a rule is evaluated against.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleContext<'a> {
    /// The line item currently being priced, if any.
    pub current_line_item: Option<&'a LineItem>,
    /// Every line item of the checkout.
    pub line_items: &'a [LineItem],
    /// Running totals of the checkout.
    pub totals: Option<&'a TransactionTotals>,
    /// Request metadata.
    pub metadata: Option<&'a JsonValue>,
    /// The value the rule belongs to.
    pub value: ValueContext<'a>,
}

impl RuleContext<'_> {
    /// Resolves a dotted path.
    #[must_use]
    pub fn lookup(&self, path: &[String]) -> RuleValue {
        let Some((root, rest)) = path.split_first() else {
            return RuleValue::Undefined;
        };

        match root.as_str() {
            "currentLineItem" => self
                .current_line_item
                .map_or(RuleValue::Undefined, |item| line_item_field(item, rest)),
            "lineItems" => match rest {
                [field] if field == "length" => RuleValue::from(i64::try_from(self.line_items.len()).unwrap_or(i64::MAX)),
                _ => RuleValue::Undefined,
            },
            "totals" => self
                .totals
                .map_or(RuleValue::Undefined, |totals| totals_field(totals, rest)),
            "metadata" => json_lookup(self.metadata, rest),
            "value" => match rest {
                [field] if field == "balanceChange" => RuleValue::from(self.value.balance_change),
                [field, tail @ ..] if field == "metadata" => json_lookup(self.value.metadata, tail),
                _ => RuleValue::Undefined,
            },
            _ => RuleValue::Undefined,
        }
    }
}

fn line_item_field(item: &LineItem, path: &[String]) -> RuleValue {
    let Some((field, rest)) = path.split_first() else {
        return RuleValue::Undefined;
    };

    match (field.as_str(), rest) {
        ("type", []) => RuleValue::Str(item.r#type.to_string()),
        ("productId", []) => item.product_id.as_deref().into(),
        ("variantId", []) => item.variant_id.as_deref().into(),
        ("unitPrice", []) => RuleValue::from(item.unit_price),
        ("quantity", []) => RuleValue::from(item.quantity),
        ("taxRate", []) => item.tax_rate.into(),
        ("marketplaceRate", []) => item.marketplace_rate.into(),
        ("metadata", tail) => json_lookup(item.metadata.as_ref(), tail),
        ("lineTotal", [name]) => line_total_field(&item.line_total, name),
        _ => RuleValue::Undefined,
    }
}

fn line_total_field(total: &LineTotal, name: &str) -> RuleValue {
    let cents = match name {
        "subtotal" => total.subtotal,
        "taxable" => total.taxable,
        "tax" => total.tax,
        "discount" => total.discount,
        "remainder" => total.remainder,
        "payable" => total.payable,
        _ => return RuleValue::Undefined,
    };
    RuleValue::from(cents)
}

fn totals_field(totals: &TransactionTotals, path: &[String]) -> RuleValue {
    let [name] = path else {
        return RuleValue::Undefined;
    };
    let cents = match name.as_str() {
        "subtotal" => totals.subtotal,
        "tax" => totals.tax,
        "discount" => totals.discount,
        "payable" => totals.payable,
        "remainder" => totals.remainder,
        "discountLedger" => totals.discount_ledger,
        "paidLedger" => totals.paid_ledger,
        "paidProcessor" => totals.paid_processor,
        "paidInternal" => totals.paid_internal,
        _ => return RuleValue::Undefined,
    };
    RuleValue::from(cents)
}

/// Walks a JSON document. Objects and arrays themselves are not scalar and
/// resolve to `Undefined`; arrays expose `length` and numeric indexes.
fn json_lookup(root: Option<&JsonValue>, path: &[String]) -> RuleValue {
    let mut current = match root {
        Some(value) => value,
        None => return RuleValue::Undefined,
    };

    for segment in path {
        current = match current {
            JsonValue::Object(map) => match map.get(segment) {
                Some(next) => next,
                None => return RuleValue::Undefined,
            },
            JsonValue::Array(items) if segment == "length" => {
                return RuleValue::from(i64::try_from(items.len()).unwrap_or(i64::MAX));
            }
            JsonValue::Array(items) => match segment.parse::<usize>().ok().and_then(|i| items.get(i)) {
                Some(next) => next,
                None => return RuleValue::Undefined,
            },
            _ => return RuleValue::Undefined,
        };
    }

    match current {
        JsonValue::Number(n) => {
            let text = n.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .map_or(RuleValue::Undefined, RuleValue::Number)
        }
        JsonValue::Bool(b) => RuleValue::Bool(*b),
        JsonValue::String(s) => RuleValue::Str(s.clone()),
        JsonValue::Null | JsonValue::Object(_) | JsonValue::Array(_) => RuleValue::Undefined,
    }
}
