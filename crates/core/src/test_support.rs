//! Fixtures shared by unit tests.

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use tessera_shared::types::{TenantId, TransactionId, ValueId};

use crate::plan::{LineItemRequest, PlanContext};
use crate::rules::RuleCache;
use crate::value::{Rule, Value};

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap()
}

pub fn tenant() -> TenantId {
    TenantId::parse("tenant-a").unwrap()
}

pub fn tx_id(id: &str) -> TransactionId {
    TransactionId::parse(id).unwrap()
}

pub fn ctx(rules: &RuleCache) -> PlanContext<'_> {
    PlanContext::new(rules, now(), "user-1")
}

/// An active USD value with the given balance.
pub fn value(id: &str, balance: Option<i64>) -> Value {
    Value {
        tenant_id: tenant(),
        id: ValueId::parse(id).unwrap(),
        currency: "USD".to_string(),
        balance,
        uses_remaining: None,
        program_id: None,
        contact_id: None,
        code: None,
        is_generic_code: false,
        generic_code_options: None,
        attached_from_value_id: None,
        pretax: false,
        active: true,
        frozen: false,
        canceled: false,
        discount: false,
        discount_seller_liability: None,
        discount_seller_liability_rule: None,
        redemption_rule: None,
        balance_rule: None,
        start_date: None,
        end_date: None,
        metadata: serde_json::json!({}),
        created_date: now(),
        updated_date: now(),
        created_by: "user-1".to_string(),
    }
}

/// A pretax discount promotion driven by a balance rule.
pub fn promotion(id: &str, rule: &str) -> Value {
    Value {
        pretax: true,
        discount: true,
        balance_rule: Some(Rule::new(rule, "promotion")),
        ..value(id, None)
    }
}

pub fn line_item(product_id: &str, unit_price: i64, tax_rate: Option<Decimal>) -> LineItemRequest {
    LineItemRequest {
        product_id: Some(product_id.to_string()),
        unit_price,
        tax_rate,
        ..LineItemRequest::default()
    }
}
