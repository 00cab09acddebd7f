//! Creation-time validation of values.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use tessera_shared::types::TenantId;

use super::error::ValueError;
use super::types::{CreateValueInput, Value};
use crate::rules::RuleCache;

/// Validates a value before creation.
///
/// Every rule is compiled here so a broken rule is rejected at creation
/// rather than at checkout.
///
/// # Errors
///
/// Returns the first `ValueError` found.
pub fn validate_create_value(input: &CreateValueInput, rules: &RuleCache) -> Result<(), ValueError> {
    if input.currency.trim().is_empty() {
        return Err(ValueError::CurrencyRequired);
    }

    if let Some(balance) = input.balance.filter(|b| *b < 0) {
        return Err(ValueError::NegativeBalance(balance));
    }
    if let Some(uses) = input.uses_remaining.filter(|u| *u < 0) {
        return Err(ValueError::NegativeUsesRemaining(uses));
    }
    if input.balance.is_some() && input.balance_rule.is_some() {
        return Err(ValueError::BalanceWithBalanceRule);
    }

    for (field, rule) in [
        ("balance_rule", &input.balance_rule),
        ("redemption_rule", &input.redemption_rule),
        ("discount_seller_liability_rule", &input.discount_seller_liability_rule),
    ] {
        if let Some(rule) = rule {
            rules
                .compile(&rule.rule)
                .map_err(|source| ValueError::InvalidRule { field, source })?;
        }
    }

    if let Some(liability) = input.discount_seller_liability {
        if input.discount_seller_liability_rule.is_some() {
            return Err(ValueError::SellerLiabilityWithRule);
        }
        if liability < Decimal::ZERO || liability > Decimal::ONE {
            return Err(ValueError::SellerLiabilityOutOfRange(liability));
        }
    }
    if (input.discount_seller_liability.is_some() || input.discount_seller_liability_rule.is_some())
        && !input.discount
    {
        return Err(ValueError::SellerLiabilityRequiresDiscount);
    }

    if let Some(options) = &input.generic_code_options {
        if !input.is_generic_code {
            return Err(ValueError::GenericCodeOptionsRequireGenericCode);
        }
        let per_contact_balance = options.per_contact.as_ref().and_then(|p| p.balance);
        if per_contact_balance.is_some() && input.balance_rule.is_some() {
            return Err(ValueError::PerContactBalanceWithBalanceRule);
        }
        if let Some(balance) = per_contact_balance.filter(|b| *b < 0) {
            return Err(ValueError::NegativeBalance(balance));
        }
        if let Some(uses) = options
            .per_contact
            .as_ref()
            .and_then(|p| p.uses_remaining)
            .filter(|u| *u < 0)
        {
            return Err(ValueError::NegativeUsesRemaining(uses));
        }
    }

    if let (Some(start), Some(end)) = (input.start_date, input.end_date) {
        if start >= end {
            return Err(ValueError::InvalidDateRange);
        }
    }

    Ok(())
}

/// Builds the value row described by a validated input.
///
/// A value without a balance rule starts at balance 0 when none is given.
#[must_use]
pub fn build_value(
    tenant_id: &TenantId,
    input: &CreateValueInput,
    created_by: &str,
    now: DateTime<Utc>,
) -> Value {
    let balance = if input.balance_rule.is_some() {
        None
    } else {
        Some(input.balance.unwrap_or(0))
    };

    Value {
        tenant_id: tenant_id.clone(),
        id: input.id.clone(),
        currency: input.currency.clone(),
        balance,
        uses_remaining: input.uses_remaining,
        program_id: input.program_id.clone(),
        contact_id: input.contact_id.clone(),
        code: input.code.clone(),
        is_generic_code: input.is_generic_code,
        generic_code_options: input.generic_code_options.clone(),
        attached_from_value_id: None,
        pretax: input.pretax,
        active: input.active.unwrap_or(true),
        frozen: input.frozen,
        canceled: false,
        discount: input.discount,
        discount_seller_liability: input.discount_seller_liability,
        discount_seller_liability_rule: input.discount_seller_liability_rule.clone(),
        redemption_rule: input.redemption_rule.clone(),
        balance_rule: input.balance_rule.clone(),
        start_date: input.start_date,
        end_date: input.end_date,
        metadata: input.metadata.clone().unwrap_or(JsonValue::Object(serde_json::Map::new())),
        created_date: now,
        updated_date: now,
        created_by: created_by.to_string(),
    }
}
