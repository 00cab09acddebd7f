//! Generic-code attach and value creation planners.

use serde_json::Value as JsonValue;
use tessera_shared::types::{ContactId, TenantId, TransactionId};

use super::context::PlanContext;
use super::error::PlanError;
use super::simple::ensure_usable;
use super::types::{LedgerPlanStep, PlanStep, TransactionPlan, TransactionType};
use crate::value::{CreateValueInput, Value, build_value, derive_attached_value_id, validate_create_value};

/// Plans the creation of a value as an `initial_balance` transaction whose id
/// is the value id.
///
/// # Errors
///
/// Returns `PlanError::InvalidValue` when validation fails.
pub fn plan_create_value(
    tenant_id: &TenantId,
    input: &CreateValueInput,
    ctx: &PlanContext<'_>,
) -> Result<TransactionPlan, PlanError> {
    validate_create_value(input, ctx.rules)?;
    let value = build_value(tenant_id, input, ctx.created_by, ctx.now);

    let mut plan = TransactionPlan::new(
        TransactionId::parse(value.id.as_str())?,
        TransactionType::InitialBalance,
        value.currency.clone(),
        ctx.now,
        ctx.created_by,
    );
    plan.steps = vec![PlanStep::Ledger(LedgerPlanStep::insert(value))];
    Ok(plan)
}

/// Plans the claim of a per-contact generic code.
///
/// The transaction id is the derived child id, so a repeated claim by the same
/// contact collides on the transaction header.
///
/// # Errors
///
/// Returns `PlanError::NotAttachable` for values without per-contact options,
/// and state errors for unusable codes.
pub fn plan_attach(
    generic_code: &Value,
    contact_id: &ContactId,
    ctx: &PlanContext<'_>,
) -> Result<TransactionPlan, PlanError> {
    let per_contact = generic_code
        .generic_code_options
        .as_ref()
        .and_then(|options| options.per_contact.clone())
        .filter(|_| generic_code.is_generic_code)
        .ok_or_else(|| PlanError::NotAttachable(generic_code.id.clone()))?;
    ensure_usable(generic_code, &generic_code.currency, ctx)?;

    let child_id = derive_attached_value_id(&generic_code.id, contact_id)?;

    let parent_amount = generic_code
        .balance
        .and(per_contact.balance)
        .map_or(0, |balance| -balance);
    let parent_uses = generic_code
        .uses_remaining
        .and(per_contact.uses_remaining)
        .map(|uses| -uses);

    let child = Value {
        tenant_id: generic_code.tenant_id.clone(),
        id: child_id.clone(),
        currency: generic_code.currency.clone(),
        balance: if generic_code.balance_rule.is_some() {
            None
        } else {
            Some(per_contact.balance.unwrap_or(0))
        },
        uses_remaining: per_contact.uses_remaining,
        program_id: generic_code.program_id.clone(),
        contact_id: Some(contact_id.clone()),
        code: None,
        is_generic_code: false,
        generic_code_options: None,
        attached_from_value_id: Some(generic_code.id.clone()),
        pretax: generic_code.pretax,
        active: true,
        frozen: false,
        canceled: false,
        discount: generic_code.discount,
        discount_seller_liability: generic_code.discount_seller_liability,
        discount_seller_liability_rule: generic_code.discount_seller_liability_rule.clone(),
        redemption_rule: generic_code.redemption_rule.clone(),
        balance_rule: generic_code.balance_rule.clone(),
        start_date: generic_code.start_date,
        end_date: generic_code.end_date,
        metadata: match &generic_code.metadata {
            JsonValue::Null => JsonValue::Object(serde_json::Map::new()),
            metadata => metadata.clone(),
        },
        created_date: ctx.now,
        updated_date: ctx.now,
        created_by: ctx.created_by.to_string(),
    };

    let mut plan = TransactionPlan::new(
        TransactionId::parse(child_id.as_str())?,
        TransactionType::Attach,
        generic_code.currency.clone(),
        ctx.now,
        ctx.created_by,
    );
    plan.steps = vec![
        PlanStep::Ledger(LedgerPlanStep::update(
            generic_code.clone(),
            parent_amount,
            parent_uses,
        )),
        PlanStep::Ledger(LedgerPlanStep::insert(child)),
    ];
    Ok(plan)
}
