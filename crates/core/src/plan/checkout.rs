//! Checkout planner.
//!
//! Splits the payable amount of a cart across ledger values, internal sources
//! and card charges. Sources are applied in a fixed order:
//! 1. Internal sources flagged `before_ledger`
//! 2. Ledger values, discounts first (stable otherwise)
//! 3. Remaining internal sources
//! 4. Processor charges
//!
//! Pretax sources run before tax is computed, the rest after.

use std::collections::HashSet;
use std::sync::Arc;

use rust_decimal::Decimal;
use tessera_shared::types::money::round_to_cents;
use tessera_shared::types::{Cents, RoundingMode};

use super::context::PlanContext;
use super::error::PlanError;
use super::request::{
    CheckoutRequest, InternalSource, LedgerLookup, LineItemRequest, ProcessorSource, SourceRequest,
};
use super::types::{
    InternalPlanStep, LedgerPlanStep, LineItem, LineTotal, MarketplaceTotals, PlanStep,
    ProcessorAction, ProcessorPlanStep, TransactionPlan, TransactionTotals, TransactionType,
};
use crate::rules::{CompiledRule, RuleContext, ValueContext};
use crate::value::Value;

struct LedgerFunding<'a> {
    value: &'a Value,
    available: Option<Cents>,
    balance_rule: Option<Arc<CompiledRule>>,
    redemption_rule: Option<Arc<CompiledRule>>,
    seller_liability: Option<Arc<CompiledRule>>,
}

enum Funding<'a> {
    Ledger(LedgerFunding<'a>),
    Internal {
        source: &'a InternalSource,
        available: Cents,
    },
    Processor {
        source: &'a ProcessorSource,
        available: Option<Cents>,
    },
}

struct Candidate<'a> {
    funding: Funding<'a>,
    applied: Cents,
}

impl Candidate<'_> {
    fn is_pretax(&self) -> bool {
        match &self.funding {
            Funding::Ledger(l) => l.value.pretax,
            Funding::Internal { source, .. } => source.pretax,
            Funding::Processor { .. } => false,
        }
    }

    fn is_discount(&self) -> bool {
        matches!(&self.funding, Funding::Ledger(l) if l.value.discount)
    }
}

/// Running state shared by the passes.
struct Cart<'a> {
    request: &'a CheckoutRequest,
    line_items: Vec<LineItem>,
    rounding: RoundingMode,
    seller_discount: Cents,
    seller_liability_applied: bool,
}

/// Plans a checkout against the given value snapshots.
///
/// `values` must contain every value the ledger sources can resolve to; the
/// caller loads them. Ineligible values are skipped silently because source
/// lists routinely include whole contact wallets.
///
/// # Errors
///
/// Returns `PlanError` for malformed requests, unknown values, rules that do
/// not compile and per-contact generic codes that were not attached.
pub fn plan_checkout(
    request: &CheckoutRequest,
    values: &[Value],
    ctx: &PlanContext<'_>,
) -> Result<TransactionPlan, PlanError> {
    if request.currency.trim().is_empty() {
        return Err(PlanError::InvalidRequest("currency is required".into()));
    }
    if request.line_items.is_empty() {
        return Err(PlanError::InvalidRequest("at least one line item is required".into()));
    }

    let line_items = request
        .line_items
        .iter()
        .map(build_line_item)
        .collect::<Result<Vec<_>, _>>()?;

    let mut candidates = resolve_candidates(request, values, ctx)?;
    let mut cart = Cart {
        request,
        line_items,
        rounding: request.rounding_mode.unwrap_or(ctx.rounding_mode),
        seller_discount: 0,
        seller_liability_applied: false,
    };

    for candidate in candidates.iter_mut().filter(|c| c.is_pretax()) {
        cart.apply(candidate);
    }

    cart.apply_tax();

    for candidate in candidates.iter_mut().filter(|c| !c.is_pretax()) {
        cart.apply(candidate);
    }

    for item in &mut cart.line_items {
        let total = &mut item.line_total;
        total.payable = total.subtotal + total.tax - total.discount;
    }

    let mut totals = summarize(&cart.line_items);
    let mut steps = Vec::new();
    for candidate in &candidates {
        if candidate.applied == 0 {
            continue;
        }
        match &candidate.funding {
            Funding::Ledger(l) => {
                if l.value.discount {
                    totals.discount_ledger += candidate.applied;
                } else {
                    totals.paid_ledger += candidate.applied;
                }
                steps.push(PlanStep::Ledger(LedgerPlanStep::update(
                    l.value.clone(),
                    -candidate.applied,
                    l.value.uses_remaining.map(|_| -1),
                )));
            }
            Funding::Internal { source, .. } => {
                totals.paid_internal += candidate.applied;
                steps.push(PlanStep::Internal(InternalPlanStep {
                    internal_id: source.internal_id.clone(),
                    balance: source.balance,
                    amount: -candidate.applied,
                    pretax: source.pretax,
                    before_ledger: source.before_ledger,
                }));
            }
            Funding::Processor { source, .. } => {
                totals.paid_processor += candidate.applied;
                steps.push(PlanStep::Processor(ProcessorPlanStep::new(ProcessorAction::Charge {
                    source: source.source.clone(),
                    amount: candidate.applied,
                    capture: !request.pending,
                })));
            }
        }
    }

    let has_marketplace_rate = cart.line_items.iter().any(|i| i.marketplace_rate.is_some());
    if has_marketplace_rate || cart.seller_liability_applied {
        totals.marketplace = Some(marketplace_totals(&cart));
    }

    let mut plan = TransactionPlan::new(
        request.id.clone(),
        TransactionType::Checkout,
        request.currency.clone(),
        ctx.now,
        ctx.created_by,
    );
    plan.steps = steps;
    plan.line_items = Some(cart.line_items);
    plan.totals = Some(totals);
    plan.metadata.clone_from(&request.metadata);
    plan.pending = request.pending;
    Ok(plan)
}

fn build_line_item(request: &LineItemRequest) -> Result<LineItem, PlanError> {
    let quantity = request.quantity.unwrap_or(1);
    if quantity < 1 {
        return Err(PlanError::InvalidRequest("quantity must be at least 1".into()));
    }
    if request.unit_price < 0 {
        return Err(PlanError::InvalidRequest("unitPrice cannot be negative".into()));
    }
    let unit_range = Decimal::ZERO..=Decimal::ONE;
    if request.tax_rate.is_some_and(|r| !unit_range.contains(&r)) {
        return Err(PlanError::InvalidRequest("taxRate must be between 0 and 1".into()));
    }
    if request.marketplace_rate.is_some_and(|r| !unit_range.contains(&r)) {
        return Err(PlanError::InvalidRequest("marketplaceRate must be between 0 and 1".into()));
    }
    let subtotal = request
        .unit_price
        .checked_mul(quantity)
        .ok_or_else(|| PlanError::InvalidRequest("line item subtotal overflows".into()))?;

    Ok(LineItem {
        r#type: request.r#type,
        product_id: request.product_id.clone(),
        variant_id: request.variant_id.clone(),
        unit_price: request.unit_price,
        quantity,
        tax_rate: request.tax_rate,
        marketplace_rate: request.marketplace_rate,
        tags: request.tags.clone(),
        metadata: request.metadata.clone(),
        line_total: LineTotal {
            subtotal,
            remainder: subtotal,
            ..LineTotal::default()
        },
    })
}

/// Orders the sources and compiles the rules of every eligible value.
fn resolve_candidates<'a>(
    request: &'a CheckoutRequest,
    values: &'a [Value],
    ctx: &PlanContext<'_>,
) -> Result<Vec<Candidate<'a>>, PlanError> {
    let mut ledger = Vec::new();
    let mut seen = HashSet::new();

    for source in &request.sources {
        let SourceRequest::Ledger(ledger_source) = source else {
            continue;
        };
        let matched: Vec<&Value> = match ledger_source.lookup()? {
            LedgerLookup::ValueId(id) => vec![
                values
                    .iter()
                    .find(|v| &v.id == id)
                    .ok_or_else(|| PlanError::ValueNotFound(id.clone()))?,
            ],
            LedgerLookup::Code(code) => vec![
                values
                    .iter()
                    .find(|v| v.code.as_deref() == Some(code))
                    .ok_or(PlanError::CodeNotFound)?,
            ],
            LedgerLookup::Contact(contact) => values
                .iter()
                .filter(|v| v.contact_id.as_ref() == Some(contact))
                .collect(),
        };

        for value in matched {
            if !seen.insert(&value.id) {
                continue;
            }
            if value.requires_attach() {
                return Err(PlanError::GenericCodeMustBeAttached(value.id.clone()));
            }
            if !is_eligible(value, &request.currency, ctx) {
                tracing::debug!(value_id = %value.id, "skipping ineligible value");
                continue;
            }
            ledger.push(ledger_funding(value, ctx)?);
        }
    }

    // Discounts first inside each tier; sort_by_key is stable.
    ledger.sort_by_key(|l| !l.value.discount);

    let internal = |before_ledger: bool| {
        request.sources.iter().filter_map(move |s| match s {
            SourceRequest::Internal(source)
                if source.before_ledger == before_ledger && source.balance > 0 =>
            {
                Some(Funding::Internal {
                    source,
                    available: source.balance,
                })
            }
            _ => None,
        })
    };
    let processors = request.sources.iter().filter_map(|s| match s {
        SourceRequest::Processor(source) => Some(Funding::Processor {
            source,
            available: source.max_amount,
        }),
        _ => None,
    });

    Ok(internal(true)
        .chain(ledger.into_iter().map(Funding::Ledger))
        .chain(internal(false))
        .chain(processors)
        .map(|funding| Candidate { funding, applied: 0 })
        .collect())
}

fn is_eligible(value: &Value, currency: &str, ctx: &PlanContext<'_>) -> bool {
    value.currency == currency
        && value.active
        && !value.frozen
        && !value.canceled
        && value.is_within_validity(ctx.now)
        && value.uses_remaining != Some(0)
        && (value.balance_rule.is_some() || value.balance.is_some_and(|b| b > 0))
}

fn ledger_funding<'a>(value: &'a Value, ctx: &PlanContext<'_>) -> Result<LedgerFunding<'a>, PlanError> {
    let compile = |source: Option<String>| source.map(|s| ctx.rules.compile(&s)).transpose();
    Ok(LedgerFunding {
        value,
        available: value.balance,
        balance_rule: compile(value.balance_rule.as_ref().map(|r| r.rule.clone()))?,
        redemption_rule: compile(value.redemption_rule.as_ref().map(|r| r.rule.clone()))?,
        seller_liability: if value.discount {
            compile(value.seller_liability_source())?
        } else {
            None
        },
    })
}

impl Cart<'_> {
    fn apply(&mut self, candidate: &mut Candidate<'_>) {
        let is_discount = candidate.is_discount();

        for idx in 0..self.line_items.len() {
            let remainder = self.line_items[idx].line_total.remainder;
            if remainder <= 0 {
                continue;
            }

            let amount = match &mut candidate.funding {
                Funding::Ledger(ledger) => {
                    let amount = self.ledger_amount(ledger, idx, candidate.applied);
                    if ledger.balance_rule.is_none() {
                        ledger.available = ledger.available.map(|a| a - amount);
                    }
                    amount
                }
                Funding::Internal { available, .. } => {
                    let amount = remainder.min(*available);
                    *available -= amount;
                    amount
                }
                Funding::Processor { available, .. } => {
                    let amount = available.map_or(remainder, |a| remainder.min(a));
                    *available = available.map(|a| a - amount);
                    amount
                }
            };

            if amount <= 0 {
                continue;
            }
            let total = &mut self.line_items[idx].line_total;
            total.remainder -= amount;
            if is_discount {
                total.discount += amount;
            }
            candidate.applied += amount;
        }
    }

    /// Amount a ledger value pays on one line item, 0 when its redemption
    /// rule rejects the item.
    fn ledger_amount(&mut self, ledger: &LedgerFunding<'_>, idx: usize, applied: Cents) -> Cents {
        let totals = summarize(&self.line_items);
        let item = &self.line_items[idx];
        let rule_ctx = RuleContext {
            current_line_item: Some(item),
            line_items: &self.line_items,
            totals: Some(&totals),
            metadata: self.request.metadata.as_ref(),
            value: ValueContext {
                balance_change: -applied,
                metadata: Some(&ledger.value.metadata),
            },
        };

        if let Some(rule) = &ledger.redemption_rule {
            if !rule.evaluate_to_boolean(&rule_ctx) {
                return 0;
            }
        }

        let remainder = item.line_total.remainder;
        let amount = match &ledger.balance_rule {
            Some(rule) => {
                round_to_cents(rule.evaluate_to_number(&rule_ctx), self.rounding).clamp(0, remainder)
            }
            None => remainder.min(ledger.available.unwrap_or(0)).max(0),
        };

        if amount > 0 {
            if let Some(liability) = &ledger.seller_liability {
                let share = liability
                    .evaluate_to_number(&rule_ctx)
                    .clamp(Decimal::ZERO, Decimal::ONE);
                self.seller_discount += round_to_cents(share * Decimal::from(amount), self.rounding);
                self.seller_liability_applied = true;
            }
        }

        amount
    }

    fn apply_tax(&mut self) {
        for item in &mut self.line_items {
            let total = &mut item.line_total;
            total.taxable = total.remainder;
            let rate = item.tax_rate.unwrap_or(Decimal::ZERO);
            total.tax = round_to_cents(rate * Decimal::from(total.taxable), self.rounding);
            total.remainder += total.tax;
        }
    }
}

fn summarize(line_items: &[LineItem]) -> TransactionTotals {
    line_items
        .iter()
        .fold(TransactionTotals::default(), |mut totals, item| {
            let t = &item.line_total;
            totals.subtotal += t.subtotal;
            totals.tax += t.tax;
            totals.discount += t.discount;
            totals.payable += t.subtotal + t.tax - t.discount;
            totals.remainder += t.remainder;
            totals
        })
}

fn marketplace_totals(cart: &Cart<'_>) -> MarketplaceTotals {
    let seller_gross = cart
        .line_items
        .iter()
        .map(|item| {
            let rate = item.marketplace_rate.unwrap_or(Decimal::ZERO);
            round_to_cents(
                (Decimal::ONE - rate) * Decimal::from(item.line_total.subtotal),
                cart.rounding,
            )
        })
        .sum::<Cents>();

    MarketplaceTotals {
        seller_gross,
        seller_discount: cart.seller_discount,
        seller_net: seller_gross - cart.seller_discount,
    }
}
