//! Property-based tests for the checkout planner.
//!
//! - Property 1: Totals conservation
//! - Property 2: Payment conservation
//! - Property 3: Fixed balances are never overdrawn

use proptest::prelude::*;
use rust_decimal::Decimal;
use tessera_shared::types::ValueId;

use super::checkout::plan_checkout;
use super::request::{CheckoutRequest, LedgerSource, LineItemRequest, SourceRequest};
use crate::rules::RuleCache;
use crate::test_support::{ctx, promotion, tx_id, value};
use crate::value::Value;

/// Strategy to generate line items (price 0 to 100.00, quantity 1 to 5, tax 0 to 25%).
fn line_item_strategy() -> impl Strategy<Value = LineItemRequest> {
    (0i64..10_000, 1i64..=5, 0i64..=25).prop_map(|(unit_price, quantity, tax)| LineItemRequest {
        unit_price,
        quantity: Some(quantity),
        tax_rate: Some(Decimal::new(tax, 2)),
        ..LineItemRequest::default()
    })
}

/// Strategy to generate wallet balances.
fn balances_strategy() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(0i64..20_000, 0..4)
}

fn build(
    line_items: Vec<LineItemRequest>,
    balances: &[i64],
    promo_percent: Option<i64>,
) -> (CheckoutRequest, Vec<Value>) {
    let mut values: Vec<Value> = balances
        .iter()
        .enumerate()
        .map(|(i, balance)| value(&format!("card-{i}"), Some(*balance)))
        .collect();
    if let Some(percent) = promo_percent {
        values.push(promotion(
            "promo",
            &format!("currentLineItem.lineTotal.subtotal * {percent} / 100"),
        ));
    }

    let sources = values
        .iter()
        .map(|v| SourceRequest::Ledger(LedgerSource::value(ValueId::parse(v.id.as_str()).unwrap())))
        .collect();

    let request = CheckoutRequest {
        id: tx_id("checkout-prop"),
        currency: "USD".to_string(),
        line_items,
        sources,
        allow_remainder: true,
        simulate: false,
        pending: false,
        rounding_mode: None,
        metadata: None,
    };
    (request, values)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// **Property 1: Totals conservation**
    ///
    /// *For any* checkout, the sum of line payable equals `totals.payable`,
    /// which equals `subtotal + tax - discount`.
    #[test]
    fn prop_totals_conservation(
        line_items in prop::collection::vec(line_item_strategy(), 1..5),
        balances in balances_strategy(),
        promo_percent in prop::option::of(0i64..=100),
    ) {
        let rules = RuleCache::new();
        let (request, values) = build(line_items, &balances, promo_percent);
        let plan = plan_checkout(&request, &values, &ctx(&rules)).unwrap();
        let totals = plan.totals.unwrap();
        let items = plan.line_items.unwrap();

        let line_payable: i64 = items.iter().map(|i| i.line_total.payable).sum();
        let line_remainder: i64 = items.iter().map(|i| i.line_total.remainder).sum();

        prop_assert_eq!(line_payable, totals.payable);
        prop_assert_eq!(totals.payable, totals.subtotal + totals.tax - totals.discount);
        prop_assert_eq!(line_remainder, totals.remainder);
    }

    /// **Property 2: Payment conservation**
    ///
    /// *For any* checkout, payable is covered exactly by non-discount payments
    /// plus the remainder, and the remainder is never negative.
    #[test]
    fn prop_payment_conservation(
        line_items in prop::collection::vec(line_item_strategy(), 1..5),
        balances in balances_strategy(),
        promo_percent in prop::option::of(0i64..=100),
    ) {
        let rules = RuleCache::new();
        let (request, values) = build(line_items, &balances, promo_percent);
        let plan = plan_checkout(&request, &values, &ctx(&rules)).unwrap();
        let totals = plan.totals.unwrap();

        prop_assert!(totals.remainder >= 0);
        prop_assert_eq!(
            totals.payable,
            totals.paid_ledger + totals.paid_internal + totals.paid_processor + totals.remainder
        );
        prop_assert_eq!(totals.discount, totals.discount_ledger);
    }

    /// **Property 3: Fixed balances are never overdrawn**
    ///
    /// *For any* checkout, every ledger step is a debit no larger than the
    /// value's balance, and zero-amount steps are dropped.
    #[test]
    fn prop_fixed_balances_not_overdrawn(
        line_items in prop::collection::vec(line_item_strategy(), 1..5),
        balances in balances_strategy(),
    ) {
        let rules = RuleCache::new();
        let (request, values) = build(line_items, &balances, None);
        let plan = plan_checkout(&request, &values, &ctx(&rules)).unwrap();

        for step in plan.ledger_steps() {
            prop_assert!(step.amount < 0);
            prop_assert!(step.balance_after().unwrap() >= 0);
        }
    }
}
