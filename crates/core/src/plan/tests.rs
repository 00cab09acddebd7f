//! Planner tests.

use rstest::rstest;
use rust_decimal_macros::dec;
use serde_json::json;
use tessera_shared::types::{ContactId, RoundingMode, ValueId};

use super::*;
use crate::rules::RuleCache;
use crate::test_support::{ctx, line_item, now, promotion, tenant, tx_id, value};
use crate::transaction::{
    LedgerTransactionStep, ProcessorTransactionStep, Transaction, TransactionStep,
};
use crate::value::{CreateValueInput, GenericCodeOptions, PerContactOptions, Rule, Value};

fn checkout(sources: Vec<SourceRequest>, line_items: Vec<LineItemRequest>) -> CheckoutRequest {
    CheckoutRequest {
        id: tx_id("checkout-1"),
        currency: "USD".to_string(),
        line_items,
        sources,
        allow_remainder: false,
        simulate: false,
        pending: false,
        rounding_mode: None,
        metadata: None,
    }
}

fn ledger(id: &str) -> SourceRequest {
    SourceRequest::Ledger(LedgerSource::value(ValueId::parse(id).unwrap()))
}

fn ledger_amounts(plan: &TransactionPlan) -> Vec<(String, i64)> {
    plan.ledger_steps()
        .map(|s| (s.value.id.to_string(), s.amount))
        .collect()
}

fn totals(plan: &TransactionPlan) -> TransactionTotals {
    plan.totals.unwrap()
}

// ========== Checkout ==========

#[test]
fn test_checkout_promotion_and_gift_card() {
    let rules = RuleCache::new();
    let values = vec![
        promotion("promo", "currentLineItem.lineTotal.subtotal * 0.5"),
        value("gift-card", Some(500)),
    ];
    let request = checkout(
        vec![ledger("promo"), ledger("gift-card")],
        vec![
            line_item("p1", 500, Some(dec!(0.10))),
            line_item("p2", 500, Some(dec!(0.10))),
        ],
    );

    let plan = plan_checkout(&request, &values, &ctx(&rules)).unwrap();
    let totals = totals(&plan);

    assert_eq!(totals.subtotal, 1000);
    assert_eq!(totals.discount, 500);
    assert_eq!(totals.tax, 50);
    assert_eq!(totals.payable, 550);
    assert_eq!(totals.remainder, 50);
    assert_eq!(totals.discount_ledger, 500);
    assert_eq!(totals.paid_ledger, 500);
    assert_eq!(
        ledger_amounts(&plan),
        vec![("promo".to_string(), -500), ("gift-card".to_string(), -500)]
    );
}

#[test]
fn test_checkout_discounts_sort_before_gift_cards() {
    let rules = RuleCache::new();
    let values = vec![
        value("gift-card", Some(500)),
        promotion("promo", "currentLineItem.lineTotal.subtotal * 0.5"),
    ];
    let request = checkout(
        vec![ledger("gift-card"), ledger("promo")],
        vec![
            line_item("p1", 500, Some(dec!(0.10))),
            line_item("p2", 500, Some(dec!(0.10))),
        ],
    );

    let plan = plan_checkout(&request, &values, &ctx(&rules)).unwrap();

    assert_eq!(totals(&plan).payable, 550);
    assert_eq!(totals(&plan).remainder, 50);
    assert_eq!(
        ledger_amounts(&plan),
        vec![("promo".to_string(), -500), ("gift-card".to_string(), -500)]
    );
}

#[test]
fn test_checkout_line_totals_sum_to_totals() {
    let rules = RuleCache::new();
    let values = vec![
        promotion("promo", "currentLineItem.lineTotal.subtotal * 0.5"),
        value("gift-card", Some(500)),
    ];
    let request = checkout(
        vec![ledger("promo"), ledger("gift-card")],
        vec![
            line_item("p1", 500, Some(dec!(0.10))),
            line_item("p2", 500, Some(dec!(0.10))),
        ],
    );

    let plan = plan_checkout(&request, &values, &ctx(&rules)).unwrap();
    let items = plan.line_items.as_ref().unwrap();

    assert_eq!(items[0].line_total.taxable, 250);
    assert_eq!(items[0].line_total.tax, 25);
    assert_eq!(items[0].line_total.payable, 275);
    assert_eq!(
        items.iter().map(|i| i.line_total.remainder).sum::<i64>(),
        totals(&plan).remainder
    );
}

#[test]
fn test_redemption_rule_rejects_single_line_item() {
    let rules = RuleCache::new();
    let mut promo = promotion("promo", "currentLineItem.lineTotal.subtotal");
    promo.redemption_rule = Some(Rule::new("currentLineItem.productId == 'p1'", "p1 only"));
    let request = checkout(
        vec![ledger("promo")],
        vec![line_item("p1", 500, None), line_item("p2", 300, None)],
    );

    let plan = plan_checkout(&request, &[promo], &ctx(&rules)).unwrap();
    let items = plan.line_items.as_ref().unwrap();

    assert_eq!(items[0].line_total.discount, 500);
    assert_eq!(items[1].line_total.discount, 0);
    assert_eq!(totals(&plan).remainder, 300);
    assert_eq!(ledger_amounts(&plan), vec![("promo".to_string(), -500)]);
}

#[test]
fn test_rule_based_value_keeps_null_balance() {
    let rules = RuleCache::new();
    let request = checkout(vec![ledger("promo")], vec![line_item("p1", 1000, None)]);
    let values = vec![promotion("promo", "currentLineItem.lineTotal.subtotal * 0.25")];

    let plan = plan_checkout(&request, &values, &ctx(&rules)).unwrap();
    let step = plan.ledger_steps().next().unwrap();

    assert_eq!(step.amount, -250);
    assert_eq!(step.value.balance, None);
    assert_eq!(step.balance_after(), None);
}

#[test]
fn test_value_with_uses_gets_uses_step() {
    let rules = RuleCache::new();
    let mut card = value("gift-card", Some(1000));
    card.uses_remaining = Some(2);
    let request = checkout(vec![ledger("gift-card")], vec![line_item("p1", 400, None)]);

    let plan = plan_checkout(&request, &[card], &ctx(&rules)).unwrap();
    assert_eq!(plan.ledger_steps().next().unwrap().uses, Some(-1));
}

#[test]
fn test_ineligible_values_are_skipped() {
    let rules = RuleCache::new();
    let frozen = Value {
        frozen: true,
        ..value("frozen", Some(500))
    };
    let euros = Value {
        currency: "EUR".to_string(),
        ..value("euros", Some(500))
    };
    let expired = Value {
        end_date: Some(now()),
        ..value("expired", Some(500))
    };
    let used_up = Value {
        uses_remaining: Some(0),
        ..value("used-up", Some(500))
    };
    let empty = value("empty", Some(0));
    let good = value("good", Some(500));

    let request = checkout(
        vec![
            ledger("frozen"),
            ledger("euros"),
            ledger("expired"),
            ledger("used-up"),
            ledger("empty"),
            ledger("good"),
        ],
        vec![line_item("p1", 300, None)],
    );

    let plan = plan_checkout(
        &request,
        &[frozen, euros, expired, used_up, empty, good],
        &ctx(&rules),
    )
    .unwrap();
    assert_eq!(ledger_amounts(&plan), vec![("good".to_string(), -300)]);
}

#[test]
fn test_per_contact_generic_code_must_be_attached() {
    let rules = RuleCache::new();
    let generic = Value {
        is_generic_code: true,
        generic_code_options: Some(GenericCodeOptions {
            per_contact: Some(PerContactOptions {
                balance: Some(500),
                uses_remaining: None,
            }),
        }),
        ..value("SPRING", Some(50_000))
    };
    let request = checkout(vec![ledger("SPRING")], vec![line_item("p1", 300, None)]);

    assert_eq!(
        plan_checkout(&request, &[generic], &ctx(&rules)),
        Err(PlanError::GenericCodeMustBeAttached(ValueId::parse("SPRING").unwrap()))
    );
}

#[test]
fn test_unknown_value_and_invalid_source() {
    let rules = RuleCache::new();
    let request = checkout(vec![ledger("missing")], vec![line_item("p1", 300, None)]);
    assert_eq!(
        plan_checkout(&request, &[], &ctx(&rules)),
        Err(PlanError::ValueNotFound(ValueId::parse("missing").unwrap()))
    );

    let request = checkout(
        vec![SourceRequest::Ledger(LedgerSource::default())],
        vec![line_item("p1", 300, None)],
    );
    assert!(matches!(
        plan_checkout(&request, &[], &ctx(&rules)),
        Err(PlanError::InvalidSource(_))
    ));
}

#[test]
fn test_code_and_contact_sources() {
    let rules = RuleCache::new();
    let contact = ContactId::parse("contact-1").unwrap();
    let coded = Value {
        code: Some("GIFT-123".to_string()),
        ..value("coded", Some(100))
    };
    let wallet_a = Value {
        contact_id: Some(contact.clone()),
        ..value("wallet-a", Some(200))
    };
    let wallet_b = Value {
        contact_id: Some(contact.clone()),
        ..value("wallet-b", Some(300))
    };
    let request = checkout(
        vec![
            SourceRequest::Ledger(LedgerSource {
                code: Some("GIFT-123".to_string()),
                ..LedgerSource::default()
            }),
            ledger("wallet-a"),
            SourceRequest::Ledger(LedgerSource {
                contact_id: Some(contact),
                ..LedgerSource::default()
            }),
        ],
        vec![line_item("p1", 1000, None)],
    );

    let plan = plan_checkout(&request, &[coded, wallet_a, wallet_b], &ctx(&rules)).unwrap();
    assert_eq!(
        ledger_amounts(&plan),
        vec![
            ("coded".to_string(), -100),
            ("wallet-a".to_string(), -200),
            ("wallet-b".to_string(), -300),
        ]
    );
    assert_eq!(totals(&plan).remainder, 400);
}

#[test]
fn test_processor_pays_remainder() {
    let rules = RuleCache::new();
    let mut request = checkout(
        vec![
            SourceRequest::Processor(ProcessorSource {
                source: "tok_visa".into(),
                max_amount: None,
            }),
            ledger("gift-card"),
        ],
        vec![line_item("p1", 1000, None)],
    );
    request.pending = true;

    let plan = plan_checkout(&request, &[value("gift-card", Some(300))], &ctx(&rules)).unwrap();

    assert!(plan.pending);
    assert!(plan.has_processor_steps());
    assert!(matches!(plan.steps[0], PlanStep::Ledger(_)));
    let PlanStep::Processor(processor) = &plan.steps[1] else {
        panic!("expected processor step");
    };
    assert_eq!(
        processor.action,
        ProcessorAction::Charge {
            source: "tok_visa".into(),
            amount: 700,
            capture: false,
        }
    );
    assert_eq!(totals(&plan).paid_processor, 700);
    assert_eq!(totals(&plan).remainder, 0);
}

#[test]
fn test_processor_max_amount_leaves_remainder() {
    let rules = RuleCache::new();
    let request = checkout(
        vec![SourceRequest::Processor(ProcessorSource {
            source: "tok_visa".into(),
            max_amount: Some(500),
        })],
        vec![line_item("p1", 700, None)],
    );

    let plan = plan_checkout(&request, &[], &ctx(&rules)).unwrap();
    assert_eq!(totals(&plan).paid_processor, 500);
    assert_eq!(totals(&plan).remainder, 200);
}

#[test]
fn test_internal_sources_ordering() {
    let rules = RuleCache::new();
    let internal = |before_ledger| {
        SourceRequest::Internal(InternalSource {
            internal_id: "points".into(),
            balance: 300,
            pretax: false,
            before_ledger,
        })
    };

    let request = checkout(
        vec![ledger("gift-card"), internal(true)],
        vec![line_item("p1", 1000, None)],
    );
    let plan = plan_checkout(&request, &[value("gift-card", Some(1000))], &ctx(&rules)).unwrap();
    assert!(matches!(&plan.steps[0], PlanStep::Internal(s) if s.amount == -300));
    assert!(matches!(&plan.steps[1], PlanStep::Ledger(s) if s.amount == -700));
    assert_eq!(totals(&plan).paid_internal, 300);

    let request = checkout(
        vec![internal(false), ledger("gift-card")],
        vec![line_item("p1", 1000, None)],
    );
    let plan = plan_checkout(&request, &[value("gift-card", Some(1000))], &ctx(&rules)).unwrap();
    assert_eq!(plan.steps.len(), 1);
    assert!(matches!(&plan.steps[0], PlanStep::Ledger(s) if s.amount == -1000));
}

#[test]
fn test_tax_rounding_modes() {
    let rules = RuleCache::new();
    let mut request = checkout(vec![], vec![line_item("p1", 25, Some(dec!(0.10)))]);

    let plan = plan_checkout(&request, &[], &ctx(&rules)).unwrap();
    assert_eq!(totals(&plan).tax, 2);

    request.rounding_mode = Some(RoundingMode::HalfUp);
    let plan = plan_checkout(&request, &[], &ctx(&rules)).unwrap();
    assert_eq!(totals(&plan).tax, 3);
}

#[test]
fn test_marketplace_totals() {
    let rules = RuleCache::new();
    let promo = Value {
        discount_seller_liability: Some(dec!(0.5)),
        ..promotion("promo", "currentLineItem.lineTotal.subtotal * 0.1")
    };
    let mut item = line_item("p1", 1000, None);
    item.marketplace_rate = Some(dec!(0.2));
    let request = checkout(vec![ledger("promo")], vec![item]);

    let plan = plan_checkout(&request, &[promo], &ctx(&rules)).unwrap();
    let marketplace = totals(&plan).marketplace.unwrap();

    assert_eq!(marketplace.seller_gross, 800);
    assert_eq!(marketplace.seller_discount, 50);
    assert_eq!(marketplace.seller_net, 750);
}

#[rstest]
#[case::rate_from_line_item("currentLineItem.marketplaceRate", 20)]
#[case::clamped_above_one("currentLineItem.marketplaceRate * 10", 100)]
#[case::clamped_below_zero("-0.5", 0)]
#[case::undefined_field_is_zero("currentLineItem.sellerShare", 0)]
fn test_seller_liability_rule(#[case] rule: &str, #[case] seller_discount: i64) {
    let rules = RuleCache::new();
    // The constant is ignored whenever a rule is present.
    let promo = Value {
        discount_seller_liability: Some(dec!(0.5)),
        discount_seller_liability_rule: Some(Rule::new(rule, "seller share")),
        ..promotion("promo", "currentLineItem.lineTotal.subtotal * 0.1")
    };
    let mut item = line_item("p1", 1000, None);
    item.marketplace_rate = Some(dec!(0.2));
    let request = checkout(vec![ledger("promo")], vec![item]);

    let plan = plan_checkout(&request, &[promo], &ctx(&rules)).unwrap();
    assert_eq!(totals(&plan).discount, 100);

    let marketplace = totals(&plan).marketplace.unwrap();
    assert_eq!(marketplace.seller_gross, 800);
    assert_eq!(marketplace.seller_discount, seller_discount);
    assert_eq!(marketplace.seller_net, 800 - seller_discount);
}

#[test]
fn test_no_marketplace_totals_without_rates_or_liability() {
    let rules = RuleCache::new();
    let request = checkout(vec![ledger("gift-card")], vec![line_item("p1", 100, None)]);
    let plan = plan_checkout(&request, &[value("gift-card", Some(100))], &ctx(&rules)).unwrap();
    assert!(totals(&plan).marketplace.is_none());
}

#[test]
fn test_invalid_line_items_rejected() {
    let rules = RuleCache::new();
    let mut item = line_item("p1", 100, None);
    item.quantity = Some(0);
    let request = checkout(vec![], vec![item]);
    assert!(matches!(
        plan_checkout(&request, &[], &ctx(&rules)),
        Err(PlanError::InvalidRequest(_))
    ));

    let request = checkout(vec![], vec![]);
    assert!(matches!(
        plan_checkout(&request, &[], &ctx(&rules)),
        Err(PlanError::InvalidRequest(_))
    ));
}

#[test]
fn test_balance_rule_reads_request_metadata() {
    let rules = RuleCache::new();
    let mut request = checkout(vec![ledger("promo")], vec![line_item("p1", 1000, None)]);
    request.metadata = Some(json!({ "vip": true }));
    let values = vec![promotion("promo", "metadata.vip && 200 || 0")];

    let plan = plan_checkout(&request, &values, &ctx(&rules)).unwrap();
    assert_eq!(totals(&plan).discount, 200);
}

// ========== Credit / Debit / Transfer ==========

fn credit(amount: Option<i64>, uses: Option<i64>) -> CreditRequest {
    CreditRequest {
        id: tx_id("credit-1"),
        value_id: ValueId::parse("gift-card").unwrap(),
        currency: "USD".into(),
        amount,
        uses,
        simulate: false,
        metadata: None,
    }
}

fn debit(amount: i64, allow_remainder: bool) -> DebitRequest {
    DebitRequest {
        id: tx_id("debit-1"),
        value_id: ValueId::parse("gift-card").unwrap(),
        currency: "USD".into(),
        amount: Some(amount),
        uses: None,
        allow_remainder,
        simulate: false,
        pending: false,
        metadata: None,
    }
}

#[test]
fn test_credit_plan() {
    let rules = RuleCache::new();
    let plan = plan_credit(&credit(Some(250), None), &value("gift-card", Some(100)), &ctx(&rules)).unwrap();

    assert_eq!(plan.transaction_type, TransactionType::Credit);
    assert_eq!(ledger_amounts(&plan), vec![("gift-card".to_string(), 250)]);
    assert_eq!(plan.ledger_steps().next().unwrap().balance_after(), Some(350));
}

#[test]
fn test_credit_null_dimensions_rejected() {
    let rules = RuleCache::new();
    let promo = promotion("gift-card", "1");
    assert_eq!(
        plan_credit(&credit(Some(250), None), &promo, &ctx(&rules)),
        Err(PlanError::NullBalance(promo.id.clone()))
    );
    assert_eq!(
        plan_credit(&credit(None, Some(1)), &value("gift-card", Some(0)), &ctx(&rules)),
        Err(PlanError::NullUsesRemaining(ValueId::parse("gift-card").unwrap()))
    );
    assert!(matches!(
        plan_credit(&credit(None, None), &value("gift-card", Some(0)), &ctx(&rules)),
        Err(PlanError::InvalidRequest(_))
    ));
    assert!(matches!(
        plan_credit(&credit(Some(-5), None), &value("gift-card", Some(0)), &ctx(&rules)),
        Err(PlanError::InvalidRequest(_))
    ));
}

#[test]
fn test_debit_without_remainder_plans_full_amount() {
    let rules = RuleCache::new();
    let plan = plan_debit(&debit(800, false), &value("gift-card", Some(500)), &ctx(&rules)).unwrap();
    assert_eq!(ledger_amounts(&plan), vec![("gift-card".to_string(), -800)]);
    assert_eq!(plan.remainder(), 0);
}

#[test]
fn test_debit_with_remainder_takes_available() {
    let rules = RuleCache::new();
    let plan = plan_debit(&debit(800, true), &value("gift-card", Some(500)), &ctx(&rules)).unwrap();
    assert_eq!(ledger_amounts(&plan), vec![("gift-card".to_string(), -500)]);
    assert_eq!(plan.remainder(), 300);
}

#[test]
fn test_debit_value_state_errors() {
    let rules = RuleCache::new();
    let frozen = Value {
        frozen: true,
        ..value("gift-card", Some(500))
    };
    assert!(matches!(
        plan_debit(&debit(100, false), &frozen, &ctx(&rules)),
        Err(PlanError::ValueFrozen(_))
    ));

    let canceled = Value {
        canceled: true,
        ..value("gift-card", Some(500))
    };
    assert!(matches!(
        plan_debit(&debit(100, false), &canceled, &ctx(&rules)),
        Err(PlanError::ValueCanceled(_))
    ));

    let euros = Value {
        currency: "EUR".into(),
        ..value("gift-card", Some(500))
    };
    assert!(matches!(
        plan_debit(&debit(100, false), &euros, &ctx(&rules)),
        Err(PlanError::CurrencyMismatch { .. })
    ));
}

#[test]
fn test_transfer_between_values() {
    let rules = RuleCache::new();
    let request = TransferRequest {
        id: tx_id("transfer-1"),
        source: TransferSource::Ledger {
            value_id: ValueId::parse("from").unwrap(),
        },
        destination: ValueId::parse("to").unwrap(),
        currency: "USD".into(),
        amount: 700,
        allow_remainder: true,
        simulate: false,
        metadata: None,
    };
    let from = value("from", Some(400));
    let to = value("to", Some(0));

    let plan = plan_transfer(&request, Some(&from), &to, &ctx(&rules)).unwrap();
    assert_eq!(
        ledger_amounts(&plan),
        vec![("from".to_string(), -400), ("to".to_string(), 400)]
    );
    assert_eq!(plan.remainder(), 300);
}

#[test]
fn test_transfer_from_processor() {
    let rules = RuleCache::new();
    let request = TransferRequest {
        id: tx_id("transfer-2"),
        source: TransferSource::Processor(ProcessorSource {
            source: "tok_visa".into(),
            max_amount: None,
        }),
        destination: ValueId::parse("to").unwrap(),
        currency: "USD".into(),
        amount: 1500,
        allow_remainder: false,
        simulate: false,
        metadata: None,
    };

    let plan = plan_transfer(&request, None, &value("to", Some(0)), &ctx(&rules)).unwrap();
    assert!(plan.has_processor_steps());
    assert_eq!(plan.steps[0].amount(), -1500);
    assert_eq!(plan.steps[1].amount(), 1500);
}

// ========== Create / Attach ==========

#[test]
fn test_plan_create_value() {
    let rules = RuleCache::new();
    let mut input = CreateValueInput::new(ValueId::parse("gc-1").unwrap(), "USD");
    input.balance = Some(2500);

    let plan = plan_create_value(&tenant(), &input, &ctx(&rules)).unwrap();
    assert_eq!(plan.id.as_str(), "gc-1");
    assert_eq!(plan.transaction_type, TransactionType::InitialBalance);
    let step = plan.ledger_steps().next().unwrap();
    assert_eq!(step.action, LedgerAction::Insert);
    assert_eq!(step.amount, 2500);
}

#[test]
fn test_plan_create_value_rejects_bad_rule() {
    let rules = RuleCache::new();
    let mut input = CreateValueInput::new(ValueId::parse("promo").unwrap(), "USD");
    input.balance_rule = Some(Rule::new("currentLineItem.lineTotal.subtotal *", "broken"));

    assert!(matches!(
        plan_create_value(&tenant(), &input, &ctx(&rules)),
        Err(PlanError::InvalidValue(_))
    ));
}

#[test]
fn test_plan_attach() {
    let rules = RuleCache::new();
    let generic = Value {
        is_generic_code: true,
        code: Some("SPRING".into()),
        generic_code_options: Some(GenericCodeOptions {
            per_contact: Some(PerContactOptions {
                balance: Some(500),
                uses_remaining: Some(1),
            }),
        }),
        uses_remaining: Some(100),
        ..value("spring", Some(50_000))
    };
    let contact = ContactId::parse("contact-1").unwrap();

    let plan = plan_attach(&generic, &contact, &ctx(&rules)).unwrap();
    let expected_child =
        crate::value::derive_attached_value_id(&generic.id, &contact).unwrap();

    assert_eq!(plan.id.as_str(), expected_child.as_str());
    assert_eq!(plan.transaction_type, TransactionType::Attach);

    let steps: Vec<_> = plan.ledger_steps().collect();
    assert_eq!(steps[0].action, LedgerAction::Update);
    assert_eq!(steps[0].amount, -500);
    assert_eq!(steps[0].uses, Some(-1));

    assert_eq!(steps[1].action, LedgerAction::Insert);
    let child = &steps[1].value;
    assert_eq!(child.id, expected_child);
    assert_eq!(child.balance, Some(500));
    assert_eq!(child.uses_remaining, Some(1));
    assert_eq!(child.contact_id.as_ref(), Some(&contact));
    assert_eq!(child.attached_from_value_id.as_ref(), Some(&generic.id));
    assert!(!child.is_generic_code);
    assert!(child.code.is_none());
}

#[test]
fn test_plan_attach_requires_per_contact_options() {
    let rules = RuleCache::new();
    let contact = ContactId::parse("contact-1").unwrap();
    assert!(matches!(
        plan_attach(&value("gift-card", Some(100)), &contact, &ctx(&rules)),
        Err(PlanError::NotAttachable(_))
    ));
}

// ========== Chain ==========

fn committed(plan: &TransactionPlan) -> Transaction {
    let steps = plan
        .steps
        .iter()
        .map(|step| match step {
            PlanStep::Ledger(s) => TransactionStep::Ledger(LedgerTransactionStep::projected(s)),
            PlanStep::Processor(s) => {
                let mut executed = s.clone();
                executed.receipt = Some(ProcessorReceipt {
                    id: "ch_1".into(),
                    charge_id: "ch_1".into(),
                    amount: -s.action.signed_amount(),
                });
                TransactionStep::Processor(ProcessorTransactionStep::from(&executed))
            }
            PlanStep::Internal(s) => TransactionStep::Internal(s.into()),
        })
        .collect();
    Transaction::from_plan(&tenant(), plan, steps)
}

fn chain(id: &str, previous: &Transaction) -> ChainRequest {
    ChainRequest {
        id: tx_id(id),
        previous_transaction_id: previous.id.clone(),
        simulate: false,
        metadata: None,
    }
}

#[test]
fn test_reverse_negates_ledger_steps() {
    let rules = RuleCache::new();
    let card = value("gift-card", Some(500));
    let original = committed(&plan_debit(&debit(200, false), &card, &ctx(&rules)).unwrap());
    let after = Value {
        balance: Some(300),
        frozen: true,
        ..card
    };

    let plan = plan_reverse(&chain("rev-1", &original), &original, None, &[after], &ctx(&rules)).unwrap();

    assert_eq!(plan.transaction_type, TransactionType::Reverse);
    assert_eq!(plan.previous_transaction_id.as_ref(), Some(&original.id));
    assert_eq!(plan.root_transaction_id, original.id);
    let step = plan.ledger_steps().next().unwrap();
    assert_eq!(step.amount, 200);
    assert!(step.allow_frozen);
    assert!(step.allow_canceled);
}

#[test]
fn test_reverse_refunds_charges() {
    let rules = RuleCache::new();
    let request = checkout(
        vec![SourceRequest::Processor(ProcessorSource {
            source: "tok_visa".into(),
            max_amount: None,
        })],
        vec![line_item("p1", 1200, None)],
    );
    let original = committed(&plan_checkout(&request, &[], &ctx(&rules)).unwrap());

    let plan = plan_reverse(&chain("rev-1", &original), &original, None, &[], &ctx(&rules)).unwrap();
    let PlanStep::Processor(step) = &plan.steps[0] else {
        panic!("expected processor step");
    };
    assert_eq!(
        step.action,
        ProcessorAction::Refund {
            charge_id: "ch_1".into(),
            amount: 1200,
            reason: "reversed".into(),
        }
    );
}

#[test]
fn test_reverse_rejections() {
    let rules = RuleCache::new();
    let card = value("gift-card", Some(500));
    let mut original = committed(&plan_debit(&debit(200, false), &card, &ctx(&rules)).unwrap());

    original.pending = true;
    assert!(matches!(
        plan_reverse(&chain("rev-1", &original), &original, None, &[card.clone()], &ctx(&rules)),
        Err(PlanError::TransactionPending(_))
    ));

    original.pending = false;
    original.next_transaction_id = Some(tx_id("rev-0"));
    assert!(matches!(
        plan_reverse(&chain("rev-1", &original), &original, None, &[card.clone()], &ctx(&rules)),
        Err(PlanError::AlreadyChained(_))
    ));

    original.next_transaction_id = None;
    original.transaction_type = TransactionType::Reverse;
    assert!(matches!(
        plan_reverse(&chain("rev-1", &original), &original, None, &[card], &ctx(&rules)),
        Err(PlanError::InvalidChain { .. })
    ));
}

#[test]
fn test_void_and_capture_require_pending() {
    let rules = RuleCache::new();
    let card = value("gift-card", Some(500));
    let mut request = debit(200, false);
    request.pending = true;
    let pending = committed(&plan_debit(&request, &card, &ctx(&rules)).unwrap());

    let void = plan_void(&chain("void-1", &pending), &pending, &[card.clone()], &ctx(&rules)).unwrap();
    assert_eq!(void.transaction_type, TransactionType::Void);
    assert_eq!(void.ledger_steps().next().unwrap().amount, 200);

    let capture = plan_capture(&chain("cap-1", &pending), &pending, &ctx(&rules)).unwrap();
    assert_eq!(capture.transaction_type, TransactionType::Capture);
    assert!(capture.steps.is_empty());

    let done = committed(&plan_debit(&debit(200, false), &card, &ctx(&rules)).unwrap());
    assert!(matches!(
        plan_void(&chain("void-2", &done), &done, &[card], &ctx(&rules)),
        Err(PlanError::TransactionNotPending(_))
    ));
    assert!(matches!(
        plan_capture(&chain("cap-2", &done), &done, &ctx(&rules)),
        Err(PlanError::TransactionNotPending(_))
    ));
}

#[test]
fn test_capture_captures_charges() {
    let rules = RuleCache::new();
    let mut request = checkout(
        vec![SourceRequest::Processor(ProcessorSource {
            source: "tok_visa".into(),
            max_amount: None,
        })],
        vec![line_item("p1", 900, None)],
    );
    request.pending = true;
    let pending = committed(&plan_checkout(&request, &[], &ctx(&rules)).unwrap());

    let plan = plan_capture(&chain("cap-1", &pending), &pending, &ctx(&rules)).unwrap();
    let PlanStep::Processor(step) = &plan.steps[0] else {
        panic!("expected processor step");
    };
    assert_eq!(
        step.action,
        ProcessorAction::Capture {
            charge_id: "ch_1".into(),
            amount: 900,
        }
    );
}
