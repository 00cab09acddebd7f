//! Integration tests for the SQL ledger store: idempotency, guards, chains
//! and concurrent access.

mod common;

use chrono::Utc;
use futures::future::join_all;
use tessera_core::execution::{ExecutionError, LedgerStore};
use tessera_core::plan::{AttachRequest, ChainRequest, CreditRequest, DebitRequest, PlanContext, PlanError, plan_debit};
use tessera_core::rules::RuleCache;
use tessera_db::SqlLedgerStore;
use tessera_core::value::{CreateValueInput, GenericCodeOptions, PerContactOptions};
use tessera_shared::types::ContactId;

use common::{CREATED_BY, balance_of, create, gift_card, setup_service, tenant, tx_id, value_id};

fn debit(id: &str, value: &str, amount: i64) -> DebitRequest {
    DebitRequest {
        id: tx_id(id),
        value_id: value_id(value),
        currency: "USD".into(),
        amount: Some(amount),
        uses: None,
        allow_remainder: false,
        simulate: false,
        pending: false,
        metadata: None,
    }
}

fn chain(id: &str, previous: &str) -> ChainRequest {
    ChainRequest {
        id: tx_id(id),
        previous_transaction_id: tx_id(previous),
        simulate: false,
        metadata: None,
    }
}

#[tokio::test]
async fn test_create_value_records_initial_balance() {
    let (_db, service) = setup_service().await;
    create(&service, &gift_card("gc-1", 1000)).await;

    let transaction = service.get_transaction(&tenant(), &tx_id("gc-1")).await.unwrap();
    assert_eq!(transaction.transaction_type.as_str(), "initial_balance");
    let step = transaction.ledger_steps().next().unwrap();
    assert_eq!(step.balance_before, Some(0));
    assert_eq!(step.balance_after, Some(1000));
    assert_eq!(step.balance_change, Some(1000));
}

#[tokio::test]
async fn test_duplicate_value_id_is_rejected() {
    let (_db, service) = setup_service().await;
    create(&service, &gift_card("gc-1", 1000)).await;

    let result = service.create_value(&tenant(), &gift_card("gc-1", 50), CREATED_BY).await;
    assert_eq!(result.unwrap_err(), ExecutionError::TransactionExists(tx_id("gc-1")));
    assert_eq!(balance_of(&service, "gc-1").await, Some(1000));
}

#[tokio::test]
async fn test_duplicate_code_is_rejected() {
    let (_db, service) = setup_service().await;
    let first = CreateValueInput {
        code: Some("WELCOME".into()),
        ..gift_card("gc-1", 1000)
    };
    create(&service, &first).await;

    let second = CreateValueInput {
        code: Some("WELCOME".into()),
        ..gift_card("gc-2", 1000)
    };
    let result = service.create_value(&tenant(), &second, CREATED_BY).await;
    assert_eq!(result.unwrap_err(), ExecutionError::DuplicateCode("WELCOME".into()));

    // The whole storage transaction rolled back, header included
    let missing = service.get_transaction(&tenant(), &tx_id("gc-2")).await;
    assert!(matches!(
        missing,
        Err(ExecutionError::Plan(PlanError::TransactionNotFound(_)))
    ));
}

#[tokio::test]
async fn test_same_transaction_id_commits_once() {
    let (_db, service) = setup_service().await;
    create(&service, &gift_card("gc-1", 1000)).await;

    service.debit(&tenant(), &debit("debit-1", "gc-1", 100), CREATED_BY).await.unwrap();
    let replay = service.debit(&tenant(), &debit("debit-1", "gc-1", 100), CREATED_BY).await;

    assert_eq!(replay.unwrap_err(), ExecutionError::TransactionExists(tx_id("debit-1")));
    assert_eq!(balance_of(&service, "gc-1").await, Some(900));
}

#[tokio::test]
async fn test_debit_more_than_balance_writes_nothing() {
    let (_db, service) = setup_service().await;
    create(&service, &gift_card("gc-1", 1000)).await;

    let result = service.debit(&tenant(), &debit("debit-1", "gc-1", 1500), CREATED_BY).await;
    assert_eq!(
        result.unwrap_err(),
        ExecutionError::Plan(PlanError::InsufficientBalance {
            value_id: Some(value_id("gc-1")),
            requested: 1500,
            available: 1000,
        })
    );
    assert_eq!(balance_of(&service, "gc-1").await, Some(1000));
    assert!(service.get_transaction(&tenant(), &tx_id("debit-1")).await.is_err());
}

#[tokio::test]
async fn test_debit_with_remainder_takes_available() {
    let (_db, service) = setup_service().await;
    create(&service, &gift_card("gc-1", 1000)).await;

    let request = DebitRequest {
        allow_remainder: true,
        ..debit("debit-1", "gc-1", 1500)
    };
    let transaction = service.debit(&tenant(), &request, CREATED_BY).await.unwrap();

    assert_eq!(transaction.totals.unwrap().remainder, 500);
    let step = transaction.ledger_steps().next().unwrap();
    assert_eq!(step.balance_before, Some(1000));
    assert_eq!(step.balance_after, Some(0));
    assert_eq!(step.balance_change, Some(-1000));
    assert_eq!(balance_of(&service, "gc-1").await, Some(0));
}

#[tokio::test]
async fn test_simulated_debit_writes_nothing() {
    let (_db, service) = setup_service().await;
    create(&service, &gift_card("gc-1", 1000)).await;

    let request = DebitRequest {
        simulate: true,
        ..debit("debit-1", "gc-1", 400)
    };
    let transaction = service.debit(&tenant(), &request, CREATED_BY).await.unwrap();

    assert!(transaction.simulated);
    assert_eq!(transaction.ledger_steps().next().unwrap().balance_after, Some(600));
    assert_eq!(balance_of(&service, "gc-1").await, Some(1000));
    assert!(service.get_transaction(&tenant(), &tx_id("debit-1")).await.is_err());
}

#[tokio::test]
async fn test_frozen_value_cannot_be_debited() {
    let (_db, service) = setup_service().await;
    let frozen = CreateValueInput {
        frozen: true,
        ..gift_card("gc-1", 1000)
    };
    create(&service, &frozen).await;

    let result = service.debit(&tenant(), &debit("debit-1", "gc-1", 100), CREATED_BY).await;
    assert_eq!(
        result.unwrap_err(),
        ExecutionError::Plan(PlanError::ValueFrozen(value_id("gc-1")))
    );
}

#[tokio::test]
async fn test_concurrent_debits_never_overdraw() {
    let (_db, service) = setup_service().await;
    create(&service, &gift_card("gc-1", 1000)).await;

    let requests: Vec<DebitRequest> = (0..10).map(|i| debit(&format!("debit-{i}"), "gc-1", 300)).collect();
    let tenant = tenant();
    let results = join_all(
        requests
            .iter()
            .map(|request| service.debit(&tenant, request, CREATED_BY)),
    )
    .await;

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(succeeded, 3);
    for result in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(
            matches!(result, ExecutionError::Plan(PlanError::InsufficientBalance { .. })),
            "unexpected error: {result:?}"
        );
    }
    assert_eq!(balance_of(&service, "gc-1").await, Some(100));
}

#[tokio::test]
async fn test_stale_snapshot_commit_is_conflict() {
    let (db, service) = setup_service().await;
    create(&service, &gift_card("gc-1", 1000)).await;
    let stale = service.get_value(&tenant(), &value_id("gc-1")).await.unwrap();

    service.debit(&tenant(), &debit("debit-1", "gc-1", 800), CREATED_BY).await.unwrap();
    assert_eq!(balance_of(&service, "gc-1").await, Some(200));

    // Planned against the 1000 snapshot, so the pre-write check passes.
    let rules = RuleCache::new();
    let ctx = PlanContext::new(&rules, Utc::now(), CREATED_BY);
    let plan = plan_debit(&debit("debit-2", "gc-1", 500), &stale, &ctx).unwrap();

    let store = SqlLedgerStore::new(db);
    let Err(err) = store.commit(&tenant(), &[plan]).await else {
        panic!("stale commit should fail");
    };
    assert!(
        matches!(&err, ExecutionError::Conflict { value_id: id, .. } if id.as_str() == "gc-1"),
        "unexpected error: {err:?}"
    );
    assert!(err.is_replanable());

    assert_eq!(balance_of(&service, "gc-1").await, Some(200));
    assert_eq!(
        service.get_transaction(&tenant(), &tx_id("debit-2")).await.unwrap_err(),
        ExecutionError::Plan(PlanError::TransactionNotFound(tx_id("debit-2")))
    );
}

#[tokio::test]
async fn test_generic_code_attaches_once_per_contact() {
    let (_db, service) = setup_service().await;
    let generic = CreateValueInput {
        code: Some("SPRING".into()),
        is_generic_code: true,
        generic_code_options: Some(GenericCodeOptions {
            per_contact: Some(PerContactOptions {
                balance: Some(500),
                uses_remaining: None,
            }),
        }),
        ..gift_card("generic-1", 5000)
    };
    create(&service, &generic).await;

    let request = AttachRequest {
        value_id: value_id("generic-1"),
        contact_id: ContactId::parse("contact-1").unwrap(),
    };
    let tenant = tenant();
    let results = join_all((0..5).map(|_| service.attach(&tenant, &request, CREATED_BY))).await;

    let attached: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(attached.len(), 1);
    assert_eq!(attached[0].balance, Some(500));
    assert_eq!(attached[0].contact_id, Some(request.contact_id.clone()));
    assert_eq!(attached[0].attached_from_value_id, Some(value_id("generic-1")));
    for result in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(matches!(result, ExecutionError::AlreadyClaimed { .. }), "unexpected error: {result:?}");
    }
    assert_eq!(balance_of(&service, "generic-1").await, Some(4500));
}

#[tokio::test]
async fn test_repeat_attach_on_exhausted_code_is_already_claimed() {
    let (_db, service) = setup_service().await;
    let generic = CreateValueInput {
        is_generic_code: true,
        uses_remaining: Some(1),
        generic_code_options: Some(GenericCodeOptions {
            per_contact: Some(PerContactOptions {
                balance: Some(500),
                uses_remaining: Some(1),
            }),
        }),
        ..gift_card("generic-1", 500)
    };
    create(&service, &generic).await;

    let request = AttachRequest {
        value_id: value_id("generic-1"),
        contact_id: ContactId::parse("contact-1").unwrap(),
    };
    service.attach(&tenant(), &request, CREATED_BY).await.unwrap();
    assert_eq!(balance_of(&service, "generic-1").await, Some(0));

    let again = service.attach(&tenant(), &request, CREATED_BY).await;
    assert_eq!(
        again.unwrap_err(),
        ExecutionError::AlreadyClaimed {
            value_id: value_id("generic-1"),
            contact_id: request.contact_id.clone(),
        }
    );

    let other = AttachRequest {
        value_id: value_id("generic-1"),
        contact_id: ContactId::parse("contact-2").unwrap(),
    };
    let result = service.attach(&tenant(), &other, CREATED_BY).await;
    assert!(
        matches!(result, Err(ExecutionError::Plan(PlanError::InsufficientBalance { .. }))),
        "exhausted code should reject a new claimant"
    );
}

#[tokio::test]
async fn test_reverse_restores_balance_and_chains_once() {
    let (_db, service) = setup_service().await;
    create(&service, &gift_card("gc-1", 1000)).await;

    let credit = CreditRequest {
        id: tx_id("credit-1"),
        value_id: value_id("gc-1"),
        currency: "USD".into(),
        amount: Some(250),
        uses: None,
        simulate: false,
        metadata: None,
    };
    service.credit(&tenant(), &credit, CREATED_BY).await.unwrap();
    assert_eq!(balance_of(&service, "gc-1").await, Some(1250));

    let reverse = service.reverse(&tenant(), &chain("reverse-1", "credit-1"), CREATED_BY).await.unwrap();
    assert_eq!(reverse.previous_transaction_id, Some(tx_id("credit-1")));
    assert_eq!(reverse.root_transaction_id, tx_id("credit-1"));
    assert_eq!(balance_of(&service, "gc-1").await, Some(1000));

    let original = service.get_transaction(&tenant(), &tx_id("credit-1")).await.unwrap();
    assert_eq!(original.next_transaction_id, Some(tx_id("reverse-1")));

    let again = service.reverse(&tenant(), &chain("reverse-2", "credit-1"), CREATED_BY).await;
    assert_eq!(
        again.unwrap_err(),
        ExecutionError::Plan(PlanError::AlreadyChained(tx_id("credit-1")))
    );
    assert_eq!(balance_of(&service, "gc-1").await, Some(1000));
}

#[tokio::test]
async fn test_pending_debit_void_and_capture() {
    let (_db, service) = setup_service().await;
    create(&service, &gift_card("gc-1", 1000)).await;

    let pending = DebitRequest {
        pending: true,
        ..debit("debit-1", "gc-1", 300)
    };
    let transaction = service.debit(&tenant(), &pending, CREATED_BY).await.unwrap();
    assert!(transaction.pending);
    assert_eq!(balance_of(&service, "gc-1").await, Some(700));

    let reverse = service.reverse(&tenant(), &chain("reverse-1", "debit-1"), CREATED_BY).await;
    assert_eq!(
        reverse.unwrap_err(),
        ExecutionError::Plan(PlanError::TransactionPending(tx_id("debit-1")))
    );

    service.void(&tenant(), &chain("void-1", "debit-1"), CREATED_BY).await.unwrap();
    assert_eq!(balance_of(&service, "gc-1").await, Some(1000));

    let capture = service.capture(&tenant(), &chain("capture-1", "debit-1"), CREATED_BY).await;
    assert_eq!(
        capture.unwrap_err(),
        ExecutionError::Plan(PlanError::AlreadyChained(tx_id("debit-1")))
    );
}

#[tokio::test]
async fn test_capture_of_pending_debit_keeps_balance() {
    let (_db, service) = setup_service().await;
    create(&service, &gift_card("gc-1", 1000)).await;

    let pending = DebitRequest {
        pending: true,
        ..debit("debit-1", "gc-1", 300)
    };
    service.debit(&tenant(), &pending, CREATED_BY).await.unwrap();

    let capture = service.capture(&tenant(), &chain("capture-1", "debit-1"), CREATED_BY).await.unwrap();
    assert!(capture.steps.is_empty());
    assert_eq!(balance_of(&service, "gc-1").await, Some(700));

    // Reversing the capture undoes the captured debit
    service.reverse(&tenant(), &chain("reverse-1", "capture-1"), CREATED_BY).await.unwrap();
    assert_eq!(balance_of(&service, "gc-1").await, Some(1000));
}
