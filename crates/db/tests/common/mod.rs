//! Shared setup for database integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tessera_core::rules::RuleCache;
use tessera_core::value::CreateValueInput;
use tessera_db::TransactionService;
use tessera_db::migration::{Migrator, MigratorTrait};
use tessera_shared::config::EngineConfig;
use tessera_shared::types::{TenantId, TransactionId, ValueId};

pub const CREATED_BY: &str = "integration-test";

/// Opens a fresh in-memory database with the schema applied.
///
/// A single pooled connection keeps every query on the same in-memory
/// database.
pub async fn setup_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(options)
        .await
        .expect("Failed to open in-memory database");
    Migrator::up(&db, None).await.expect("Failed to run migrations");
    db
}

pub async fn setup_service() -> (DatabaseConnection, TransactionService) {
    let db = setup_db().await;
    let service = TransactionService::new(db.clone(), Arc::new(RuleCache::new()), &EngineConfig::default());
    (db, service)
}

pub fn tenant() -> TenantId {
    TenantId::parse("tenant-test").unwrap()
}

pub fn value_id(id: &str) -> ValueId {
    ValueId::parse(id).unwrap()
}

pub fn tx_id(id: &str) -> TransactionId {
    TransactionId::parse(id).unwrap()
}

/// An active USD gift card with the given balance.
pub fn gift_card(id: &str, balance: i64) -> CreateValueInput {
    CreateValueInput {
        balance: Some(balance),
        ..CreateValueInput::new(value_id(id), "USD")
    }
}

pub async fn create(service: &TransactionService, input: &CreateValueInput) {
    service
        .create_value(&tenant(), input, CREATED_BY)
        .await
        .expect("Failed to create value");
}

pub async fn balance_of(service: &TransactionService, id: &str) -> Option<i64> {
    service
        .get_value(&tenant(), &value_id(id))
        .await
        .expect("Failed to load value")
        .balance
}
