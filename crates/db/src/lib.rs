//! Database layer with `SeaORM` entities and repositories.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - The SQL implementation of the ledger store
//! - Snapshot loaders and the transaction service
//! - Database migrations

pub mod entities;
pub mod migration;
pub mod repositories;
pub mod service;

pub use repositories::{RepositoryError, SqlLedgerStore, TransactionRepository, ValueRepository};
pub use service::TransactionService;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use tessera_shared::config::DatabaseConfig;

/// Establishes a connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .sqlx_logging(false);
    Database::connect(options).await
}
