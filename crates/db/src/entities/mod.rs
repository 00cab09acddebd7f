//! `SeaORM` entities.
//!
//! Identifiers are stored as text. JSON documents (rules, metadata, line
//! items, totals) are stored as serialized text so the schema is identical on
//! PostgreSQL and SQLite.

pub mod internal_steps;
pub mod ledger_steps;
pub mod processor_steps;
pub mod transactions;
pub mod values;
