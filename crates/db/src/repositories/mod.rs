//! Data access for values and transactions.
//!
//! `SqlLedgerStore` is the write path used by the executor; the repositories
//! are read-only lookups used while planning.

pub mod error;
pub mod ledger;
pub mod transaction;
pub mod value;

pub use error::RepositoryError;
pub use ledger::SqlLedgerStore;
pub use transaction::TransactionRepository;
pub use value::ValueRepository;
