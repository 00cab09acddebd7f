//! Committed transactions and their realized steps.

pub mod types;

pub use types::{
    InternalTransactionStep, LedgerTransactionStep, ProcessorTransactionStep, Transaction,
    TransactionStep,
};
