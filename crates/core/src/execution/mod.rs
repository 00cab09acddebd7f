//! Plan execution.
//!
//! - `traits` - Storage and payment processor seams
//! - `executor` - Plan/commit retry loop
//! - `saga` - Coordination of processor calls with the ledger commit

pub mod error;
pub mod executor;
pub mod saga;
pub mod traits;


pub use error::{ExecutionError, ProcessorError};
pub use executor::{ExecuteOptions, TransactionExecutor};
pub use traits::{CaptureRequest, ChargeRequest, LedgerStore, PaymentProcessor, RefundRequest};
