//! Core business logic for Tessera.
//!
//! This crate contains the stored-value engine with ZERO database or HTTP
//! dependencies. Storage and the card processor are reached through the
//! traits in [`execution`].
//!
//! # Modules
//!
//! - `rules` - Rule evaluator for balance, redemption and liability rules
//! - `value` - Value model, validation and generic-code derivation
//! - `plan` - Pure transaction planners
//! - `transaction` - Committed transaction records
//! - `execution` - Retry loop, saga coordinator and storage/processor seams

pub mod execution;
pub mod plan;
pub mod rules;
pub mod transaction;
pub mod value;

#[cfg(test)]
pub(crate) mod test_support;
