//! Stored values: gift cards, account credits, promotions and generic codes.
//!
//! This module contains:
//! - The `Value` model and creation input
//! - Creation validation (including rule compilation)
//! - Deterministic id derivation for attached generic codes

pub mod attach;
pub mod error;
pub mod types;
pub mod validation;

pub use attach::derive_attached_value_id;
pub use error::ValueError;
pub use types::{CreateValueInput, GenericCodeOptions, PerContactOptions, Rule, Value};
pub use validation::{build_value, validate_create_value};
