//! Rule evaluator for dynamic value logic.
//!
//! Values declare pricing and eligibility logic as small expressions
//! (`balance_rule`, `redemption_rule`, `discount_seller_liability_rule`).
//! This module implements:
//! - Tokenizing and parsing rule source into an AST
//! - Evaluation against a typed, read-only context
//! - A content-addressed cache of compiled rules

pub mod ast;
pub mod cache;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod parser;
pub mod value;

pub use cache::RuleCache;
pub use context::{RuleContext, ValueContext};
pub use error::RuleError;
pub use evaluator::CompiledRule;
pub use value::RuleValue;
