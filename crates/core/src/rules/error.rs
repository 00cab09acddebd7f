//! Rule compilation errors.

use thiserror::Error;

/// Errors raised while compiling a rule.
///
/// Evaluation never fails: undefined fields and type mismatches degrade to
/// [`RuleValue::Undefined`](super::RuleValue::Undefined).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    /// The rule source is empty.
    #[error("Rule cannot be empty")]
    Empty,

    /// A character that is not part of the grammar.
    #[error("Unexpected character '{ch}' at position {position}")]
    UnexpectedCharacter {
        /// The offending character.
        ch: char,
        /// Byte offset in the source.
        position: usize,
    },

    /// A string literal without its closing quote.
    #[error("Unterminated string starting at position {0}")]
    UnterminatedString(usize),

    /// A numeric literal that does not fit a decimal.
    #[error("Invalid number literal: {0}")]
    InvalidNumber(String),

    /// A token in a position the grammar does not allow.
    #[error("Unexpected token '{found}' at position {position}")]
    UnexpectedToken {
        /// Text of the token.
        found: String,
        /// Byte offset in the source.
        position: usize,
    },

    /// The source ended in the middle of an expression.
    #[error("Unexpected end of rule")]
    UnexpectedEnd,

    /// The expression nests deeper than the parser allows.
    #[error("Rule nests deeper than {max} levels")]
    TooDeep {
        /// Maximum nesting depth.
        max: usize,
    },

    /// A call to a function the evaluator does not provide.
    #[error("Unknown function: {0}")]
    UnknownFunction(String),
}

impl RuleError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Empty => "RULE_EMPTY",
            Self::UnknownFunction(_) => "RULE_UNKNOWN_FUNCTION",
            Self::TooDeep { .. } => "RULE_TOO_DEEP",
            Self::UnexpectedCharacter { .. }
            | Self::UnterminatedString(_)
            | Self::InvalidNumber(_)
            | Self::UnexpectedToken { .. }
            | Self::UnexpectedEnd => "RULE_SYNTAX_ERROR",
        }
    }
}
