//! Typed IDs for type-safe entity references.
//!
//! Using typed IDs prevents accidentally passing a `ContactId` where a `ValueId` is expected.
//! Identifiers are caller-supplied strings (transaction ids double as idempotency keys),
//! so every wrapper validates on construction instead of wrapping a `Uuid`.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Maximum length of any identifier.
pub const MAX_ID_LENGTH: usize = 64;

/// Errors raised when parsing an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// The identifier is empty.
    #[error("Identifier cannot be empty")]
    Empty,

    /// The identifier exceeds [`MAX_ID_LENGTH`].
    #[error("Identifier is longer than {MAX_ID_LENGTH} characters")]
    TooLong,

    /// The identifier contains characters outside printable ASCII.
    #[error("Identifier contains invalid characters: {0}")]
    InvalidCharacters(String),
}

fn validate(raw: &str) -> Result<(), IdError> {
    if raw.is_empty() {
        return Err(IdError::Empty);
    }
    if raw.len() > MAX_ID_LENGTH {
        return Err(IdError::TooLong);
    }
    if !raw.chars().all(|c| c.is_ascii_graphic()) {
        return Err(IdError::InvalidCharacters(raw.to_string()));
    }
    Ok(())
}

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Parses and validates an identifier.
            ///
            /// # Errors
            ///
            /// Returns an error if the identifier is empty, too long, or not printable ASCII.
            pub fn parse(raw: impl Into<String>) -> Result<Self, IdError> {
                let raw = raw.into();
                validate(&raw)?;
                Ok(Self(raw))
            }

            /// Generates a new random ID using UUID v7 (time-ordered).
            #[must_use]
            pub fn generate() -> Self {
                Self(Uuid::now_v7().simple().to_string())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(raw: String) -> Result<Self, Self::Error> {
                Self::parse(raw)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }
    };
}

typed_id!(TenantId, "Identifier of the tenant that owns a row.");
typed_id!(ValueId, "Identifier of a stored value (gift card, credit, promotion).");
typed_id!(TransactionId, "Caller-supplied transaction identifier, also the idempotency key.");
typed_id!(ContactId, "Identifier of a contact (value owner or generic-code claimant).");
typed_id!(ProgramId, "Identifier of the program a value was issued from.");
