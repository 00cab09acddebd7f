//! Deterministic ids for values attached from generic codes.
//!
//! The child id is a pure function of `(parent, claimant)`, so a second attach
//! by the same claimant resolves to the same transaction id and collides on
//! the header insert.

use sha2::{Digest, Sha256};
use tessera_shared::types::{ContactId, IdError, ValueId};

/// Derives the id of the value a claimant receives from a generic code:
/// `base64url(sha256("{parent}/{claimant}"))` without padding.
///
/// # Errors
///
/// Never fails in practice: the digest encodes to 43 URL-safe characters.
pub fn derive_attached_value_id(
    parent_id: &ValueId,
    claimant_id: &ContactId,
) -> Result<ValueId, IdError> {
    let mut hasher = Sha256::new();
    hasher.update(format!("{parent_id}/{claimant_id}").as_bytes());
    let digest = hasher.finalize();
    ValueId::parse(base64_url::encode(&digest))
}
