//! Cache key derivation using SHA-256 hashes

use sha2::{Digest, Sha256};

use crate::filter::{FilterSet, FilterValue};

/// Derive a deterministic cache key from a context tag and a filter set.
///
/// The key is a SHA-256 hash over the context tag and the canonical filter
/// encoding: fields in canonical order, values sorted within each field.
/// Every component is length-prefixed before hashing, so a value containing
/// a separator-looking substring cannot collide with a differently-split
/// filter set. Equal filter sets hash identically regardless of how the
/// caller assembled them; the context tag separates otherwise-identical
/// filters cached for different reports.
pub fn cache_key(context: &str, filters: &FilterSet) -> String {
    let mut hasher = Sha256::new();

    update_component(&mut hasher, context.as_bytes());

    for (field, value) in filters.iter() {
        update_component(&mut hasher, field.column().as_bytes());
        match value {
            FilterValue::One(v) => {
                hasher.update([1u8]);
                update_component(&mut hasher, v.as_bytes());
            }
            FilterValue::AnyOf(values) => {
                hasher.update([2u8]);
                hasher.update((values.len() as u64).to_be_bytes());
                for v in values {
                    update_component(&mut hasher, v.as_bytes());
                }
            }
        }
    }

    format!("{:x}", hasher.finalize())
}

fn update_component(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_be_bytes());
    hasher.update(bytes);
}
