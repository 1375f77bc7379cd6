//! Search parameter fingerprints.
//!
//! A fingerprint is a SHA-256 digest over the identity fields of every
//! parameter registered for a resource type. Reindex orchestration compares
//! the fingerprint recorded when a type's index was built against the
//! current one; a difference means stored index entries may be stale.

use sha2::{Digest, Sha256};

use crate::definition::SearchParameterDefinition;

/// Computes the fingerprint of a set of parameters.
///
/// The result does not depend on iteration order. It changes whenever any
/// parameter's url, code, type, expression or component list changes.
/// Support flags and descriptions are not part of the fingerprint.
pub fn compute_hash<'a, I>(params: I) -> String
where
    I: IntoIterator<Item = &'a SearchParameterDefinition>,
{
    let mut params: Vec<&SearchParameterDefinition> = params.into_iter().collect();
    params.sort_by(|a, b| {
        a.url
            .cmp(&b.url)
            .then_with(|| a.code.cmp(&b.code))
            .then_with(|| a.expression.cmp(&b.expression))
    });

    let mut hasher = Sha256::new();
    for param in params {
        write_field(&mut hasher, param.url.as_deref());
        write_field(&mut hasher, Some(&param.code));
        write_field(&mut hasher, Some(param.param_type.as_str()));
        write_field(&mut hasher, param.expression.as_deref());

        hasher.update((param.component.len() as u64).to_be_bytes());
        for component in &param.component {
            write_field(&mut hasher, Some(&component.definition));
            write_field(&mut hasher, component.expression.as_deref());
        }
    }

    hex::encode(hasher.finalize())
}

/// Length-prefixed so that adjacent fields cannot run into each other.
fn write_field(hasher: &mut Sha256, value: Option<&str>) {
    match value {
        Some(value) => {
            hasher.update([1u8]);
            hasher.update((value.len() as u64).to_be_bytes());
            hasher.update(value.as_bytes());
        }
        None => hasher.update([0u8]),
    }
}
