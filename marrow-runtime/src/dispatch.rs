//! Hash & Equality Dispatch
//!
//! The run-time entry points for hashing a dynamic value and comparing two
//! of them, dispatching through the value's type descriptor.
//!
//! ## Design
//!
//! Both dispatchers start by resolving their operands through
//! [`Resolve`], so one generic function serves the valueless shape, the
//! method-table shape, and any mix of the two. Resolution yields payload
//! bytes that already account for inline vs. boxed storage; nothing here
//! branches on the storage mode except the direct-equality fast path, which
//! is a semantic rule (bitwise equality *is* equality for direct types),
//! not a storage branch.
//!
//! Hashing wraps the per-type hash in two fixed odd constants:
//! `C1 * hash_fn(data, seed ^ C0)`. The wrap decorrelates dynamic-value
//! hashes from naked payload hashes, so knowing the inner hash function is
//! not enough to engineer collisions against containers keyed by dynamic
//! values.
//!
//! Missing capabilities are surfaced as typed errors, not panics: a type
//! without a hash function is a distinguishable condition the caller turned
//! into a key, and it is reported with the type's name.

use std::sync::Arc;

use thiserror::Error;

use crate::seed::HashState;
use crate::typedesc::{same_type, TypeDescriptor};
use crate::value::{Resolve, Resolved};

/// Outer mixing constants, one pair per machine word width.
#[cfg(target_pointer_width = "64")]
pub(crate) const C0: usize = 33054211828000289;
#[cfg(target_pointer_width = "64")]
pub(crate) const C1: usize = 23344194077549503;
#[cfg(target_pointer_width = "32")]
pub(crate) const C0: usize = 2860486313;
#[cfg(target_pointer_width = "32")]
pub(crate) const C1: usize = 3267000013;

/// Dispatch failure: the value's type lacks the needed capability.
///
/// Both variants are programmer errors (using an inherently
/// non-hashable/non-comparable type as a key), surfaced immediately and
/// never part of normal control flow.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AlgError {
    /// The type has no hash function.
    #[error("hash of unhashable type {0}")]
    UnhashableType(String),
    /// The type has no equality function.
    #[error("comparing uncomparable type {0}")]
    UncomparableType(String),
}

/// Hash a dynamic value under `seed`.
///
/// The nil value hashes to the seed itself — a deliberate convention that
/// keeps nil keys hashable and stable. For a fixed seed and hash state the
/// result is a pure function of the value's bytes and type; it is *not*
/// stable across processes.
///
/// # Errors
///
/// [`AlgError::UnhashableType`] if the value's type has no hash function.
pub fn dynamic_hash<V>(state: &HashState, value: &V, seed: usize) -> Result<usize, AlgError>
where
    V: Resolve + ?Sized,
{
    let Some(Resolved { ty, data }) = value.resolve() else {
        return Ok(seed);
    };
    let Some(hash_fn) = ty.hash_fn else {
        return Err(AlgError::UnhashableType(ty.name.to_string()));
    };
    Ok(C1.wrapping_mul(hash_fn(state, data, seed ^ C0)))
}

/// Compare two dynamic values, of possibly differing representations.
///
/// Nil equals nil; nil never equals a non-nil value; values of different
/// types are never equal regardless of bit pattern. For a shared direct
/// type the inline payloads are compared bitwise; otherwise the type's
/// equality function decides.
///
/// # Errors
///
/// [`AlgError::UncomparableType`] if the shared (indirect) type has no
/// equality function.
pub fn dynamic_equal<A, B>(x: &A, y: &B) -> Result<bool, AlgError>
where
    A: Resolve + ?Sized,
    B: Resolve + ?Sized,
{
    let (rx, ry) = match (x.resolve(), y.resolve()) {
        (None, None) => return Ok(true),
        (None, Some(_)) | (Some(_), None) => return Ok(false),
        (Some(rx), Some(ry)) => (rx, ry),
    };
    if !same_type(rx.ty, ry.ty) {
        return Ok(false);
    }
    equal_payloads(rx.ty, rx.data, ry.data)
}

/// Compare a dynamic value against a statically-known type and raw payload.
///
/// Used when one side's type is already known to the caller, avoiding the
/// need to box the right-hand side. `data` must be the raw payload bytes of
/// a value of `ty`. A nil left-hand side is unequal to any typed payload.
///
/// # Errors
///
/// [`AlgError::UncomparableType`] if the shared (indirect) type has no
/// equality function.
pub fn dynamic_equal_to_typed<V>(
    x: &V,
    ty: &Arc<TypeDescriptor>,
    data: &[u8],
) -> Result<bool, AlgError>
where
    V: Resolve + ?Sized,
{
    let Some(rx) = x.resolve() else {
        return Ok(false);
    };
    if !same_type(rx.ty, ty) {
        return Ok(false);
    }
    equal_payloads(rx.ty, rx.data, data)
}

/// Shared tail of the equality dispatchers: both payloads are known to be
/// of type `ty`.
fn equal_payloads(ty: &Arc<TypeDescriptor>, a: &[u8], b: &[u8]) -> Result<bool, AlgError> {
    if ty.direct {
        // Inline payloads are byte images; for direct types bit equality is
        // semantic equality by the direct-storage rule.
        return Ok(a == b);
    }
    let Some(equal_fn) = ty.equal_fn else {
        return Err(AlgError::UncomparableType(ty.name.to_string()));
    };
    Ok(equal_fn(a, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strings::bytes_equal;
    use crate::value::{AnyValue, IfaceValue, MethodTable, WORD_BYTES};

    fn state() -> HashState {
        HashState::portable([11, 13, 17, 19])
    }

    fn byte_hash(state: &HashState, data: &[u8], seed: usize) -> usize {
        state.hash_bytes(data, seed)
    }

    fn word_ty(name: &str, fp: u32) -> Arc<TypeDescriptor> {
        Arc::new(
            TypeDescriptor::new(name, fp, WORD_BYTES)
                .with_direct(true)
                .with_hash_fn(byte_hash)
                .with_equal_fn(bytes_equal),
        )
    }

    fn blob_ty(name: &str, fp: u32) -> Arc<TypeDescriptor> {
        Arc::new(
            TypeDescriptor::new(name, fp, 0)
                .with_hash_fn(byte_hash)
                .with_equal_fn(bytes_equal),
        )
    }

    fn opaque_ty(name: &str, fp: u32) -> Arc<TypeDescriptor> {
        Arc::new(TypeDescriptor::new(name, fp, 0))
    }

    #[test]
    fn test_nil_hashes_to_seed() {
        let st = state();
        assert_eq!(dynamic_hash(&st, &AnyValue::nil(), 0xBEEF).unwrap(), 0xBEEF);
        assert_eq!(dynamic_hash(&st, &IfaceValue::nil(), 7).unwrap(), 7);
    }

    #[test]
    fn test_hash_differs_from_naked_payload_hash() {
        let st = state();
        let payload = 99usize.to_ne_bytes();
        let v = AnyValue::new(word_ty("word", 9201), &payload);
        let wrapped = dynamic_hash(&st, &v, 42).unwrap();
        let naked = st.hash_bytes(&payload, 42);
        assert_ne!(wrapped, naked);
    }

    #[test]
    fn test_unhashable_type_is_surfaced() {
        let st = state();
        let v = AnyValue::new(opaque_ty("closure", 9202), b"xyz");
        let err = dynamic_hash(&st, &v, 0).unwrap_err();
        assert_eq!(err, AlgError::UnhashableType("closure".into()));
        assert!(err.to_string().contains("closure"));
    }

    #[test]
    fn test_nil_equality_cases() {
        let payload = 1usize.to_ne_bytes();
        let v = AnyValue::new(word_ty("word", 9203), &payload);
        assert!(dynamic_equal(&AnyValue::nil(), &AnyValue::nil()).unwrap());
        assert!(dynamic_equal(&AnyValue::nil(), &IfaceValue::nil()).unwrap());
        assert!(!dynamic_equal(&AnyValue::nil(), &v).unwrap());
        assert!(!dynamic_equal(&v, &IfaceValue::nil()).unwrap());
    }

    #[test]
    fn test_type_mismatch_is_never_equal() {
        let payload = 5usize.to_ne_bytes();
        let a = AnyValue::new(word_ty("meters", 9204), &payload);
        let b = AnyValue::new(word_ty("seconds", 9205), &payload);
        assert!(!dynamic_equal(&a, &b).unwrap());
    }

    #[test]
    fn test_direct_equality_is_bitwise() {
        let ty = word_ty("word", 9206);
        let a = AnyValue::new(ty.clone(), &3usize.to_ne_bytes());
        let b = AnyValue::new(ty.clone(), &3usize.to_ne_bytes());
        let c = AnyValue::new(ty, &4usize.to_ne_bytes());
        assert!(dynamic_equal(&a, &b).unwrap());
        assert!(!dynamic_equal(&a, &c).unwrap());
    }

    #[test]
    fn test_indirect_equality_calls_equal_fn() {
        let ty = blob_ty("blob", 9207);
        let a = AnyValue::new(ty.clone(), b"same bytes");
        let b = AnyValue::new(ty.clone(), b"same bytes");
        let c = AnyValue::new(ty, b"other bytes");
        assert!(dynamic_equal(&a, &b).unwrap());
        assert!(!dynamic_equal(&a, &c).unwrap());
    }

    #[test]
    fn test_uncomparable_type_is_surfaced() {
        let ty = opaque_ty("handler", 9208);
        let a = AnyValue::new(ty.clone(), b"x");
        let b = AnyValue::new(ty, b"x");
        let err = dynamic_equal(&a, &b).unwrap_err();
        assert_eq!(err, AlgError::UncomparableType("handler".into()));
    }

    #[test]
    fn test_mixed_representation_equality() {
        let ty = word_ty("word", 9209);
        let table = Arc::new(MethodTable::new(ty.clone(), Vec::new()));
        let payload = 21usize.to_ne_bytes();
        let any = AnyValue::new(ty, &payload);
        let iface = IfaceValue::new(table.clone(), &payload);
        assert!(dynamic_equal(&any, &iface).unwrap());
        assert!(dynamic_equal(&iface, &any).unwrap());

        let other = IfaceValue::new(table, &22usize.to_ne_bytes());
        assert!(!dynamic_equal(&any, &other).unwrap());
    }

    #[test]
    fn test_equal_to_typed() {
        let ty = blob_ty("blob", 9210);
        let v = AnyValue::new(ty.clone(), b"payload");
        assert!(dynamic_equal_to_typed(&v, &ty, b"payload").unwrap());
        assert!(!dynamic_equal_to_typed(&v, &ty, b"other").unwrap());

        // Nil left-hand side short-circuits before any capability check.
        let opaque = opaque_ty("handler", 9211);
        assert!(!dynamic_equal_to_typed(&AnyValue::nil(), &opaque, b"x").unwrap());
        assert!(!dynamic_equal_to_typed(&IfaceValue::nil(), &ty, b"payload").unwrap());

        // Type mismatch short-circuits too.
        let other_ty = blob_ty("text", 9212);
        assert!(!dynamic_equal_to_typed(&v, &other_ty, b"payload").unwrap());
    }

    #[test]
    fn test_equal_to_typed_direct() {
        let ty = word_ty("word", 9213);
        let payload = 77usize.to_ne_bytes();
        let v = AnyValue::new(ty.clone(), &payload);
        assert!(dynamic_equal_to_typed(&v, &ty, &payload).unwrap());
        assert!(!dynamic_equal_to_typed(&v, &ty, &78usize.to_ne_bytes()).unwrap());
    }

    #[test]
    fn test_hash_deterministic_and_seed_sensitive() {
        let st = state();
        let v = AnyValue::new(blob_ty("blob", 9214), b"stable payload");
        let h1 = dynamic_hash(&st, &v, 1000).unwrap();
        let h2 = dynamic_hash(&st, &v, 1000).unwrap();
        let h3 = dynamic_hash(&st, &v, 1001).unwrap();
        assert_eq!(h1, h2);
        assert_ne!(h1, h3);
    }
}
