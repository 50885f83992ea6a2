//! Built-in Type Descriptors
//!
//! Ready-made descriptors for the primitive dynamic types, plus payload
//! helpers for wrapping Rust values. Each descriptor is created once and
//! registered in the global type registry on first use.
//!
//! Numeric payloads are little-endian byte images regardless of host
//! endianness, so fingerprints and payload bytes mean the same thing on
//! every platform.

use std::sync::{Arc, OnceLock};

use crate::dispatch::{C0, C1};
use crate::seed::HashState;
use crate::strings::bytes_equal;
use crate::typedesc::{register_type, TypeDescriptor};
use crate::value::{AnyValue, WORD_BYTES};

/// Fingerprints of the built-in types.
pub mod fingerprints {
    /// `uint64`.
    pub const UINT64: u32 = 1;
    /// `int64`.
    pub const INT64: u32 = 2;
    /// `bool`.
    pub const BOOL: u32 = 3;
    /// `float64`.
    pub const FLOAT64: u32 = 4;
    /// `string`.
    pub const STRING: u32 = 5;
}

// ============================================================================
// Per-type algorithm functions
// ============================================================================

/// Hash raw payload bytes with the process algorithm.
fn raw_bytes_hash(state: &HashState, data: &[u8], seed: usize) -> usize {
    state.hash_bytes(data, seed)
}

fn f64_from_payload(data: &[u8]) -> f64 {
    let mut buf = [0u8; 8];
    let n = data.len().min(8);
    buf[..n].copy_from_slice(&data[..n]);
    f64::from_le_bytes(buf)
}

/// IEEE 754 hash: all zeros share one hash, NaNs are scattered.
///
/// `+0.0` and `-0.0` compare equal, so they must hash equal; no NaN equals
/// any NaN, so giving each NaN occurrence a random hash keeps adversarial
/// NaN floods from piling into one container bucket.
fn float64_hash(state: &HashState, data: &[u8], seed: usize) -> usize {
    let value = f64_from_payload(data);
    if value == 0.0 {
        C1.wrapping_mul(C0 ^ seed)
    } else if value.is_nan() {
        C1.wrapping_mul(C0 ^ seed ^ rand::random::<u64>() as usize)
    } else {
        state.hash_bytes(data, seed)
    }
}

/// IEEE 754 equality over the payload bytes.
fn float64_equal(a: &[u8], b: &[u8]) -> bool {
    f64_from_payload(a) == f64_from_payload(b)
}

// ============================================================================
// Descriptors
// ============================================================================

fn cached(
    cell: &'static OnceLock<Arc<TypeDescriptor>>,
    build: fn() -> TypeDescriptor,
) -> Arc<TypeDescriptor> {
    cell.get_or_init(|| {
        let desc = Arc::new(build());
        register_type(desc.clone());
        desc
    })
    .clone()
}

/// Descriptor for `uint64`. Direct on word-64 targets.
pub fn uint64() -> Arc<TypeDescriptor> {
    static DESC: OnceLock<Arc<TypeDescriptor>> = OnceLock::new();
    cached(&DESC, || {
        TypeDescriptor::new("uint64", fingerprints::UINT64, 8)
            .with_direct(WORD_BYTES >= 8)
            .with_hash_fn(raw_bytes_hash)
            .with_equal_fn(bytes_equal)
    })
}

/// Descriptor for `int64`. Direct on word-64 targets.
pub fn int64() -> Arc<TypeDescriptor> {
    static DESC: OnceLock<Arc<TypeDescriptor>> = OnceLock::new();
    cached(&DESC, || {
        TypeDescriptor::new("int64", fingerprints::INT64, 8)
            .with_direct(WORD_BYTES >= 8)
            .with_hash_fn(raw_bytes_hash)
            .with_equal_fn(bytes_equal)
    })
}

/// Descriptor for `bool`. Always direct.
pub fn boolean() -> Arc<TypeDescriptor> {
    static DESC: OnceLock<Arc<TypeDescriptor>> = OnceLock::new();
    cached(&DESC, || {
        TypeDescriptor::new("bool", fingerprints::BOOL, 1)
            .with_direct(true)
            .with_hash_fn(raw_bytes_hash)
            .with_equal_fn(bytes_equal)
    })
}

/// Descriptor for `float64`.
///
/// Indirect even though the payload fits a word: IEEE equality is not
/// bitwise (`-0.0 == +0.0`, `NaN != NaN`), which the direct-storage rule
/// does not allow.
pub fn float64() -> Arc<TypeDescriptor> {
    static DESC: OnceLock<Arc<TypeDescriptor>> = OnceLock::new();
    cached(&DESC, || {
        TypeDescriptor::new("float64", fingerprints::FLOAT64, 8)
            .with_hash_fn(float64_hash)
            .with_equal_fn(float64_equal)
    })
}

/// Descriptor for `string`. Indirect, variable length.
pub fn string() -> Arc<TypeDescriptor> {
    static DESC: OnceLock<Arc<TypeDescriptor>> = OnceLock::new();
    cached(&DESC, || {
        TypeDescriptor::new("string", fingerprints::STRING, 0)
            .with_hash_fn(raw_bytes_hash)
            .with_equal_fn(bytes_equal)
    })
}

/// A descriptor with neither hash nor equality function, for types that are
/// inherently unhashable and uncomparable (closures, handlers). Not
/// registered; the caller owns the fingerprint.
pub fn opaque(name: impl Into<Arc<str>>, fingerprint: u32) -> Arc<TypeDescriptor> {
    Arc::new(TypeDescriptor::new(name, fingerprint, 0))
}

// ============================================================================
// Value helpers
// ============================================================================

/// Wrap a `u64` as a dynamic value.
pub fn uint64_value(v: u64) -> AnyValue {
    AnyValue::new(uint64(), &v.to_le_bytes())
}

/// Wrap an `i64` as a dynamic value.
pub fn int64_value(v: i64) -> AnyValue {
    AnyValue::new(int64(), &v.to_le_bytes())
}

/// Wrap a `bool` as a dynamic value.
pub fn bool_value(v: bool) -> AnyValue {
    AnyValue::new(boolean(), &[v as u8])
}

/// Wrap an `f64` as a dynamic value.
pub fn float64_value(v: f64) -> AnyValue {
    AnyValue::new(float64(), &v.to_le_bytes())
}

/// Wrap a string as a dynamic value.
pub fn string_value(v: &str) -> AnyValue {
    AnyValue::new(string(), v.as_bytes())
}
