//! Type Descriptors
//!
//! Runtime type information consumed by the hash and equality dispatchers.
//!
//! ## Design
//!
//! A [`TypeDescriptor`] is produced by the type-description boundary (the
//! compiler/loader in a full deployment, the [`TypeRegistry`] in tests and
//! embeddings), is immutable, and outlives every dynamic value of its type.
//! The dispatchers only ever consume descriptors; they never create or
//! mutate them.
//!
//! Type identity goes through [`same_type`] rather than address equality:
//! deployment configurations that duplicate descriptors (one per loaded
//! image) still compare as the same type through the provider-assigned
//! fingerprint.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use crate::seed::HashState;

/// Per-type hash function.
///
/// Receives the process-wide hash state, the resolved payload bytes, and the
/// (already perturbed) seed. Must be total over all bit patterns of valid
/// values of the type.
pub type HashFn = fn(&HashState, &[u8], usize) -> usize;

/// Per-type equality function over two resolved payloads.
///
/// Must be total over all bit patterns of valid values of the type.
pub type EqualFn = fn(&[u8], &[u8]) -> bool;

/// Metadata describing a concrete dynamic type.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    /// Human-readable type name, used in error messages.
    pub name: Arc<str>,
    /// Provider-assigned identity. Two descriptors describe the same type
    /// iff their fingerprints match; colliding fingerprints for distinct
    /// types are a provider bug.
    pub fingerprint: u32,
    /// Payload size in bytes. For variable-length indirect types this is 0
    /// and the boxed payload carries its own length; for direct types it is
    /// the number of significant bytes in the inline word.
    pub size: usize,
    /// Values are stored inline in a single machine word. A provider may set
    /// this only for types whose semantic equality is bitwise equality on a
    /// payload of at most word size; that rule is what legitimizes the
    /// dispatcher's word-compare fast path.
    pub direct: bool,
    /// Hash function, or `None` for an unhashable type.
    pub hash_fn: Option<HashFn>,
    /// Equality function, or `None` for an uncomparable type.
    pub equal_fn: Option<EqualFn>,
}

impl TypeDescriptor {
    /// Create a descriptor with no capabilities and indirect storage.
    pub fn new(name: impl Into<Arc<str>>, fingerprint: u32, size: usize) -> Self {
        Self {
            name: name.into(),
            fingerprint,
            size,
            direct: false,
            hash_fn: None,
            equal_fn: None,
        }
    }

    /// Mark values of this type as stored inline in a machine word.
    pub fn with_direct(mut self, direct: bool) -> Self {
        self.direct = direct;
        self
    }

    /// Set the hash function.
    pub fn with_hash_fn(mut self, hash_fn: HashFn) -> Self {
        self.hash_fn = Some(hash_fn);
        self
    }

    /// Set the equality function.
    pub fn with_equal_fn(mut self, equal_fn: EqualFn) -> Self {
        self.equal_fn = Some(equal_fn);
        self
    }

    /// Check whether values of this type can be hashed.
    pub fn is_hashable(&self) -> bool {
        self.hash_fn.is_some()
    }

    /// Check whether values of this type can be compared.
    pub fn is_comparable(&self) -> bool {
        self.equal_fn.is_some()
    }
}

/// Type identity predicate.
///
/// Pointer identity is only a fast path; the fingerprint decides. Never
/// compare descriptor addresses directly.
#[inline]
pub fn same_type(a: &Arc<TypeDescriptor>, b: &Arc<TypeDescriptor>) -> bool {
    Arc::ptr_eq(a, b) || a.fingerprint == b.fingerprint
}

// ============================================================================
// Type Registry - Global fingerprint → descriptor mapping
// ============================================================================

/// Global registry mapping type fingerprints to descriptors.
///
/// Stands in for the external descriptor provider in tests and embeddings.
/// Registration happens during start-up and module loading; lookups on the
/// dispatch path are read-only.
pub struct TypeRegistry {
    types: RwLock<HashMap<u32, Arc<TypeDescriptor>>>,
}

impl TypeRegistry {
    /// Create a new empty type registry.
    pub fn new() -> Self {
        Self {
            types: RwLock::new(HashMap::new()),
        }
    }

    /// Register a descriptor under its fingerprint.
    ///
    /// Re-registering a fingerprint replaces the previous descriptor.
    pub fn register(&self, desc: Arc<TypeDescriptor>) {
        tracing::trace!(name = %desc.name, fingerprint = desc.fingerprint, "type registered");
        self.types.write().insert(desc.fingerprint, desc);
    }

    /// Look up a descriptor by fingerprint.
    pub fn lookup(&self, fingerprint: u32) -> Option<Arc<TypeDescriptor>> {
        self.types.read().get(&fingerprint).cloned()
    }

    /// Check if a fingerprint is registered.
    pub fn contains(&self, fingerprint: u32) -> bool {
        self.types.read().contains_key(&fingerprint)
    }

    /// Get the number of registered types.
    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.types.read().is_empty()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Global type registry.
static TYPE_REGISTRY: OnceLock<TypeRegistry> = OnceLock::new();

/// Get the global type registry.
pub fn type_registry() -> &'static TypeRegistry {
    TYPE_REGISTRY.get_or_init(TypeRegistry::new)
}

/// Register a descriptor in the global registry.
pub fn register_type(desc: Arc<TypeDescriptor>) {
    type_registry().register(desc);
}

/// Look up a descriptor in the global registry.
pub fn lookup_type(fingerprint: u32) -> Option<Arc<TypeDescriptor>> {
    type_registry().lookup(fingerprint)
}
