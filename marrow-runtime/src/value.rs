//! Dynamic Value Representations
//!
//! The two physical shapes a dynamically typed value can take, and the
//! normalized accessor the dispatchers consume.
//!
//! ## Design
//!
//! A dynamic value is a type descriptor (or a method table whose first field
//! is one) plus a single [`Slot`]. The slot is a tagged union: payloads of
//! direct types live inline in a word image, everything else lives behind a
//! shared allocation. Which arm a value uses is decided once, at
//! construction, by the descriptor's `direct` flag — dispatch code matches
//! on the tag and never reinterprets bits.
//!
//! [`Resolve`] is the seam between representations and dispatch: it yields
//! the descriptor and a payload byte view that already accounts for inline
//! vs. boxed storage, so nothing downstream branches on `direct` again. A
//! value whose descriptor/table is absent resolves to `None` — that, and
//! only that, is the nil dynamic value. A value with a descriptor but an
//! empty payload is not nil.

use std::sync::Arc;

use crate::typedesc::TypeDescriptor;

/// Size in bytes of one machine word slot.
pub const WORD_BYTES: usize = std::mem::size_of::<usize>();

/// Payload storage for one dynamic value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    /// Payload byte image stored directly in the word, zero-padded.
    Inline([u8; WORD_BYTES]),
    /// Payload stored out of line.
    Boxed(Arc<[u8]>),
}

impl Slot {
    /// Build the slot for a payload of the given type.
    ///
    /// Direct types land inline (the payload must fit the word); everything
    /// else is boxed.
    pub fn for_type(ty: &TypeDescriptor, payload: &[u8]) -> Self {
        if ty.direct {
            debug_assert!(
                payload.len() <= WORD_BYTES,
                "direct payload exceeds word size"
            );
            let mut word = [0u8; WORD_BYTES];
            let n = payload.len().min(WORD_BYTES);
            word[..n].copy_from_slice(&payload[..n]);
            Slot::Inline(word)
        } else {
            Slot::Boxed(Arc::from(payload))
        }
    }

    /// The payload bytes under the given descriptor.
    ///
    /// Inline words are truncated to the descriptor's size; boxed payloads
    /// carry their own length.
    pub fn payload<'a>(&'a self, ty: &TypeDescriptor) -> &'a [u8] {
        match self {
            Slot::Inline(word) => &word[..ty.size.min(WORD_BYTES)],
            Slot::Boxed(bytes) => bytes,
        }
    }

    /// An all-zero inline slot, used by nil values.
    pub(crate) const fn empty() -> Self {
        Slot::Inline([0u8; WORD_BYTES])
    }
}

/// A resolved view of a non-nil dynamic value: its descriptor and payload.
#[derive(Debug, Clone, Copy)]
pub struct Resolved<'a> {
    /// The value's type descriptor.
    pub ty: &'a Arc<TypeDescriptor>,
    /// Payload bytes, normalized across inline and boxed storage.
    pub data: &'a [u8],
}

/// Normalization seam between value representations and the dispatchers.
pub trait Resolve {
    /// Resolve to descriptor + payload, or `None` for the nil value.
    fn resolve(&self) -> Option<Resolved<'_>>;
}

// ============================================================================
// Valueless shape - descriptor + slot, no method table
// ============================================================================

/// A dynamic value carrying its type descriptor directly.
#[derive(Debug, Clone)]
pub struct AnyValue {
    ty: Option<Arc<TypeDescriptor>>,
    data: Slot,
}

impl AnyValue {
    /// The nil dynamic value: no descriptor, no payload.
    pub const fn nil() -> Self {
        Self {
            ty: None,
            data: Slot::empty(),
        }
    }

    /// Wrap a payload of the given type.
    pub fn new(ty: Arc<TypeDescriptor>, payload: &[u8]) -> Self {
        let data = Slot::for_type(&ty, payload);
        Self { ty: Some(ty), data }
    }

    /// Whether this is the nil value (descriptor absent).
    pub fn is_nil(&self) -> bool {
        self.ty.is_none()
    }

    /// The descriptor, if any.
    pub fn type_descriptor(&self) -> Option<&Arc<TypeDescriptor>> {
        self.ty.as_ref()
    }

    /// The underlying slot.
    pub fn slot(&self) -> &Slot {
        &self.data
    }
}

impl Resolve for AnyValue {
    fn resolve(&self) -> Option<Resolved<'_>> {
        let ty = self.ty.as_ref()?;
        Some(Resolved {
            ty,
            data: self.data.payload(ty),
        })
    }
}

// ============================================================================
// Method-table shape - capability binding + slot
// ============================================================================

/// A capability method invoked through a method table.
pub type MethodFn = fn(&AnyValue) -> AnyValue;

/// Per-(type, capability-set) binding.
///
/// The concrete type's descriptor is the table's first field by contract;
/// the dispatchers read nothing else from the table.
#[derive(Debug, Clone)]
pub struct MethodTable {
    /// Descriptor for the concrete type bound to this table.
    pub ty: Arc<TypeDescriptor>,
    /// Capability entries, in declaration order of the binding interface.
    pub methods: Box<[MethodFn]>,
}

impl MethodTable {
    /// Bind a type to a capability set.
    pub fn new(ty: Arc<TypeDescriptor>, methods: Vec<MethodFn>) -> Self {
        Self {
            ty,
            methods: methods.into_boxed_slice(),
        }
    }

    /// Get a capability entry by index.
    pub fn method(&self, index: usize) -> Option<MethodFn> {
        self.methods.get(index).copied()
    }
}

/// A dynamic value bound to a capability set through a method table.
#[derive(Debug, Clone)]
pub struct IfaceValue {
    table: Option<Arc<MethodTable>>,
    data: Slot,
}

impl IfaceValue {
    /// The nil interface value: no table, no payload.
    pub const fn nil() -> Self {
        Self {
            table: None,
            data: Slot::empty(),
        }
    }

    /// Wrap a payload of the table's bound type.
    pub fn new(table: Arc<MethodTable>, payload: &[u8]) -> Self {
        let data = Slot::for_type(&table.ty, payload);
        Self {
            table: Some(table),
            data,
        }
    }

    /// Whether this is the nil interface (table absent).
    pub fn is_nil(&self) -> bool {
        self.table.is_none()
    }

    /// The method table, if any.
    pub fn method_table(&self) -> Option<&Arc<MethodTable>> {
        self.table.as_ref()
    }

    /// The underlying slot.
    pub fn slot(&self) -> &Slot {
        &self.data
    }

    /// View as a valueless dynamic value, dropping the capability binding.
    ///
    /// The descriptor and slot are kept, so hashing and equality are
    /// unaffected by the conversion.
    pub fn erase(&self) -> AnyValue {
        match &self.table {
            Some(table) => AnyValue {
                ty: Some(table.ty.clone()),
                data: self.data.clone(),
            },
            None => AnyValue::nil(),
        }
    }
}

impl Resolve for IfaceValue {
    fn resolve(&self) -> Option<Resolved<'_>> {
        let table = self.table.as_ref()?;
        Some(Resolved {
            ty: &table.ty,
            data: self.data.payload(&table.ty),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strings::bytes_equal;

    fn direct_ty() -> Arc<TypeDescriptor> {
        Arc::new(
            TypeDescriptor::new("word", 9101, WORD_BYTES)
                .with_direct(true)
                .with_equal_fn(bytes_equal),
        )
    }

    fn boxed_ty() -> Arc<TypeDescriptor> {
        Arc::new(TypeDescriptor::new("blob", 9102, 0).with_equal_fn(bytes_equal))
    }

    #[test]
    fn test_slot_tag_follows_descriptor() {
        let payload = 0xABusize.to_ne_bytes();
        assert!(matches!(
            Slot::for_type(&direct_ty(), &payload),
            Slot::Inline(_)
        ));
        assert!(matches!(
            Slot::for_type(&boxed_ty(), &payload),
            Slot::Boxed(_)
        ));
    }

    #[test]
    fn test_inline_payload_truncates_to_size() {
        let ty = Arc::new(
            TypeDescriptor::new("byte", 9103, 1)
                .with_direct(true)
                .with_equal_fn(bytes_equal),
        );
        let v = AnyValue::new(ty, &[0x7F]);
        let resolved = v.resolve().unwrap();
        assert_eq!(resolved.data, &[0x7F]);
    }

    #[test]
    fn test_boxed_payload_keeps_length() {
        let v = AnyValue::new(boxed_ty(), b"variable length payload");
        let resolved = v.resolve().unwrap();
        assert_eq!(resolved.data, b"variable length payload");
    }

    #[test]
    fn test_nil_resolves_to_none() {
        assert!(AnyValue::nil().resolve().is_none());
        assert!(IfaceValue::nil().resolve().is_none());
        assert!(AnyValue::nil().is_nil());
        assert!(IfaceValue::nil().is_nil());
    }

    #[test]
    fn test_empty_payload_is_not_nil() {
        let v = AnyValue::new(boxed_ty(), &[]);
        assert!(!v.is_nil());
        let resolved = v.resolve().unwrap();
        assert!(resolved.data.is_empty());
    }

    #[test]
    fn test_iface_resolves_through_table() {
        let table = Arc::new(MethodTable::new(direct_ty(), Vec::new()));
        let payload = 42usize.to_ne_bytes();
        let v = IfaceValue::new(table, &payload);
        let resolved = v.resolve().unwrap();
        assert_eq!(resolved.ty.fingerprint, 9101);
        assert_eq!(resolved.data, &payload);
    }

    #[test]
    fn test_erase_keeps_descriptor_and_slot() {
        let table = Arc::new(MethodTable::new(direct_ty(), Vec::new()));
        let payload = 7usize.to_ne_bytes();
        let iface = IfaceValue::new(table, &payload);
        let erased = iface.erase();
        let a = iface.resolve().unwrap();
        let b = erased.resolve().unwrap();
        assert!(crate::typedesc::same_type(a.ty, b.ty));
        assert_eq!(a.data, b.data);
        assert!(IfaceValue::nil().erase().is_nil());
    }

    #[test]
    fn test_method_lookup() {
        fn identity(v: &AnyValue) -> AnyValue {
            v.clone()
        }
        let table = MethodTable::new(direct_ty(), vec![identity as MethodFn]);
        assert!(table.method(0).is_some());
        assert!(table.method(1).is_none());

        let payload = 3usize.to_ne_bytes();
        let v = AnyValue::new(direct_ty(), &payload);
        let out = table.method(0).unwrap()(&v);
        assert_eq!(out.resolve().unwrap().data, v.resolve().unwrap().data);
    }
}
