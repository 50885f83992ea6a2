//! # Marrow Runtime — Dynamic Value Hashing & Equality
//!
//! The Marrow runtime provides:
//!
//! - **Hash Dispatch**: seeded hashing of dynamically typed values through
//!   their type descriptors
//! - **Equality Dispatch**: pairwise comparison of dynamic values, including
//!   mixed representations
//! - **Seeded Algorithms**: per-process hash algorithm selection (hardware
//!   block mixer vs. portable fallback), seeded from OS entropy
//! - **String Primitives**: byte-wise equality and lexicographic comparison
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       MARROW RUNTIME                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐           │
//! │  │  Dispatchers │  │    Values    │  │  Descriptors │           │
//! │  │ (dispatch.rs)│  │  (value.rs)  │  │ (typedesc.rs)│           │
//! │  └──────────────┘  └──────────────┘  └──────────────┘           │
//! │         │                 │                 │                    │
//! │         └─────────────────┼─────────────────┘                    │
//! │                           │                                      │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐           │
//! │  │  Seed State  │  │   Fallback   │  │   Builtins   │           │
//! │  │  (seed.rs)   │  │(portable.rs) │  │ (builtins.rs)│           │
//! │  └──────────────┘  └──────────────┘  └──────────────┘           │
//! │                                                                  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Initialization
//!
//! `initialize_hashing` must complete before the first dispatcher call; it
//! runs during single-threaded process start-up and chooses the hash
//! algorithm exactly once. Everything it installs is read-only afterwards,
//! so the dispatchers take no locks and are safe to call from any number of
//! threads.
//!
//! ```rust,ignore
//! use marrow_runtime::{initialize_hashing, dynamic_hash, InitOptions, builtins};
//!
//! let state = initialize_hashing(InitOptions::from_env())?;
//! let v = builtins::uint64_value(42);
//! let h = dynamic_hash(state, &v, 0x1234)?;
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod builtins;
pub mod dispatch;
pub mod portable;
pub mod seed;
pub mod strings;
pub mod typedesc;
pub mod value;

// Re-exports
pub use dispatch::{dynamic_equal, dynamic_equal_to_typed, dynamic_hash, AlgError};
pub use seed::{
    hash_state, initialize_hashing, BlockMixer, CpuProbe, EntropyError, EntropySource, HashState,
    HostProbe, InitError, InitOptions, OsEntropy, HASH_RANDOM_BYTES,
};
pub use strings::{bytes_compare, bytes_equal, string_compare, string_equal};
pub use typedesc::{
    lookup_type, register_type, same_type, type_registry, EqualFn, HashFn, TypeDescriptor,
    TypeRegistry,
};
pub use value::{AnyValue, IfaceValue, MethodFn, MethodTable, Resolve, Resolved, Slot, WORD_BYTES};

/// Runtime version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
