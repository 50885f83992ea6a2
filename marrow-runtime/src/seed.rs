//! Hash Seeding & Algorithm Selection
//!
//! Chooses the process-wide hash algorithm exactly once at start-up and
//! holds the seed material it needs.
//!
//! ## Design
//!
//! Two terminal states, decided by [`initialize_hashing`]:
//!
//! - **Hardware**: the CPU probe reports the block-mixer instruction set and
//!   a mixer implementation was injected. A key schedule of
//!   [`HASH_RANDOM_BYTES`] random bytes seeds the mixer.
//! - **Portable**: everything else. Four machine words of entropy become the
//!   keys of the multiplicative fallback; the low bit of each is forced to 1
//!   because the fallback's mixing steps are only invertible for odd keys.
//!
//! Seeding from entropy means hashes are not stable across processes; that
//! is the point — colliding keys cannot be precomputed. If the entropy
//! source fails there is no degraded path: initialization fails and the
//! process must not start.
//!
//! Completion of `initialize_hashing` must happen-before the first
//! dispatcher call (run it during single-threaded start-up). The installed
//! [`HashState`] is immutable afterwards, so no synchronization is needed on
//! the hot path.

use std::env;
use std::fmt;
use std::sync::{Arc, OnceLock};

use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;

use crate::portable::portable_hash;
use crate::value::WORD_BYTES;

/// Size in bytes of the hardware mixer's key schedule.
pub const HASH_RANDOM_BYTES: usize = WORD_BYTES / 4 * 64;

/// Environment variable forcing the portable algorithm.
const ENV_PORTABLE: &str = "MARROW_HASH_PORTABLE";

// ============================================================================
// Injected collaborators
// ============================================================================

/// CPU capability probe for the hardware block mixer.
pub trait CpuProbe: Send + Sync {
    /// Whether the host CPU has the instruction set the mixer needs.
    fn has_hash_acceleration(&self) -> bool;
}

/// Default probe: checks the x86 feature bits the mixer relies on, reports
/// `false` on every other architecture.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostProbe;

impl CpuProbe for HostProbe {
    fn has_hash_acceleration(&self) -> bool {
        host_has_acceleration()
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
fn host_has_acceleration() -> bool {
    is_x86_feature_detected!("aes")
        && is_x86_feature_detected!("ssse3")
        && is_x86_feature_detected!("sse4.1")
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
fn host_has_acceleration() -> bool {
    false
}

/// Failure of the random byte source.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct EntropyError(pub String);

/// Cryptographically strong random byte source.
pub trait EntropySource: Send + Sync {
    /// Fill `buf` entirely with random bytes.
    fn fill(&self, buf: &mut [u8]) -> Result<(), EntropyError>;
}

/// Default entropy source backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn fill(&self, buf: &mut [u8]) -> Result<(), EntropyError> {
        OsRng
            .try_fill_bytes(buf)
            .map_err(|e| EntropyError(e.to_string()))
    }
}

/// Hardware-accelerated block hash, consumed as an opaque primitive.
pub trait BlockMixer: Send + Sync {
    /// Mix `data` under `seed` with the process key schedule.
    fn mix(&self, data: &[u8], seed: usize, key_schedule: &[u8]) -> usize;
}

// ============================================================================
// Hash state
// ============================================================================

/// The algorithm chosen at initialization.
enum Algorithm {
    Hardware {
        key_schedule: [u8; HASH_RANDOM_BYTES],
        mixer: Arc<dyn BlockMixer>,
    },
    Portable {
        keys: [usize; 4],
    },
}

/// Process-wide hash algorithm and seed material.
///
/// Write-once: constructed by [`initialize_hashing`] (or directly, for
/// embeddings that manage their own seeds) and immutable afterwards.
pub struct HashState {
    algorithm: Algorithm,
}

impl HashState {
    /// Build a portable-algorithm state from four keys.
    ///
    /// The low bit of each key is forced to 1 (odd-key invariant).
    pub fn portable(keys: [usize; 4]) -> Self {
        let keys = [keys[0] | 1, keys[1] | 1, keys[2] | 1, keys[3] | 1];
        Self {
            algorithm: Algorithm::Portable { keys },
        }
    }

    /// Build a hardware-algorithm state from a key schedule and mixer.
    pub fn hardware(key_schedule: [u8; HASH_RANDOM_BYTES], mixer: Arc<dyn BlockMixer>) -> Self {
        Self {
            algorithm: Algorithm::Hardware {
                key_schedule,
                mixer,
            },
        }
    }

    /// Whether the hardware mixer was selected.
    pub fn uses_hardware_hash(&self) -> bool {
        matches!(self.algorithm, Algorithm::Hardware { .. })
    }

    /// Hash a byte payload under `seed` with the chosen algorithm.
    ///
    /// This is the routine per-type hash functions delegate byte hashing to.
    pub fn hash_bytes(&self, data: &[u8], seed: usize) -> usize {
        match &self.algorithm {
            Algorithm::Hardware {
                key_schedule,
                mixer,
            } => mixer.mix(data, seed, key_schedule),
            Algorithm::Portable { keys } => portable_hash(keys, data, seed),
        }
    }

    /// Hash a string's bytes under `seed`.
    #[inline]
    pub fn hash_string(&self, s: &str, seed: usize) -> usize {
        self.hash_bytes(s.as_bytes(), seed)
    }
}

impl fmt::Debug for HashState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let algorithm = match self.algorithm {
            Algorithm::Hardware { .. } => "hardware",
            Algorithm::Portable { .. } => "portable",
        };
        // Key material is not printed.
        f.debug_struct("HashState")
            .field("algorithm", &algorithm)
            .finish()
    }
}

// ============================================================================
// Initialization
// ============================================================================

/// Error during hash initialization. Fatal to process start.
#[derive(Debug, Error)]
pub enum InitError {
    /// The random byte source could not supply entropy.
    #[error("entropy source failed: {0}")]
    Entropy(#[from] EntropyError),
}

/// Collaborators and overrides for [`initialize_hashing`].
pub struct InitOptions {
    /// CPU capability probe.
    pub probe: Box<dyn CpuProbe>,
    /// Random byte source.
    pub entropy: Box<dyn EntropySource>,
    /// Hardware block mixer, if the embedding provides one.
    pub mixer: Option<Arc<dyn BlockMixer>>,
    /// Force the portable algorithm regardless of probe and mixer.
    pub force_portable: bool,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            probe: Box::new(HostProbe),
            entropy: Box::new(OsEntropy),
            mixer: None,
            force_portable: false,
        }
    }
}

impl InitOptions {
    /// Defaults plus environment overrides (`MARROW_HASH_PORTABLE`).
    pub fn from_env() -> Self {
        let mut options = Self::default();
        if let Ok(v) = env::var(ENV_PORTABLE) {
            options.force_portable = matches!(v.as_str(), "1" | "true" | "yes");
        }
        options
    }
}

/// Global hash state, populated once by [`initialize_hashing`].
static HASH_STATE: OnceLock<HashState> = OnceLock::new();

/// Choose and install the process-wide hash algorithm.
///
/// Must complete before the first dispatcher call. A second call does not
/// re-seed: the already installed state is returned unchanged.
///
/// # Errors
///
/// [`InitError::Entropy`] if the random source fails; seeding from a fixed
/// or zero key would defeat the flood resistance, so there is no fallback.
pub fn initialize_hashing(options: InitOptions) -> Result<&'static HashState, InitError> {
    if let Some(state) = HASH_STATE.get() {
        return Ok(state);
    }
    let state = build_state(options)?;
    Ok(HASH_STATE.get_or_init(|| state))
}

/// Get the installed hash state, if initialization has run.
pub fn hash_state() -> Option<&'static HashState> {
    HASH_STATE.get()
}

/// Build a state from options without touching the global.
pub(crate) fn build_state(options: InitOptions) -> Result<HashState, InitError> {
    let InitOptions {
        probe,
        entropy,
        mixer,
        force_portable,
    } = options;

    if !force_portable && probe.has_hash_acceleration() {
        if let Some(mixer) = mixer {
            let mut key_schedule = [0u8; HASH_RANDOM_BYTES];
            entropy.fill(&mut key_schedule)?;
            tracing::debug!(algorithm = "hardware", "hash algorithm initialized");
            return Ok(HashState::hardware(key_schedule, mixer));
        }
        tracing::debug!("hash acceleration present but no mixer injected");
    }

    let mut raw = [0u8; WORD_BYTES * 4];
    entropy.fill(&mut raw)?;
    let mut keys = [0usize; 4];
    for (key, chunk) in keys.iter_mut().zip(raw.chunks_exact(WORD_BYTES)) {
        let mut word = [0u8; WORD_BYTES];
        word.copy_from_slice(chunk);
        *key = usize::from_ne_bytes(word);
    }
    tracing::debug!(algorithm = "portable", "hash algorithm initialized");
    Ok(HashState::portable(keys))
}
