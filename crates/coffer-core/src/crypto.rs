//! Frozen crypto and compression parameters shared by the pipeline stages.
//!
//! These mirror the module-level constants of the source implementation,
//! collapsed into a single `const` struct per the redesign note: no
//! configuration surface changes these at runtime, they are part of the
//! on-disk wire format.

/// The 4-byte magic that opens every encrypted envelope.
pub const MAGIC: [u8; 4] = *b"mob1";

/// Salt length in bytes (256 bits).
pub const SALT_LEN: usize = 32;

/// AES block size in bytes; also the IV length for OFB mode.
pub const IV_LEN: usize = 16;

/// PBKDF2-HMAC-SHA1 iteration count.
pub const PBKDF2_ITERATIONS: u32 = 20_000;

/// Derived key length in bytes (AES-256).
pub const KEY_LEN: usize = 32;

/// Default streaming buffer size for every pipeline stage (4 MiB).
pub const DEFAULT_BUFSIZE: usize = 4 * 1024 * 1024;

/// Default LZMA/xz compression level.
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 9;

/// The frozen envelope parameters, bundled for callers that want to pass
/// the whole set around instead of four separate constants.
#[derive(Debug, Clone, Copy)]
pub struct CryptoParams {
    pub salt_len: usize,
    pub iv_len: usize,
    pub pbkdf2_iterations: u32,
    pub key_len: usize,
    pub magic: [u8; 4],
}

impl CryptoParams {
    /// The single frozen parameter set used throughout the codebase.
    pub const DEFAULT: Self = Self {
        salt_len: SALT_LEN,
        iv_len: IV_LEN,
        pbkdf2_iterations: PBKDF2_ITERATIONS,
        key_len: KEY_LEN,
        magic: MAGIC,
    };
}

impl Default for CryptoParams {
    fn default() -> Self {
        Self::DEFAULT
    }
}
