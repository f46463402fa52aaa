use std::fmt;
use std::hash::Hasher as _;
use std::str::FromStr;

use blake2::digest::consts::U32;
use blake2::{Blake2b, Blake2b512};
use highway::{HighwayHash, HighwayHasher, Key as HighwayKey};
use poly1305::universal_hash::KeyInit;
use poly1305::Poly1305;
use siphasher::sip128::{Hasher128, SipHasher};

use crate::ConfigError;

/// Length in bytes of the key handed to keyed algorithms.
pub const KEY_LEN: usize = 32;

/// Output of a digest function, compared as a big-endian unsigned integer.
pub type Digest = Vec<u8>;

/// A 32-byte key shared read-only by every worker of a trial.
///
/// ```
/// # use hashperm_core::Key;
/// let key = Key::reference();
/// assert_eq!(key.as_bytes()[0], 255);
/// assert_eq!(key.as_bytes()[31], 224);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Key([u8; KEY_LEN]);

impl Key {
    /// Wraps raw key bytes.
    #[must_use]
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// The deterministic key used by every trial: `key[i] = 255 - i`.
    #[must_use]
    pub fn reference() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = 255 - i as u8;
        }
        Self(bytes)
    }

    /// Returns the raw key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    fn highway_words(&self) -> [u64; 4] {
        let mut words = [0u64; 4];
        for (word, chunk) in words.iter_mut().zip(self.0.chunks_exact(8)) {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(chunk);
            *word = u64::from_le_bytes(buf);
        }
        words
    }

    fn siphash_key(&self) -> [u8; 16] {
        let mut buf = [0u8; 16];
        buf.copy_from_slice(&self.0[..16]);
        buf
    }
}

impl Default for Key {
    fn default() -> Self {
        Self::reference()
    }
}

/// A keyed or unkeyed hash function producing fixed-width digests.
///
/// Unkeyed implementations ignore `key`, so both kinds share one call site.
/// Implementations are shared by reference across worker threads and must
/// not retain the message buffer.
pub trait DigestFunction: Sync {
    /// Name reported alongside the statistics of a trial.
    fn name(&self) -> &str;

    /// Digests `message`, using `key` when the function is keyed.
    fn digest(&self, message: &[u8], key: &Key) -> Digest;

    /// Width of every digest this function produces, in bytes.
    fn output_len(&self) -> usize;

    /// Whether the output depends on the key.
    fn is_keyed(&self) -> bool {
        true
    }
}

/// Hash algorithms that can be selected by name.
///
/// ```
/// # use hashperm_core::{Algorithm, DigestFunction};
/// let algo: Algorithm = "blake2b-256".parse()?;
/// assert_eq!(algo, Algorithm::Blake2b256);
/// assert_eq!(algo.output_len(), 32);
/// assert!(!algo.is_keyed());
/// # Ok::<(), hashperm_core::ConfigError>(())
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// Poly1305 one-time authenticator, 128-bit tag.
    Poly1305,
    /// BLAKE2b with a 512-bit output.
    Blake2b512,
    /// BLAKE2b with a 256-bit output.
    Blake2b256,
    /// SipHash-2-4 with a 128-bit output, keyed by the first 16 key bytes.
    SipHash128,
    /// HighwayHash with a 256-bit output.
    HighwayHash256,
    /// HighwayHash with a 128-bit output.
    HighwayHash128,
    /// HighwayHash with a 64-bit output.
    HighwayHash64,
}

impl Algorithm {
    /// Every supported algorithm, in listing order.
    pub const ALL: [Algorithm; 7] = [
        Algorithm::Poly1305,
        Algorithm::Blake2b512,
        Algorithm::Blake2b256,
        Algorithm::SipHash128,
        Algorithm::HighwayHash256,
        Algorithm::HighwayHash128,
        Algorithm::HighwayHash64,
    ];

    /// The name used to select this algorithm.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Algorithm::Poly1305 => "poly1305",
            Algorithm::Blake2b512 => "blake2b",
            Algorithm::Blake2b256 => "blake2b-256",
            Algorithm::SipHash128 => "siphash",
            Algorithm::HighwayHash256 => "highwayhash",
            Algorithm::HighwayHash128 => "highwayhash128",
            Algorithm::HighwayHash64 => "highwayhash64",
        }
    }
}

impl DigestFunction for Algorithm {
    fn name(&self) -> &str {
        self.as_str()
    }

    fn digest(&self, message: &[u8], key: &Key) -> Digest {
        match self {
            Algorithm::Poly1305 => {
                let mac = Poly1305::new(poly1305::Key::from_slice(key.as_bytes()));
                mac.compute_unpadded(message).as_slice().to_vec()
            }
            Algorithm::Blake2b512 => {
                <Blake2b512 as blake2::Digest>::digest(message).as_slice().to_vec()
            }
            Algorithm::Blake2b256 => {
                <Blake2b<U32> as blake2::Digest>::digest(message).as_slice().to_vec()
            }
            Algorithm::SipHash128 => {
                let mut hasher = SipHasher::new_with_key(&key.siphash_key());
                hasher.write(message);
                hasher.finish128().as_bytes().to_vec()
            }
            Algorithm::HighwayHash256 => words_to_bytes(&highway(message, key).finalize256()),
            Algorithm::HighwayHash128 => words_to_bytes(&highway(message, key).finalize128()),
            Algorithm::HighwayHash64 => highway(message, key).finalize64().to_le_bytes().to_vec(),
        }
    }

    fn output_len(&self) -> usize {
        match self {
            Algorithm::Blake2b512 => 64,
            Algorithm::Blake2b256 | Algorithm::HighwayHash256 => 32,
            Algorithm::Poly1305 | Algorithm::SipHash128 | Algorithm::HighwayHash128 => 16,
            Algorithm::HighwayHash64 => 8,
        }
    }

    fn is_keyed(&self) -> bool {
        !matches!(self, Algorithm::Blake2b512 | Algorithm::Blake2b256)
    }
}

fn highway(message: &[u8], key: &Key) -> HighwayHasher {
    let mut hasher = HighwayHasher::new(HighwayKey(key.highway_words()));
    hasher.append(message);
    hasher
}

fn words_to_bytes(words: &[u64]) -> Digest {
    words.iter().flat_map(|word| word.to_le_bytes()).collect()
}

impl FromStr for Algorithm {
    type Err = ConfigError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Algorithm::ALL
            .into_iter()
            .find(|algo| algo.as_str() == name)
            .ok_or_else(|| ConfigError::UnknownAlgorithm { name: name.to_string() })
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
