//! Shared inputs for the `hashperm` benchmarks.
//!
//! Digest throughput is measured over one large payload, the same for every
//! algorithm, and trial latency over a handful of small message sizes.
//!
//! # Examples
//!
//! ```
//! let payload = hashperm_benches::payload();
//! assert_eq!(payload.len(), hashperm_benches::PAYLOAD_BYTES);
//! assert!(hashperm_benches::TRIAL_SIZES.iter().all(|size| size.is_power_of_two()));
//! ```
#![forbid(unsafe_code)]
#![warn(missing_docs)]

use hashperm_core::{reference_message, Sweep, TrialOptions};

/// Size of the payload digested by the throughput benchmarks (5 MiB).
pub const PAYLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Message sizes used by the end-to-end trial benchmarks.
pub const TRIAL_SIZES: [usize; 3] = [64, 256, 1024];

/// Builds the throughput payload.
///
/// Digest speed does not depend on content, so the reference message
/// pattern is reused instead of random bytes.
pub fn payload() -> Vec<u8> {
    reference_message(PAYLOAD_BYTES)
}

/// Shard count a default sweep would use for `message_len` bytes.
pub fn trial_shards(message_len: usize) -> usize {
    Sweep::new(&TrialOptions::default()).shards_for(message_len)
}
