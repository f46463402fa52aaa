//! Core engine for measuring the diffusion of keyed and unkeyed hash functions.
//!
//! A message is perturbed at every byte with every mask of eight "depths",
//! each perturbed message is digested, and the minimum numeric distance
//! between any two digests is reported as a count of shared leading zero
//! bits. The perturbation space is split across power-of-two shards that run
//! in parallel, and the per-shard sorted digests are combined with a
//! streaming k-way merge.
//!
//! ```
//! use hashperm_core::{run_trial, Algorithm, Key};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let stats = run_trial(&Algorithm::HighwayHash64, &Key::reference(), 16, 2)?;
//!     assert_eq!(stats.permutations, 36 * 16);
//!     assert!(stats.zero_bits.unwrap() <= 64);
//!     Ok(())
//! }
//! ```
#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod digest;
mod error;
pub mod merge;
mod options;
pub mod perturb;
mod pipeline;
mod shard;
mod stats;

pub use digest::{Algorithm, Digest, DigestFunction, Key, KEY_LEN};
pub use error::{ConfigError, MergeError, PipelineError};
pub use merge::{min_gap, zero_bits, MinGap};
pub use options::{SizeRange, TrialOptions};
pub use perturb::{mask, reference_message, Perturbation, Perturbations, Shard, DEPTHS};
pub use pipeline::{auto_shard_count, run_trial, ReportSink, Sweep};
pub use shard::{run_shard, ShardResult};
pub use stats::RunStatistics;

/// Returns the semantic version of the `hashperm-core` crate.
///
/// ```
/// assert!(!hashperm_core::version().is_empty());
/// ```
#[must_use]
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
