use std::io;

use thiserror::Error;

/// Errors raised while validating a trial before any worker starts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The requested digest algorithm is not known.
    #[error("unknown algorithm: {name}")]
    UnknownAlgorithm {
        /// The name that failed to resolve.
        name: String,
    },
    /// At least one algorithm must be selected.
    #[error("no algorithm selected")]
    NoAlgorithms,
    /// Messages must contain at least one byte.
    #[error("message size must be at least one byte")]
    EmptyMessage,
    /// Shard counts drive a bit-shift partition and must be powers of two.
    #[error("shard count {shards} is not a power of two")]
    ShardsNotPowerOfTwo {
        /// The rejected shard count.
        shards: usize,
    },
    /// More shards than bytes would leave some shards without work at depth one.
    #[error("shard count {shards} exceeds the message size of {message_len} bytes")]
    TooManyShards {
        /// The rejected shard count.
        shards: usize,
        /// Length of the message being perturbed.
        message_len: usize,
    },
    /// The size sweep bounds are inverted.
    #[error("invalid size range: min shift {min_shift} is greater than max shift {max_shift}")]
    InvalidSizeRange {
        /// Lower log2 bound.
        min_shift: u32,
        /// Upper log2 bound (inclusive).
        max_shift: u32,
    },
    /// The size sweep would overflow the address space.
    #[error("message size 2^{shift} is too large")]
    SizeTooLarge {
        /// The offending log2 size.
        shift: u32,
    },
}

/// Errors emitted by the min-distance merge.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MergeError {
    /// Every shard was empty, so there is nothing to merge.
    #[error("cannot merge an empty digest set")]
    Empty,
    /// Digests of different widths cannot be compared numerically.
    #[error("digest width mismatch: expected {expected} bytes, found {found}")]
    WidthMismatch {
        /// Width of the first digest seen.
        expected: usize,
        /// Width of the offending digest.
        found: usize,
    },
    /// A shard's digests were not in ascending order.
    #[error("digests of shard {shard} are not sorted")]
    Unsorted {
        /// Index of the out-of-order shard.
        shard: usize,
    },
}

/// Errors that abort a trial or a sweep.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The trial configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The merge step rejected the shard results.
    #[error(transparent)]
    Merge(#[from] MergeError),
    /// A worker finished with a message that differs from its input.
    #[error("message corrupted in shard {shard} at offset {offset}")]
    MessageCorrupted {
        /// Index of the worker that detected the corruption.
        shard: usize,
        /// First byte offset that was not restored.
        offset: usize,
    },
    /// The operating system refused to start a worker thread.
    #[error("failed to spawn worker for shard {shard}: {source}")]
    Spawn {
        /// Index of the worker that could not start.
        shard: usize,
        /// Underlying error from the thread builder.
        #[source]
        source: io::Error,
    },
    /// A worker thread panicked or dropped its result.
    #[error("worker for shard {shard} did not deliver a result")]
    WorkerPanicked {
        /// Index of the failed worker.
        shard: usize,
    },
    /// The report sink failed to record a result.
    #[error("failed to report statistics: {0}")]
    Report(#[from] io::Error),
}
