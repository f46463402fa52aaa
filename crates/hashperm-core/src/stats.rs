use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::merge::MinGap;

/// Outcome of one trial, handed to a [`ReportSink`](crate::ReportSink).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RunStatistics {
    /// Name of the digest function that produced the digests.
    pub algorithm: String,
    /// Length of the perturbed message in bytes.
    pub message_len: usize,
    /// Number of parallel shards the trial used.
    pub shards: usize,
    /// Total digests computed across all shards.
    pub permutations: usize,
    /// Width of each digest in bytes.
    pub digest_len: usize,
    /// Closest distance between two digests, as lowercase hex.
    #[serde(serialize_with = "serialize_gap")]
    pub min_gap: MinGap,
    /// Leading bits shared by the closest pair; `None` when only one digest exists.
    pub zero_bits: Option<u32>,
    /// Wall-clock time from trial start until the merge finished.
    #[serde(rename = "elapsed_secs", serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

impl RunStatistics {
    /// Whether the closest pair was an exact duplicate.
    ///
    /// ```
    /// # use std::time::Duration;
    /// # use hashperm_core::{merge::MinGap, RunStatistics};
    /// # use num_bigint::BigUint;
    /// let stats = RunStatistics {
    ///     algorithm: "highwayhash64".to_string(),
    ///     message_len: 1,
    ///     shards: 1,
    ///     permutations: 36,
    ///     digest_len: 8,
    ///     min_gap: MinGap::Gap(BigUint::from(0u8)),
    ///     zero_bits: Some(64),
    ///     elapsed: Duration::ZERO,
    /// };
    /// assert!(stats.has_collision());
    /// ```
    #[must_use]
    pub fn has_collision(&self) -> bool {
        self.min_gap.gap().is_some_and(|gap| gap.bits() == 0)
    }
}

fn serialize_gap<S: Serializer>(gap: &MinGap, serializer: S) -> Result<S::Ok, S::Error> {
    match gap.gap() {
        Some(value) => serializer.serialize_str(&value.to_str_radix(16)),
        None => serializer.serialize_none(),
    }
}

fn serialize_secs<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(elapsed.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigUint;

    #[test]
    fn serializes_gap_as_hex_and_elapsed_as_seconds() {
        let stats = RunStatistics {
            algorithm: "blake2b-256".to_string(),
            message_len: 256,
            shards: 4,
            permutations: 9216,
            digest_len: 32,
            min_gap: MinGap::Gap(BigUint::from(0xabcu32)),
            zero_bits: Some(244),
            elapsed: Duration::from_millis(1500),
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["algorithm"], "blake2b-256");
        assert_eq!(json["min_gap"], "abc");
        assert_eq!(json["zero_bits"], 244);
        assert_eq!(json["elapsed_secs"], 1.5);
        assert!(!stats.has_collision());
    }

    #[test]
    fn not_applicable_serializes_as_null() {
        let stats = RunStatistics {
            algorithm: "poly1305".to_string(),
            message_len: 1,
            shards: 1,
            permutations: 1,
            digest_len: 16,
            min_gap: MinGap::NotApplicable,
            zero_bits: None,
            elapsed: Duration::ZERO,
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert!(json["min_gap"].is_null());
        assert!(json["zero_bits"].is_null());
    }
}
