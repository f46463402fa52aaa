//! Streaming k-way merge that finds the closest pair of digests.
//!
//! Each shard's digests are already sorted, so the globally sorted order can
//! be produced lazily with a min-heap holding one cursor per shard. Only the
//! previous digest and the running minimum gap are retained.
//!
//! ```
//! use hashperm_core::merge::{min_gap, MinGap};
//! use num_bigint::BigUint;
//!
//! let shards = vec![vec![vec![3u8], vec![7], vec![20]], vec![vec![5u8], vec![9], vec![21]]];
//! assert_eq!(min_gap(&shards)?, MinGap::Gap(BigUint::from(1u8)));
//! # Ok::<(), hashperm_core::MergeError>(())
//! ```

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use num_bigint::BigUint;

use crate::{Digest, MergeError};

/// Smallest distance between two adjacent digests in sorted order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MinGap {
    /// The numeric difference of the closest pair; zero for duplicates.
    Gap(BigUint),
    /// Only one digest was produced, so no pair exists.
    NotApplicable,
}

impl MinGap {
    /// The gap, when one is defined.
    #[must_use]
    pub fn gap(&self) -> Option<&BigUint> {
        match self {
            MinGap::Gap(gap) => Some(gap),
            MinGap::NotApplicable => None,
        }
    }

    /// Leading bits shared by the closest pair of `digest_len`-byte digests.
    #[must_use]
    pub fn zero_bits(&self, digest_len: usize) -> Option<u32> {
        self.gap().map(|gap| zero_bits(digest_len, gap))
    }
}

/// `8 * digest_len - bit_length(gap)`.
///
/// A zero gap has bit length zero, so identical digests report the full
/// digest width.
///
/// ```
/// # use hashperm_core::zero_bits;
/// # use num_bigint::BigUint;
/// assert_eq!(zero_bits(16, &BigUint::from(1u8)), 127);
/// assert_eq!(zero_bits(16, &BigUint::from(0x80u8)), 120);
/// assert_eq!(zero_bits(8, &BigUint::from(0u8)), 64);
/// ```
#[must_use]
pub fn zero_bits(digest_len: usize, gap: &BigUint) -> u32 {
    let width = 8 * digest_len as u64;
    width.saturating_sub(gap.bits()) as u32
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct HeapEntry<'a> {
    digest: &'a [u8],
    shard: usize,
    next: usize,
}

/// Computes the minimum adjacent gap across individually sorted shards.
///
/// Fails with [`MergeError::Empty`] when no shard holds a digest, with
/// [`MergeError::WidthMismatch`] when digest widths differ and with
/// [`MergeError::Unsorted`] when a shard is out of order. Working memory is
/// one heap entry per shard.
pub fn min_gap<S>(shards: &[S]) -> Result<MinGap, MergeError>
where
    S: AsRef<[Digest]>,
{
    if shards.iter().all(|shard| shard.as_ref().is_empty()) {
        return Err(MergeError::Empty);
    }

    let mut heap = BinaryHeap::with_capacity(shards.len());
    for (shard, digests) in shards.iter().enumerate() {
        if let Some(first) = digests.as_ref().first() {
            heap.push(Reverse(HeapEntry { digest: first, shard, next: 1 }));
        }
    }

    let mut width = None;
    let mut previous: Option<BigUint> = None;
    let mut smallest: Option<BigUint> = None;

    while let Some(Reverse(entry)) = heap.pop() {
        let expected = *width.get_or_insert(entry.digest.len());
        if entry.digest.len() != expected {
            return Err(MergeError::WidthMismatch { expected, found: entry.digest.len() });
        }

        let current = BigUint::from_bytes_be(entry.digest);
        if let Some(prev) = &previous {
            let gap = &current - prev;
            if smallest.as_ref().is_none_or(|min| gap < *min) {
                smallest = Some(gap);
            }
        }
        previous = Some(current);

        if let Some(digest) = shards[entry.shard].as_ref().get(entry.next) {
            // Popped digests must never decrease, or the subtraction above underflows.
            if digest.as_slice() < entry.digest {
                return Err(MergeError::Unsorted { shard: entry.shard });
            }
            heap.push(Reverse(HeapEntry { digest, shard: entry.shard, next: entry.next + 1 }));
        }
    }

    Ok(smallest.map_or(MinGap::NotApplicable, MinGap::Gap))
}
