//! Enumeration of message perturbations and their partition across shards.
//!
//! A perturbation XORs a mask into a single byte. Masks come in eight
//! depths: depth `m` uses a run of `9 - m` set bits rotated through `m`
//! positions, so depth 8 flips single bits and depth 1 inverts the whole
//! byte. For a message of `L` bytes, depth `m` owns the local index space
//! `[0, m * L)` and index `b` touches byte `b / m`. Every `(byte, mask)`
//! pair appears exactly once across all depths, `36 * L` in total.
//!
//! ```
//! use hashperm_core::perturb::{total_perturbations, Perturbations, Shard};
//!
//! let all: Vec<_> = Perturbations::new(4, Shard::single()).collect();
//! assert_eq!(all.len(), total_perturbations(4));
//! assert_eq!(all[0].byte_index, 0);
//! assert_eq!(all[0].mask, 0b0000_0001);
//! ```

use std::iter::FusedIterator;
use std::ops::Range;

/// Perturbation depths in enumeration order.
pub const DEPTHS: [usize; 8] = [8, 7, 6, 5, 4, 3, 2, 1];

/// Number of perturbations the full space holds for a message of `len` bytes.
///
/// ```
/// assert_eq!(hashperm_core::perturb::total_perturbations(256), 9216);
/// ```
#[must_use]
pub fn total_perturbations(len: usize) -> usize {
    DEPTHS.iter().map(|depth| depth * len).sum()
}

/// Mask toggled by depth-local index `b` at depth `depth`.
///
/// ```
/// # use hashperm_core::mask;
/// assert_eq!(mask(3, 8), 0b0000_1000);
/// assert_eq!(mask(5, 7), 0b0110_0000);
/// assert_eq!(mask(0, 1), 0xff);
/// ```
///
/// # Panics
///
/// Panics if `depth` is not one of [`DEPTHS`].
#[must_use]
pub fn mask(b: usize, depth: usize) -> u8 {
    assert!((1..=8).contains(&depth), "mask depth {depth} outside 1..=8");
    let width = 9 - depth;
    (((1u32 << width) - 1) << (b % depth)) as u8
}

/// Builds the deterministic message `byte[i] = i mod 256`.
///
/// ```
/// # use hashperm_core::reference_message;
/// let msg = reference_message(258);
/// assert_eq!(&msg[254..], &[254, 255, 0, 1]);
/// ```
#[must_use]
pub fn reference_message(len: usize) -> Vec<u8> {
    (0..len).map(|i| i as u8).collect()
}

/// A single XOR applied to one byte of the message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Perturbation {
    /// Offset of the byte being toggled.
    pub byte_index: usize,
    /// Bits toggled in that byte.
    pub mask: u8,
}

impl Perturbation {
    /// XORs the mask into the message. Applying twice restores the byte.
    ///
    /// ```
    /// # use hashperm_core::Perturbation;
    /// let mut msg = [0x0f, 0xf0];
    /// let p = Perturbation { byte_index: 1, mask: 0x81 };
    /// p.apply(&mut msg);
    /// assert_eq!(msg, [0x0f, 0x71]);
    /// p.apply(&mut msg);
    /// assert_eq!(msg, [0x0f, 0xf0]);
    /// ```
    pub fn apply(&self, message: &mut [u8]) {
        message[self.byte_index] ^= self.mask;
    }
}

/// One of `2^shift` contiguous partitions of each depth's index space.
///
/// ```
/// # use hashperm_core::Shard;
/// let shard = Shard::new(1, 2);
/// assert_eq!(shard.count(), 4);
/// assert_eq!(shard.depth_range(16, 8), 32..64);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Shard {
    index: usize,
    shift: u32,
}

impl Shard {
    /// Creates shard `index` of `2^shift`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not below `2^shift`.
    #[must_use]
    pub fn new(index: usize, shift: u32) -> Self {
        assert!(index < (1usize << shift), "shard index {index} out of range for shift {shift}");
        Self { index, shift }
    }

    /// The only shard of an unpartitioned run.
    #[must_use]
    pub fn single() -> Self {
        Self { index: 0, shift: 0 }
    }

    /// Every shard of a `2^shift` partition, in index order.
    pub fn all(shift: u32) -> impl Iterator<Item = Shard> {
        (0..1usize << shift).map(move |index| Shard { index, shift })
    }

    /// Position of this shard within its partition.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Log2 of the number of shards.
    #[must_use]
    pub fn shift(&self) -> u32 {
        self.shift
    }

    /// Number of shards in the partition.
    #[must_use]
    pub fn count(&self) -> usize {
        1 << self.shift
    }

    /// Depth-local indices owned by this shard for a message of `len` bytes.
    ///
    /// Neighbouring shards share their boundary, so the ranges tile
    /// `[0, depth * len)` exactly.
    #[must_use]
    pub fn depth_range(&self, len: usize, depth: usize) -> Range<usize> {
        let span = len * depth;
        let start = (span * self.index) >> self.shift;
        let end = (span * (self.index + 1)) >> self.shift;
        start..end
    }
}

/// Lazy, restartable sequence of the perturbations owned by one shard.
///
/// Walks depths from 8 down to 1 and, within each, the shard's contiguous
/// index range in ascending order.
#[derive(Clone, Debug)]
pub struct Perturbations {
    len: usize,
    shard: Shard,
    depth_pos: usize,
    current: Range<usize>,
}

impl Perturbations {
    /// Enumerates the perturbations `shard` owns for a message of `len` bytes.
    #[must_use]
    pub fn new(len: usize, shard: Shard) -> Self {
        Self { len, shard, depth_pos: 0, current: shard.depth_range(len, DEPTHS[0]) }
    }
}

impl Iterator for Perturbations {
    type Item = Perturbation;

    fn next(&mut self) -> Option<Perturbation> {
        loop {
            let depth = *DEPTHS.get(self.depth_pos)?;
            if let Some(b) = self.current.next() {
                return Some(Perturbation { byte_index: b / depth, mask: mask(b, depth) });
            }
            self.depth_pos += 1;
            if let Some(&next) = DEPTHS.get(self.depth_pos) {
                self.current = self.shard.depth_range(self.len, next);
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let later: usize = DEPTHS
            .iter()
            .skip(self.depth_pos + 1)
            .map(|&depth| self.shard.depth_range(self.len, depth).len())
            .sum();
        let remaining = if self.depth_pos < DEPTHS.len() { self.current.len() + later } else { 0 };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Perturbations {}

impl FusedIterator for Perturbations {}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn full_space_visits_every_pair_once() {
        for len in [1usize, 3, 16, 256] {
            let mut seen = HashSet::new();
            for p in Perturbations::new(len, Shard::single()) {
                assert!(p.byte_index < len);
                assert!(seen.insert(p), "duplicate {p:?} for len {len}");
            }
            assert_eq!(seen.len(), total_perturbations(len));
            for byte in 0..len {
                let masks = seen.iter().filter(|p| p.byte_index == byte).count();
                assert_eq!(masks, 36, "byte {byte} of {len}");
            }
        }
    }

    #[test]
    fn every_depth_covers_every_byte() {
        let len = 16;
        for depth in DEPTHS {
            let bytes: HashSet<usize> = (0..depth * len).map(|b| b / depth).collect();
            assert_eq!(bytes.len(), len, "depth {depth}");
        }
    }

    #[test]
    fn masks_have_depth_dependent_popcount() {
        for depth in DEPTHS {
            for b in 0..depth {
                assert_eq!(mask(b, depth).count_ones() as usize, 9 - depth);
            }
        }
    }

    #[test]
    #[should_panic(expected = "mask depth 0 outside 1..=8")]
    fn mask_rejects_depth_zero() {
        let _ = mask(3, 0);
    }

    #[test]
    #[should_panic(expected = "mask depth 10 outside 1..=8")]
    fn mask_rejects_depth_past_eight() {
        let _ = mask(3, 10);
    }

    #[test]
    fn partitions_tile_each_depth_without_gaps() {
        for len in [1usize, 16, 256] {
            for shift in 0..=3u32 {
                for depth in DEPTHS {
                    let mut cursor = 0;
                    for shard in Shard::all(shift) {
                        let range = shard.depth_range(len, depth);
                        assert_eq!(range.start, cursor, "len {len} shift {shift} depth {depth}");
                        cursor = range.end;
                    }
                    assert_eq!(cursor, depth * len);
                }
            }
        }
    }

    #[test]
    fn shards_together_enumerate_the_full_space() {
        let len = 16;
        let whole: Vec<_> = Perturbations::new(len, Shard::single()).collect();
        for shift in 1..=3u32 {
            let mut union: Vec<_> =
                Shard::all(shift).flat_map(|shard| Perturbations::new(len, shard)).collect();
            let mut expected = whole.clone();
            union.sort_by_key(|p| (p.byte_index, p.mask));
            expected.sort_by_key(|p| (p.byte_index, p.mask));
            assert_eq!(union, expected, "shift {shift}");
        }
    }

    #[test]
    fn enumerator_is_restartable() {
        let it = Perturbations::new(8, Shard::new(1, 1));
        let first: Vec<_> = it.clone().collect();
        let second: Vec<_> = it.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn len_is_exact_while_iterating() {
        let mut it = Perturbations::new(5, Shard::new(2, 2));
        let mut expected = it.clone().count();
        assert_eq!(it.len(), expected);
        while it.next().is_some() {
            expected -= 1;
            assert_eq!(it.len(), expected);
        }
        assert_eq!(it.next(), None);
    }

    proptest! {
        #[test]
        fn applying_twice_restores_the_byte(byte in any::<u8>(), b in 0usize..4096, depth_pos in 0usize..8) {
            let depth = DEPTHS[depth_pos];
            let mut message = [byte];
            let p = Perturbation { byte_index: 0, mask: mask(b, depth) };
            p.apply(&mut message);
            prop_assert_ne!(message[0], byte);
            p.apply(&mut message);
            prop_assert_eq!(message[0], byte);
        }
    }
}
