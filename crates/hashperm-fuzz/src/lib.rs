//! Fuzzing harnesses for the `hashperm` engine.
//!
//! Each harness decodes a small, bounded scenario from raw bytes and checks
//! an invariant of the enumerator, the merge, or a whole trial. Inputs that
//! run out of bytes are skipped; a violated invariant panics so the fuzzer
//! records it.
//!
//! # Examples
//!
//! ```
//! hashperm_fuzz::fuzz_enumerate(b"\x07\x02");
//! hashperm_fuzz::fuzz_merge(&[3, 2, 4, 9, 1, 5, 200, 17]);
//! hashperm_fuzz::fuzz_trial(b"trial");
//! ```
#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::collections::HashSet;

use arbitrary::Unstructured;
use hashperm_core::merge::{min_gap, MinGap};
use hashperm_core::perturb::total_perturbations;
use hashperm_core::{reference_message, run_trial, Algorithm, Digest, Key, Perturbations, Shard};
use num_bigint::BigUint;

const MAX_MESSAGE_LEN: u8 = 64;
const MAX_TRIAL_LEN: u8 = 12;
const MAX_SHIFT: u32 = 3;
const MAX_SHARDS: u8 = 6;
const MAX_SHARD_LEN: u8 = 16;
const MAX_WIDTH: u8 = 8;

/// Checks that the shards of a partition enumerate every perturbation once.
///
/// ```
/// hashperm_fuzz::fuzz_enumerate(&[40, 3]);
/// ```
pub fn fuzz_enumerate(data: &[u8]) {
    let mut unstructured = Unstructured::new(data);
    let Ok((len, shift)) = message_shape(&mut unstructured, MAX_MESSAGE_LEN) else {
        return;
    };

    let mut message = reference_message(len);
    let mut seen = HashSet::new();
    for shard in Shard::all(shift) {
        for perturbation in Perturbations::new(len, shard) {
            assert!(perturbation.byte_index < len, "{perturbation:?} outside {len} bytes");
            assert!(seen.insert(perturbation), "{perturbation:?} enumerated twice");
            perturbation.apply(&mut message);
            perturbation.apply(&mut message);
        }
    }
    assert_eq!(seen.len(), total_perturbations(len));
    assert_eq!(message, reference_message(len));
}

/// Compares the streaming merge against a full sort of random sorted shards.
///
/// ```
/// hashperm_fuzz::fuzz_merge(b"merge these bytes");
/// ```
pub fn fuzz_merge(data: &[u8]) {
    let mut unstructured = Unstructured::new(data);
    let Ok(shards) = random_shards(&mut unstructured) else {
        return;
    };

    let mut all: Vec<BigUint> =
        shards.iter().flatten().map(|digest| BigUint::from_bytes_be(digest)).collect();
    all.sort();
    let expected = all.windows(2).map(|pair| &pair[1] - &pair[0]).min();

    match (min_gap(&shards), expected) {
        (Ok(MinGap::Gap(gap)), Some(expected)) => assert_eq!(gap, expected),
        (Ok(MinGap::NotApplicable), None) => assert_eq!(all.len(), 1),
        (Err(_), None) => assert!(all.is_empty()),
        (outcome, expected) => panic!("merge returned {outcome:?}, full sort gave {expected:?}"),
    }
}

/// Runs a tiny trial sharded and unsharded and checks both agree.
///
/// ```
/// hashperm_fuzz::fuzz_trial(&[5, 1, 6]);
/// ```
pub fn fuzz_trial(data: &[u8]) {
    let mut unstructured = Unstructured::new(data);
    let Ok((len, shift)) = message_shape(&mut unstructured, MAX_TRIAL_LEN) else {
        return;
    };
    let Ok(algorithm) = unstructured.choose(&Algorithm::ALL) else {
        return;
    };

    let key = Key::reference();
    let single = run_trial(algorithm, &key, len, 1).expect("single shard trial");
    let sharded = run_trial(algorithm, &key, len, 1 << shift).expect("sharded trial");
    assert_eq!(single.permutations, total_perturbations(len));
    assert_eq!(single.permutations, sharded.permutations);
    assert_eq!(single.min_gap, sharded.min_gap);
}

fn message_shape(
    unstructured: &mut Unstructured<'_>,
    max_len: u8,
) -> Result<(usize, u32), arbitrary::Error> {
    let len = usize::from(unstructured.int_in_range::<u8>(1..=max_len)?);
    // Shards may not outnumber bytes.
    let max_shift = (usize::BITS - 1 - len.leading_zeros()).min(MAX_SHIFT);
    let shift = unstructured.int_in_range::<u32>(0..=max_shift)?;
    Ok((len, shift))
}

fn random_shards(
    unstructured: &mut Unstructured<'_>,
) -> Result<Vec<Vec<Digest>>, arbitrary::Error> {
    let width = usize::from(unstructured.int_in_range::<u8>(1..=MAX_WIDTH)?);
    let count = unstructured.int_in_range::<u8>(1..=MAX_SHARDS)?;
    let mut shards = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
        let len = unstructured.int_in_range::<u8>(0..=MAX_SHARD_LEN)?;
        let mut digests = Vec::with_capacity(usize::from(len));
        for _ in 0..len {
            let mut digest = vec![0u8; width];
            unstructured.fill_buffer(&mut digest)?;
            digests.push(digest);
        }
        digests.sort();
        shards.push(digests);
    }
    Ok(shards)
}
