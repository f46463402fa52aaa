use tracing::debug;

use crate::perturb::{Perturbations, Shard};
use crate::{Digest, DigestFunction, Key, PipelineError};

/// Sorted digests produced by one shard.
///
/// Sealed on construction: the digests can be read but not modified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShardResult {
    shard: usize,
    digests: Vec<Digest>,
}

impl ShardResult {
    /// Seals `digests` after sorting them in big-endian byte order.
    ///
    /// ```
    /// # use hashperm_core::ShardResult;
    /// let sealed = ShardResult::from_unsorted(0, vec![vec![9], vec![3], vec![5]]);
    /// assert_eq!(sealed.digests(), &[vec![3], vec![5], vec![9]]);
    /// ```
    #[must_use]
    pub fn from_unsorted(shard: usize, mut digests: Vec<Digest>) -> Self {
        digests.sort_unstable();
        Self { shard, digests }
    }

    /// Index of the shard that produced the digests.
    #[must_use]
    pub fn shard(&self) -> usize {
        self.shard
    }

    /// The sorted digests.
    #[must_use]
    pub fn digests(&self) -> &[Digest] {
        &self.digests
    }

    /// Number of digests held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.digests.len()
    }

    /// Whether the shard produced no digests.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }
}

impl AsRef<[Digest]> for ShardResult {
    fn as_ref(&self) -> &[Digest] {
        &self.digests
    }
}

/// Digests every perturbation `shard` owns and returns them sorted.
///
/// The worker takes ownership of its message copy, toggles each
/// perturbation in place, digests, and toggles it back. A buffer that is not
/// byte-identical to the input afterwards aborts with
/// [`PipelineError::MessageCorrupted`].
///
/// ```
/// # use hashperm_core::{run_shard, reference_message, Algorithm, Key, Shard};
/// let result = run_shard(reference_message(4), &Key::reference(), Shard::single(), &Algorithm::SipHash128)?;
/// assert_eq!(result.len(), 36 * 4);
/// assert!(result.digests().windows(2).all(|pair| pair[0] <= pair[1]));
/// # Ok::<(), hashperm_core::PipelineError>(())
/// ```
pub fn run_shard<D>(
    mut message: Vec<u8>,
    key: &Key,
    shard: Shard,
    digest: &D,
) -> Result<ShardResult, PipelineError>
where
    D: DigestFunction + ?Sized,
{
    let pristine = message.clone();
    let perturbations = Perturbations::new(message.len(), shard);
    let mut digests = Vec::with_capacity(perturbations.len());

    for perturbation in perturbations {
        perturbation.apply(&mut message);
        digests.push(digest.digest(&message, key));
        perturbation.apply(&mut message);
    }

    check_restored(shard.index(), &message, &pristine)?;

    debug!(shard = shard.index(), digests = digests.len(), "shard complete");
    Ok(ShardResult::from_unsorted(shard.index(), digests))
}

fn check_restored(shard: usize, message: &[u8], pristine: &[u8]) -> Result<(), PipelineError> {
    match message.iter().zip(pristine).position(|(now, was)| now != was) {
        Some(offset) => Err(PipelineError::MessageCorrupted { shard, offset }),
        None => Ok(()),
    }
}
