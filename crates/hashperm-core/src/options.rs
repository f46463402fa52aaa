use crate::{Algorithm, ConfigError};

const MAX_SHIFT: u32 = 40;

/// Inclusive range of log2 message sizes swept by a run.
///
/// ```
/// # use hashperm_core::SizeRange;
/// let range = SizeRange::new(8, 10)?;
/// assert_eq!(range.sizes().collect::<Vec<_>>(), vec![256, 512, 1024]);
/// # Ok::<(), hashperm_core::ConfigError>(())
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SizeRange {
    min_shift: u32,
    max_shift: u32,
}

impl Default for SizeRange {
    fn default() -> Self {
        Self { min_shift: 8, max_shift: 22 }
    }
}

impl SizeRange {
    /// Sizes `2^min_shift ..= 2^max_shift`.
    pub fn new(min_shift: u32, max_shift: u32) -> Result<Self, ConfigError> {
        if min_shift > max_shift {
            return Err(ConfigError::InvalidSizeRange { min_shift, max_shift });
        }
        if max_shift > MAX_SHIFT {
            return Err(ConfigError::SizeTooLarge { shift: max_shift });
        }
        Ok(Self { min_shift, max_shift })
    }

    /// Lower log2 bound.
    #[must_use]
    pub fn min_shift(&self) -> u32 {
        self.min_shift
    }

    /// Upper log2 bound, inclusive.
    #[must_use]
    pub fn max_shift(&self) -> u32 {
        self.max_shift
    }

    /// Message sizes in ascending order.
    pub fn sizes(&self) -> impl Iterator<Item = usize> {
        (self.min_shift..=self.max_shift).map(|shift| 1usize << shift)
    }
}

/// Configuration for a sweep of trials.
///
/// Every setter validates eagerly so an invalid configuration never reaches
/// the workers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrialOptions {
    algorithms: Vec<Algorithm>,
    sizes: Vec<usize>,
    shards: Option<usize>,
}

impl Default for TrialOptions {
    fn default() -> Self {
        Self {
            algorithms: vec![Algorithm::HighwayHash256, Algorithm::HighwayHash128],
            sizes: SizeRange::default().sizes().collect(),
            shards: None,
        }
    }
}

impl TrialOptions {
    /// Algorithms to measure, in order.
    #[must_use]
    pub fn algorithms(&self) -> &[Algorithm] {
        &self.algorithms
    }

    /// Message sizes to measure for each algorithm, in order.
    #[must_use]
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Explicit shard count, or `None` to derive it from the CPU count.
    #[must_use]
    pub fn shards(&self) -> Option<usize> {
        self.shards
    }

    /// Selects algorithms by name, dropping repeats.
    ///
    /// An empty list is rejected with [`ConfigError::NoAlgorithms`].
    ///
    /// ```
    /// # use hashperm_core::{Algorithm, TrialOptions};
    /// let opts = TrialOptions::default().with_algorithms(["siphash", "poly1305"])?;
    /// assert_eq!(opts.algorithms(), [Algorithm::SipHash128, Algorithm::Poly1305]);
    /// # Ok::<(), hashperm_core::ConfigError>(())
    /// ```
    pub fn with_algorithms<I, S>(mut self, names: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut algorithms = Vec::new();
        for name in names {
            let algorithm: Algorithm = name.as_ref().parse()?;
            if !algorithms.contains(&algorithm) {
                algorithms.push(algorithm);
            }
        }
        if algorithms.is_empty() {
            return Err(ConfigError::NoAlgorithms);
        }
        self.algorithms = algorithms;
        self.validate()?;
        Ok(self)
    }

    /// Sweeps the sizes of `range`.
    pub fn with_size_range(mut self, range: SizeRange) -> Result<Self, ConfigError> {
        self.sizes = range.sizes().collect();
        self.validate()?;
        Ok(self)
    }

    /// Measures exactly the given message sizes.
    ///
    /// ```
    /// # use hashperm_core::{ConfigError, TrialOptions};
    /// let err = TrialOptions::default().with_sizes([64, 0]).unwrap_err();
    /// assert_eq!(err, ConfigError::EmptyMessage);
    /// ```
    pub fn with_sizes<I>(mut self, sizes: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = usize>,
    {
        self.sizes = sizes.into_iter().collect();
        if self.sizes.is_empty() {
            return Err(ConfigError::EmptyMessage);
        }
        self.validate()?;
        Ok(self)
    }

    /// Pins the shard count instead of deriving it from the CPU count.
    ///
    /// ```
    /// # use hashperm_core::{ConfigError, TrialOptions};
    /// let opts = TrialOptions::default().with_shards(4)?;
    /// assert_eq!(opts.shards(), Some(4));
    /// assert_eq!(
    ///     TrialOptions::default().with_shards(3).unwrap_err(),
    ///     ConfigError::ShardsNotPowerOfTwo { shards: 3 },
    /// );
    /// # Ok::<(), ConfigError>(())
    /// ```
    pub fn with_shards(mut self, shards: usize) -> Result<Self, ConfigError> {
        self.shards = Some(shards);
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.sizes.contains(&0) {
            return Err(ConfigError::EmptyMessage);
        }
        if let Some(shards) = self.shards {
            if !shards.is_power_of_two() {
                return Err(ConfigError::ShardsNotPowerOfTwo { shards });
            }
            if let Some(&message_len) = self.sizes.iter().min() {
                if shards > message_len {
                    return Err(ConfigError::TooManyShards { shards, message_len });
                }
            }
        }
        Ok(())
    }
}
