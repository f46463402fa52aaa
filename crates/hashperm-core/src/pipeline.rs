use std::io;
use std::thread;
use std::time::Instant;

use tracing::{debug, info};

use crate::merge::min_gap;
use crate::perturb::{reference_message, Shard};
use crate::shard::run_shard;
use crate::{
    ConfigError, DigestFunction, Key, PipelineError, RunStatistics, ShardResult, TrialOptions,
};

/// Consumer of per-trial statistics.
///
/// A sweep calls [`record`](ReportSink::record) as soon as each trial
/// finishes and [`finish`](ReportSink::finish) once at the end.
pub trait ReportSink {
    /// Records the statistics of one trial.
    fn record(&mut self, stats: &RunStatistics) -> io::Result<()>;

    /// Flushes anything buffered once the sweep is over.
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ReportSink for Vec<RunStatistics> {
    fn record(&mut self, stats: &RunStatistics) -> io::Result<()> {
        self.push(stats.clone());
        Ok(())
    }
}

/// Largest power of two not exceeding the number of logical CPUs.
///
/// ```
/// let shards = hashperm_core::auto_shard_count();
/// assert!(shards.is_power_of_two());
/// ```
#[must_use]
pub fn auto_shard_count() -> usize {
    prev_power_of_two(num_cpus::get())
}

fn prev_power_of_two(n: usize) -> usize {
    match n {
        0 => 1,
        n => 1 << (usize::BITS - 1 - n.leading_zeros()),
    }
}

/// Runs one trial: perturbs a `message_len`-byte reference message across
/// `shards` parallel workers and merges their sorted digests.
///
/// Each worker owns a copy of the message and hands its sealed result back
/// through its join handle. The merge starts only after every worker has
/// delivered.
///
/// ```
/// # use hashperm_core::{run_trial, Algorithm, Key};
/// let stats = run_trial(&Algorithm::Blake2b256, &Key::reference(), 8, 4)?;
/// assert_eq!(stats.permutations, 36 * 8);
/// assert_eq!(stats.shards, 4);
/// assert_eq!(stats.digest_len, 32);
/// # Ok::<(), hashperm_core::PipelineError>(())
/// ```
pub fn run_trial<D>(
    digest: &D,
    key: &Key,
    message_len: usize,
    shards: usize,
) -> Result<RunStatistics, PipelineError>
where
    D: DigestFunction + ?Sized,
{
    if message_len == 0 {
        return Err(ConfigError::EmptyMessage.into());
    }
    if !shards.is_power_of_two() {
        return Err(ConfigError::ShardsNotPowerOfTwo { shards }.into());
    }
    if shards > message_len {
        return Err(ConfigError::TooManyShards { shards, message_len }.into());
    }
    let shift = shards.trailing_zeros();

    let start = Instant::now();
    info!(algorithm = digest.name(), message_len, shards, "starting trial");

    let message = reference_message(message_len);
    let results = thread::scope(|scope| {
        let mut handles = Vec::with_capacity(shards);
        for shard in Shard::all(shift) {
            let copy = message.clone();
            let handle = thread::Builder::new()
                .name(format!("hashperm-shard-{}", shard.index()))
                .spawn_scoped(scope, move || run_shard(copy, key, shard, digest))
                .map_err(|source| PipelineError::Spawn { shard: shard.index(), source })?;
            handles.push((shard.index(), handle));
        }

        // Every handle is joined before the first error is returned.
        let joined: Vec<_> =
            handles.into_iter().map(|(index, handle)| (index, handle.join())).collect();
        joined
            .into_iter()
            .map(|(index, outcome)| {
                outcome.map_err(|_| PipelineError::WorkerPanicked { shard: index })?
            })
            .collect::<Result<Vec<ShardResult>, PipelineError>>()
    })?;
    debug!(shards = results.len(), "all shards delivered");

    let permutations = results.iter().map(ShardResult::len).sum();
    let digest_len =
        results.iter().find_map(|r| r.digests().first()).map_or(digest.output_len(), Vec::len);
    let gap = min_gap(&results)?;
    let zero_bits = gap.zero_bits(digest_len);
    let elapsed = start.elapsed();

    info!(
        algorithm = digest.name(),
        message_len,
        permutations,
        zero_bits = ?zero_bits,
        elapsed_ms = elapsed.as_millis() as u64,
        "trial finished"
    );

    Ok(RunStatistics {
        algorithm: digest.name().to_string(),
        message_len,
        shards,
        permutations,
        digest_len,
        min_gap: gap,
        zero_bits,
        elapsed,
    })
}

/// Runs every configured algorithm over every configured message size.
///
/// ```
/// # use hashperm_core::{RunStatistics, Sweep, TrialOptions};
/// let options = TrialOptions::default()
///     .with_algorithms(["highwayhash64"])?
///     .with_sizes([4, 8])?;
/// let mut report: Vec<RunStatistics> = Vec::new();
/// let trials = Sweep::new(&options).run(&mut report)?;
/// assert_eq!(trials, 2);
/// assert_eq!(report[1].message_len, 8);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Debug)]
pub struct Sweep<'a> {
    options: &'a TrialOptions,
    key: Key,
}

impl<'a> Sweep<'a> {
    /// Creates a sweep over `options` using the reference key.
    #[must_use]
    pub fn new(options: &'a TrialOptions) -> Self {
        Self { options, key: Key::reference() }
    }

    /// Replaces the key handed to keyed algorithms.
    #[must_use]
    pub fn with_key(mut self, key: Key) -> Self {
        self.key = key;
        self
    }

    /// Shard count used for a message of `message_len` bytes.
    ///
    /// An explicit count is used as is; otherwise the CPU-derived count is
    /// capped so no shard is left without bytes.
    #[must_use]
    pub fn shards_for(&self, message_len: usize) -> usize {
        self.options
            .shards()
            .unwrap_or_else(|| auto_shard_count().min(prev_power_of_two(message_len)))
    }

    /// Runs all trials in order, streaming each result to `sink`.
    ///
    /// Returns the number of trials run. The first error aborts the sweep,
    /// but `sink` is still finished so results recorded so far are kept.
    pub fn run<R>(&self, sink: &mut R) -> Result<usize, PipelineError>
    where
        R: ReportSink + ?Sized,
    {
        let outcome = self.run_trials(sink);
        let finished = sink.finish();
        let trials = outcome?;
        finished?;
        Ok(trials)
    }

    fn run_trials<R>(&self, sink: &mut R) -> Result<usize, PipelineError>
    where
        R: ReportSink + ?Sized,
    {
        let mut trials = 0;
        for algorithm in self.options.algorithms() {
            for &message_len in self.options.sizes() {
                let shards = self.shards_for(message_len);
                let stats = run_trial(algorithm, &self.key, message_len, shards)?;
                sink.record(&stats)?;
                trials += 1;
            }
        }
        Ok(trials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Algorithm, Digest};

    #[test]
    fn prev_power_of_two_rounds_down() {
        assert_eq!(prev_power_of_two(0), 1);
        assert_eq!(prev_power_of_two(1), 1);
        assert_eq!(prev_power_of_two(6), 4);
        assert_eq!(prev_power_of_two(8), 8);
        assert_eq!(prev_power_of_two(13), 8);
    }

    #[test]
    fn trial_rejects_bad_shapes_before_running() {
        let algo = Algorithm::HighwayHash64;
        let key = Key::reference();
        assert!(matches!(
            run_trial(&algo, &key, 0, 1),
            Err(PipelineError::Config(ConfigError::EmptyMessage))
        ));
        assert!(matches!(
            run_trial(&algo, &key, 16, 3),
            Err(PipelineError::Config(ConfigError::ShardsNotPowerOfTwo { shards: 3 }))
        ));
        assert!(matches!(
            run_trial(&algo, &key, 2, 4),
            Err(PipelineError::Config(ConfigError::TooManyShards { shards: 4, message_len: 2 }))
        ));
    }

    struct Constant;

    impl DigestFunction for Constant {
        fn name(&self) -> &str {
            "constant"
        }

        fn digest(&self, _message: &[u8], _key: &Key) -> Digest {
            vec![0xab; 4]
        }

        fn output_len(&self) -> usize {
            4
        }
    }

    #[test]
    fn constant_digest_reports_full_width_collision() {
        let stats = run_trial(&Constant, &Key::reference(), 4, 2).unwrap();
        assert!(stats.has_collision());
        assert_eq!(stats.zero_bits, Some(32));
        assert_eq!(stats.algorithm, "constant");
    }

    struct Panicking;

    impl DigestFunction for Panicking {
        fn name(&self) -> &str {
            "panicking"
        }

        fn digest(&self, _message: &[u8], _key: &Key) -> Digest {
            panic!("digest failure");
        }

        fn output_len(&self) -> usize {
            1
        }
    }

    #[test]
    fn worker_panic_is_reported_as_error() {
        let err = run_trial(&Panicking, &Key::reference(), 2, 2).unwrap_err();
        assert!(matches!(err, PipelineError::WorkerPanicked { shard: 0 }));
    }

    #[test]
    fn sweep_streams_every_trial_in_order() {
        let options = TrialOptions::default()
            .with_algorithms(["siphash", "highwayhash64"])
            .and_then(|opts| opts.with_sizes([2, 4, 8]))
            .and_then(|opts| opts.with_shards(2))
            .unwrap();
        let mut report = Vec::new();
        let trials = Sweep::new(&options).run(&mut report).unwrap();
        assert_eq!(trials, 6);
        let order: Vec<_> = report.iter().map(|s| (s.algorithm.as_str(), s.message_len)).collect();
        assert_eq!(
            order,
            vec![
                ("siphash", 2),
                ("siphash", 4),
                ("siphash", 8),
                ("highwayhash64", 2),
                ("highwayhash64", 4),
                ("highwayhash64", 8),
            ]
        );
        assert!(report.iter().all(|s| s.shards == 2));
    }

    #[derive(Default)]
    struct FailingSink {
        recorded: usize,
        finished: bool,
    }

    impl ReportSink for FailingSink {
        fn record(&mut self, _stats: &RunStatistics) -> io::Result<()> {
            if self.recorded == 2 {
                return Err(io::Error::other("disk full"));
            }
            self.recorded += 1;
            Ok(())
        }

        fn finish(&mut self) -> io::Result<()> {
            self.finished = true;
            Ok(())
        }
    }

    #[test]
    fn aborted_sweep_still_finishes_the_sink() {
        let options = TrialOptions::default()
            .with_algorithms(["highwayhash64"])
            .and_then(|opts| opts.with_sizes([2, 4, 8, 16]))
            .unwrap();
        let mut sink = FailingSink::default();
        let err = Sweep::new(&options).run(&mut sink).unwrap_err();
        assert!(matches!(err, PipelineError::Report(_)));
        assert_eq!(sink.recorded, 2);
        assert!(sink.finished);
    }

    #[test]
    fn auto_shards_never_exceed_message_len() {
        let options = TrialOptions::default();
        let sweep = Sweep::new(&options);
        assert_eq!(sweep.shards_for(1), 1);
        assert!(sweep.shards_for(3) <= 2);
        assert!(sweep.shards_for(1 << 20).is_power_of_two());
    }
}
