use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use hashperm_benches::{trial_shards, TRIAL_SIZES};
use hashperm_core::perturb::total_perturbations;
use hashperm_core::{run_trial, Algorithm, Key};

fn bench_trials(c: &mut Criterion) {
    let key = Key::reference();
    for algorithm in [Algorithm::HighwayHash256, Algorithm::SipHash128] {
        let mut group = c.benchmark_group(format!("trial-{algorithm}"));
        group.sample_size(10);
        for size in TRIAL_SIZES {
            let shards = trial_shards(size);
            group.throughput(Throughput::Elements(total_perturbations(size) as u64));
            group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
                b.iter(|| {
                    let stats = run_trial(&algorithm, &key, size, shards).expect("trial succeeds");
                    black_box(stats);
                });
            });
        }
        group.finish();
    }
}

criterion_group!(benches, bench_trials);
criterion_main!(benches);
