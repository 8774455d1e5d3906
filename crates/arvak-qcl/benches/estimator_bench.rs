//! Benchmarks for simulation and estimation
//!
//! Run with: cargo bench -p arvak-qcl

use std::sync::Arc;

use arvak_qcl::circuit::{Axis, CircuitSpec, combined, cyclic_entangling_layer, local_rotations_layer};
use arvak_qcl::estimator::prepare_state;
use arvak_qcl::rng::StreamKey;
use arvak_qcl::{Estimator, Model, Sample};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

fn layered_model(num_units: usize) -> Model {
    let gates = combined(vec![
        local_rotations_layer(num_units, Axis::Y),
        cyclic_entangling_layer(num_units, Axis::X, 1),
        local_rotations_layer(num_units, Axis::Z),
    ]);
    let circuit = CircuitSpec::new(num_units, gates).expect("valid circuit");
    let parameters = (0..circuit.num_parameters()).map(|k| 0.1 * k as f64).collect();
    Model::from_parts(Arc::new(circuit), parameters, 0.0).expect("valid model")
}

fn features(num_units: usize, seed: usize) -> Vec<f64> {
    (0..1 << num_units)
        .map(|i| ((i + seed) as f64 * 0.37).sin() + 1.1)
        .collect()
}

/// Benchmark encoding plus circuit application
fn bench_prepare_state(c: &mut Criterion) {
    let mut group = c.benchmark_group("prepare_state");

    for num_units in &[2, 4, 8, 12] {
        let model = layered_model(*num_units);
        let x = features(*num_units, 0);
        group.bench_with_input(BenchmarkId::new("layered", num_units), &x, |b, x| {
            b.iter(|| prepare_state(model.circuit(), model.parameters(), black_box(x), 0.0));
        });
    }

    group.finish();
}

/// Benchmark batch estimation, sequential versus rayon
fn bench_batch_estimation(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_estimation");
    let num_units = 4;
    let model = layered_model(num_units);
    let samples: Vec<Sample> = (0..64)
        .map(|s| Sample::new(features(num_units, s), (s % 2) as u8).expect("valid label"))
        .collect();
    let indices: Vec<usize> = (0..samples.len()).collect();

    for parallel in [false, true] {
        let estimator = Estimator::sampled(1_000)
            .expect("positive measurements")
            .with_parallel(parallel);
        let name = if parallel { "rayon" } else { "sequential" };
        group.bench_function(name, |b| {
            b.iter(|| {
                estimator.probabilities(
                    model.circuit(),
                    model.parameters(),
                    &samples,
                    black_box(&indices),
                    StreamKey::new(1),
                )
            });
        });
    }

    group.bench_function("exact", |b| {
        b.iter(|| {
            Estimator::exact().probabilities(
                model.circuit(),
                model.parameters(),
                &samples,
                black_box(&indices),
                StreamKey::new(1),
            )
        });
    });

    group.finish();
}

criterion_group!(benches, bench_prepare_state, bench_batch_estimation);

criterion_main!(benches);
