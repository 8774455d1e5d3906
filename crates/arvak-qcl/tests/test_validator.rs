//! Tests for miss-rate validation.

use std::sync::Arc;

use arvak_qcl::circuit::{Axis, CircuitSpec, RotationGate};
use arvak_qcl::rng::StreamKey;
use arvak_qcl::{Estimator, Model, QclError, Sample, SamplingSchedule, validate, validate_exact, validate_with};

fn model(theta: f64, bias: f64) -> Model {
    let circuit = CircuitSpec::new(1, vec![RotationGate::new(0, Axis::Y, 0)]).unwrap();
    Model::from_parts(Arc::new(circuit), vec![theta], bias).unwrap()
}

fn dataset() -> Vec<Sample> {
    (0..30)
        .map(|k| {
            let phi = 0.02 + k as f64 * 0.05;
            Sample::new(vec![phi.cos(), phi.sin()], u8::from(k % 3 == 0)).unwrap()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Determinism
// ---------------------------------------------------------------------------

#[test]
fn exact_validation_is_idempotent() {
    let m = model(0.8, 0.1);
    let samples = dataset();
    let schedule = SamplingSchedule::chunked(samples.len(), 7);
    let first = validate_exact(&m, &samples, &schedule).unwrap();
    let second = validate_exact(&m, &samples, &schedule).unwrap();
    assert_eq!(first, second);
}

#[test]
fn sampled_validation_is_seeded() {
    let m = model(0.8, 0.0);
    let samples = dataset();
    let schedule = SamplingSchedule::whole(samples.len());
    let a = validate(&m, &samples, 0.0, 50, &schedule).unwrap();
    let b = validate(&m, &samples, 0.0, 50, &schedule).unwrap();
    assert_eq!(a, b);
}

#[test]
fn sampled_rate_approaches_exact_rate() {
    let m = model(0.3, 0.0);
    let samples = dataset();
    let schedule = SamplingSchedule::whole(samples.len());
    let exact = validate_with(&m, &samples, &schedule, Estimator::exact(), StreamKey::new(0)).unwrap();
    let sampled = validate_with(
        &m,
        &samples,
        &schedule,
        Estimator::sampled(20_000).unwrap(),
        StreamKey::new(4),
    )
    .unwrap();
    assert!(exact.misses.abs_diff(sampled.misses) <= 2);
}

// ---------------------------------------------------------------------------
// Counting
// ---------------------------------------------------------------------------

#[test]
fn miss_rate_is_a_fraction() {
    let m = model(1.3, -0.2);
    let samples = dataset();
    for measurements in [1, 2, 100] {
        let rate = validate(&m, &samples, 0.0, measurements, &SamplingSchedule::whole(samples.len())).unwrap();
        assert!((0.0..=1.0).contains(&rate));
    }
}

#[test]
fn every_occurrence_counts() {
    let m = model(0.0, 0.0);
    // (0, 1) has P(1) = 1 but label 0.
    let samples = vec![
        Sample::new(vec![0.0, 1.0], 0).unwrap(),
        Sample::new(vec![1.0, 0.0], 0).unwrap(),
    ];
    let schedule = SamplingSchedule::from_batches(vec![vec![0, 0, 1], vec![], vec![0]]);
    let report = validate_with(&m, &samples, &schedule, Estimator::exact(), StreamKey::new(0)).unwrap();
    assert_eq!(report.misses, 3);
    assert_eq!(report.evaluated, 4);
    assert!((report.miss_rate - 0.75).abs() < 1e-12);
}

#[test]
fn nothing_evaluated_is_zero_rate() {
    let m = model(0.0, 0.0);
    let samples = dataset();
    let schedule = SamplingSchedule::from_batches(vec![vec![], vec![], vec![]]);
    assert_eq!(validate(&m, &samples, 0.0, 10, &schedule).unwrap(), 0.0);
    assert_eq!(validate_exact(&m, &samples, &SamplingSchedule::default()).unwrap(), 0.0);
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[test]
fn validation_errors() {
    let m = model(0.0, 0.0);
    let samples = dataset();
    assert!(matches!(
        validate(&m, &[], 0.0, 10, &SamplingSchedule::default()),
        Err(QclError::EmptyDataset)
    ));
    assert!(matches!(
        validate(&m, &samples, 0.0, 10, &SamplingSchedule::from_batches(vec![vec![30]])),
        Err(QclError::ScheduleRange { index: 30, len: 30 })
    ));
    assert!(matches!(
        validate(&m, &samples, 0.0, 0, &SamplingSchedule::whole(30)),
        Err(QclError::InvalidMeasurementCount(0))
    ));
}
