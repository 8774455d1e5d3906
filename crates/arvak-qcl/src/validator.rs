//! Miss-rate evaluation of a trained model.

use serde::Serialize;
use tracing::debug;

use crate::error::{QclError, QclResult};
use crate::estimator::{Estimator, count_misclassifications};
use crate::model::{Model, Sample};
use crate::rng::StreamKey;
use crate::schedule::SamplingSchedule;

/// Seed used by [`validate`] when the caller does not pick a stream.
pub const DEFAULT_VALIDATION_SEED: u64 = 0x5eed;

/// Misses over a validation schedule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValidationReport {
    /// Misclassified occurrences.
    pub misses: usize,
    /// Occurrences evaluated.
    pub evaluated: usize,
    /// `misses / evaluated`, or 0 when nothing was evaluated.
    pub miss_rate: f64,
}

impl ValidationReport {
    fn new(misses: usize, evaluated: usize) -> Self {
        let miss_rate = if evaluated == 0 {
            0.0
        } else {
            misses as f64 / evaluated as f64
        };
        Self {
            misses,
            evaluated,
            miss_rate,
        }
    }
}

/// Monte Carlo miss rate of `model` over every index `schedule` enumerates.
///
/// `tolerance` is the norm at or below which a feature vector is rejected as
/// degenerate.
pub fn validate(
    model: &Model,
    samples: &[Sample],
    tolerance: f64,
    measurements_per_sample: usize,
    schedule: &SamplingSchedule,
) -> QclResult<f64> {
    let estimator = Estimator::sampled(measurements_per_sample)?.with_tolerance(tolerance);
    let report = validate_with(
        model,
        samples,
        schedule,
        estimator,
        StreamKey::new(DEFAULT_VALIDATION_SEED),
    )?;
    Ok(report.miss_rate)
}

/// Miss rate using exact output probabilities. Repeated calls agree exactly.
pub fn validate_exact(model: &Model, samples: &[Sample], schedule: &SamplingSchedule) -> QclResult<f64> {
    let report = validate_with(
        model,
        samples,
        schedule,
        Estimator::exact(),
        StreamKey::new(DEFAULT_VALIDATION_SEED),
    )?;
    Ok(report.miss_rate)
}

/// Full report with a caller-chosen estimator and stream.
///
/// Each batch draws from its own evaluation of `key`; duplicate indices within
/// a batch see the same stream.
pub fn validate_with(
    model: &Model,
    samples: &[Sample],
    schedule: &SamplingSchedule,
    estimator: Estimator,
    mut key: StreamKey,
) -> QclResult<ValidationReport> {
    if samples.is_empty() {
        return Err(QclError::EmptyDataset);
    }
    schedule.check_range(samples.len())?;

    let mut misses = 0;
    let mut evaluated = 0;
    for batch in schedule.batches() {
        let eval = key.next_evaluation();
        if batch.is_empty() {
            continue;
        }
        let probs = estimator.probabilities(model.circuit(), model.parameters(), samples, batch, eval)?;
        misses += count_misclassifications(&probs, model.bias(), samples, batch);
        evaluated += batch.len();
    }

    let report = ValidationReport::new(misses, evaluated);
    debug!(misses, evaluated, miss_rate = report.miss_rate, "validation finished");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{Axis, CircuitSpec, RotationGate};
    use std::sync::Arc;

    fn identity_model(bias: f64) -> Model {
        let spec = CircuitSpec::new(1, vec![RotationGate::new(0, Axis::Y, 0)]).unwrap();
        Model::from_parts(Arc::new(spec), vec![0.0], bias).unwrap()
    }

    fn samples() -> Vec<Sample> {
        vec![
            Sample::new(vec![1.0, 0.0], 0).unwrap(),
            Sample::new(vec![0.0, 1.0], 1).unwrap(),
            Sample::new(vec![0.0, 1.0], 0).unwrap(),
        ]
    }

    #[test]
    fn test_exact_miss_rate() {
        let model = identity_model(0.0);
        let rate = validate_exact(&model, &samples(), &SamplingSchedule::whole(3)).unwrap();
        assert!((rate - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_duplicates_count_per_occurrence() {
        let model = identity_model(0.0);
        let schedule = SamplingSchedule::from_batches(vec![vec![2, 2], vec![0]]);
        let report = validate_with(&model, &samples(), &schedule, Estimator::exact(), StreamKey::new(0)).unwrap();
        assert_eq!(report.misses, 2);
        assert_eq!(report.evaluated, 3);
    }

    #[test]
    fn test_empty_schedule_is_zero() {
        let model = identity_model(0.0);
        let schedule = SamplingSchedule::from_batches(vec![vec![], vec![]]);
        assert_eq!(validate_exact(&model, &samples(), &schedule).unwrap(), 0.0);
        assert_eq!(validate(&model, &samples(), 0.0, 10, &SamplingSchedule::default()).unwrap(), 0.0);
    }

    #[test]
    fn test_errors() {
        let model = identity_model(0.0);
        assert!(matches!(
            validate_exact(&model, &[], &SamplingSchedule::whole(0)),
            Err(QclError::EmptyDataset)
        ));
        assert!(matches!(
            validate_exact(&model, &samples(), &SamplingSchedule::whole(4)),
            Err(QclError::ScheduleRange { index: 3, len: 3 })
        ));
        assert!(matches!(
            validate(&model, &samples(), 0.0, 0, &SamplingSchedule::whole(3)),
            Err(QclError::InvalidMeasurementCount(0))
        ));
    }

    #[test]
    fn test_tolerance_rejects_small_inputs() {
        let model = identity_model(0.0);
        let tiny = vec![Sample::new(vec![1e-4, 0.0], 0).unwrap()];
        assert!(matches!(
            validate(&model, &tiny, 1e-3, 10, &SamplingSchedule::whole(1)),
            Err(QclError::DegenerateInput { .. })
        ));
        assert!(validate(&model, &tiny, 0.0, 10, &SamplingSchedule::whole(1)).is_ok());
    }
}
