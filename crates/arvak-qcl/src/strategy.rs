//! Parameter update strategies for the trainer.
//!
//! The trainer only needs *a* locally improving proposal; it measures the
//! proposal itself and rejects anything that increases the batch miss count.
//! Strategies therefore never see the acceptance rule, only the batch.

use std::f64::consts::FRAC_PI_2;

use rand::Rng;

use crate::circuit::CircuitSpec;
use crate::error::{QclError, QclResult};
use crate::estimator::{Estimator, count_misclassifications};
use crate::model::Sample;
use crate::rng::StreamKey;

/// Stream index reserved for a strategy's own random draws.
const STRATEGY_STREAM: usize = usize::MAX;

/// Shifts whose sine is smaller than this leave the derivative undefined.
const MIN_SHIFT_SINE: f64 = 1e-6;

/// The batch a proposal is made for.
#[derive(Debug, Clone, Copy)]
pub struct BatchObjective<'a> {
    /// Circuit geometry.
    pub circuit: &'a CircuitSpec,
    /// Whole dataset.
    pub samples: &'a [Sample],
    /// Indices into `samples` making up the batch.
    pub indices: &'a [usize],
    /// How probabilities are estimated.
    pub estimator: Estimator,
    /// Bias held fixed while proposing.
    pub bias: f64,
}

impl BatchObjective<'_> {
    /// Output probabilities of the batch under `parameters`.
    pub fn probabilities(&self, parameters: &[f64], key: StreamKey) -> QclResult<Vec<f64>> {
        self.estimator
            .probabilities(self.circuit, parameters, self.samples, self.indices, key)
    }

    /// Misclassified samples of the batch under `parameters` and the fixed bias.
    pub fn misses(&self, parameters: &[f64], key: StreamKey) -> QclResult<usize> {
        let probs = self.probabilities(parameters, key)?;
        Ok(count_misclassifications(
            &probs,
            self.bias,
            self.samples,
            self.indices,
        ))
    }
}

/// Proposes a new parameter vector for one batch.
pub trait UpdateStrategy: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Propose parameters for `objective`, starting from `parameters`.
    ///
    /// Randomness must come from `key` (advance it with
    /// [`StreamKey::next_evaluation`]) so runs stay reproducible.
    fn propose(
        &self,
        objective: &BatchObjective<'_>,
        parameters: &[f64],
        learning_rate: f64,
        key: &mut StreamKey,
    ) -> QclResult<Vec<f64>>;
}

/// Step along a shift-rule estimate of the label-signed probability gradient.
///
/// For each slot, the batch is evaluated at `θ ± shift` and the derivative of
/// P(1) is taken as `(P+ − P−) / (2 sin shift)`, which is exact for slots
/// driving a single uncontrolled rotation. The step is
/// `learning_rate · mean((2y − 1) · dP/dθ)`, pushing every sample's
/// probability toward its label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStep {
    shift: f64,
}

impl Default for GradientStep {
    fn default() -> Self {
        Self { shift: FRAC_PI_2 }
    }
}

impl GradientStep {
    /// Gradient step with the π/2 shift rule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different shift. It must be finite and not a multiple of π.
    pub fn with_shift(mut self, shift: f64) -> QclResult<Self> {
        if !shift.is_finite() || shift.sin().abs() < MIN_SHIFT_SINE {
            return Err(QclError::Config(format!(
                "gradient shift {shift} has no usable sine"
            )));
        }
        self.shift = shift;
        Ok(self)
    }

    /// Angle shift used for the derivative estimate.
    pub fn shift(&self) -> f64 {
        self.shift
    }

    /// Label-signed gradient of the batch probabilities.
    pub fn gradient(
        &self,
        objective: &BatchObjective<'_>,
        parameters: &[f64],
        key: &mut StreamKey,
    ) -> QclResult<Vec<f64>> {
        let n = objective.indices.len();
        let mut gradient = vec![0.0; parameters.len()];
        if n == 0 {
            return Ok(gradient);
        }
        let signs: Vec<f64> = objective
            .indices
            .iter()
            .map(|&i| if objective.samples[i].label() == 1 { 1.0 } else { -1.0 })
            .collect();
        let denom = 2.0 * self.shift.sin();

        for (slot, g) in gradient.iter_mut().enumerate() {
            // Both shifted evaluations share a stream so sampling noise cancels.
            let eval = key.next_evaluation();
            let mut shifted = parameters.to_vec();
            shifted[slot] = parameters[slot] + self.shift;
            let plus = objective.probabilities(&shifted, eval)?;
            shifted[slot] = parameters[slot] - self.shift;
            let minus = objective.probabilities(&shifted, eval)?;

            let sum: f64 = plus
                .iter()
                .zip(&minus)
                .zip(&signs)
                .map(|((p, m), s)| s * (p - m) / denom)
                .sum();
            *g = sum / n as f64;
        }
        Ok(gradient)
    }
}

impl UpdateStrategy for GradientStep {
    fn name(&self) -> &'static str {
        "gradient"
    }

    fn propose(
        &self,
        objective: &BatchObjective<'_>,
        parameters: &[f64],
        learning_rate: f64,
        key: &mut StreamKey,
    ) -> QclResult<Vec<f64>> {
        let gradient = self.gradient(objective, parameters, key)?;
        Ok(parameters
            .iter()
            .zip(&gradient)
            .map(|(p, g)| p + learning_rate * g)
            .collect())
    }
}

/// Seeded hill climbing: try a few random perturbations and keep the one with
/// the fewest batch misses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomPerturbation {
    /// Perturbations tried per proposal.
    pub trials: usize,
}

impl Default for RandomPerturbation {
    fn default() -> Self {
        Self { trials: 4 }
    }
}

impl RandomPerturbation {
    /// Perturbation search with `trials` tries per proposal (at least one).
    pub fn new(trials: usize) -> Self {
        Self {
            trials: trials.max(1),
        }
    }
}

impl UpdateStrategy for RandomPerturbation {
    fn name(&self) -> &'static str {
        "random-perturbation"
    }

    fn propose(
        &self,
        objective: &BatchObjective<'_>,
        parameters: &[f64],
        learning_rate: f64,
        key: &mut StreamKey,
    ) -> QclResult<Vec<f64>> {
        let mut rng = key.next_evaluation().stream(STRATEGY_STREAM);
        let eval = key.next_evaluation();

        let mut best: Option<(usize, Vec<f64>)> = None;
        for _ in 0..self.trials.max(1) {
            let candidate: Vec<f64> = parameters
                .iter()
                .map(|p| p + learning_rate * rng.gen_range(-1.0..=1.0))
                .collect();
            let misses = objective.misses(&candidate, eval)?;
            if best.as_ref().is_none_or(|(m, _)| misses < *m) {
                best = Some((misses, candidate));
            }
        }
        Ok(best.map_or_else(|| parameters.to_vec(), |(_, p)| p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{Axis, RotationGate};

    fn setup() -> (CircuitSpec, Vec<Sample>) {
        let spec = CircuitSpec::new(1, vec![RotationGate::new(0, Axis::Y, 0)]).unwrap();
        let samples = vec![
            Sample::new(vec![1.0, 0.1], 0).unwrap(),
            Sample::new(vec![0.1, 1.0], 1).unwrap(),
        ];
        (spec, samples)
    }

    #[test]
    fn test_gradient_matches_analytic() {
        // P1 = sin²(φ + θ/2) → dP/dθ = sin(2φ + θ) / 2.
        let (spec, samples) = setup();
        let indices = [0, 1];
        let objective = BatchObjective {
            circuit: &spec,
            samples: &samples,
            indices: &indices,
            estimator: Estimator::exact(),
            bias: 0.0,
        };
        let theta = 0.7;
        let mut key = StreamKey::new(0);
        let g = GradientStep::new()
            .gradient(&objective, &[theta], &mut key)
            .unwrap();

        let phi0 = (0.1f64).atan2(1.0);
        let phi1 = (1.0f64).atan2(0.1);
        let expected = ((2.0 * phi1 + theta).sin() / 2.0 - (2.0 * phi0 + theta).sin() / 2.0) / 2.0;
        assert!((g[0] - expected).abs() < 1e-9);
    }

    #[test]
    fn test_shift_must_have_nonzero_sine() {
        assert!(matches!(GradientStep::new().with_shift(0.0), Err(QclError::Config(_))));
        assert!(GradientStep::new().with_shift(std::f64::consts::PI).is_err());
        assert!(GradientStep::new().with_shift(f64::NAN).is_err());
        let step = GradientStep::new().with_shift(0.3).unwrap();
        assert_eq!(step.shift(), 0.3);
    }

    #[test]
    fn test_gradient_empty_batch_is_zero() {
        let (spec, samples) = setup();
        let objective = BatchObjective {
            circuit: &spec,
            samples: &samples,
            indices: &[],
            estimator: Estimator::exact(),
            bias: 0.0,
        };
        let p = GradientStep::new()
            .propose(&objective, &[0.3], 0.5, &mut StreamKey::new(0))
            .unwrap();
        assert_eq!(p, vec![0.3]);
    }

    #[test]
    fn test_random_perturbation_is_reproducible_and_bounded() {
        let (spec, samples) = setup();
        let indices = [0, 1];
        let objective = BatchObjective {
            circuit: &spec,
            samples: &samples,
            indices: &indices,
            estimator: Estimator::exact(),
            bias: 0.0,
        };
        let strategy = RandomPerturbation::new(3);
        let a = strategy
            .propose(&objective, &[0.0], 0.2, &mut StreamKey::new(8))
            .unwrap();
        let b = strategy
            .propose(&objective, &[0.0], 0.2, &mut StreamKey::new(8))
            .unwrap();
        assert_eq!(a, b);
        assert!(a[0].abs() <= 0.2);
    }
}
