//! Probability estimation and labeling.
//!
//! A sample is classified by encoding it, running the model's circuit, and
//! estimating P(output unit = 1) either exactly or as the observed frequency
//! over repeated measurement trials. The label is 1 when that probability
//! exceeds `0.5 - bias`.

use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::circuit::CircuitSpec;
use crate::encoder::encode_with_tolerance;
use crate::error::{QclError, QclResult};
use crate::model::{Model, Sample};
use crate::rng::StreamKey;
use crate::statevector::Statevector;

/// Probability estimate and the label it implies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Estimated P(output unit = 1).
    pub probability: f64,
    /// Predicted label.
    pub label: u8,
}

/// How output probabilities are obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbabilityMode {
    /// Read the probability straight off the statevector.
    Exact,
    /// Frequency of 1 over this many measurement trials.
    Sampled {
        /// Trials per sample.
        measurements: usize,
    },
}

/// Label for `probability` under `bias`.
pub fn label_for(probability: f64, bias: f64) -> u8 {
    u8::from(probability > 0.5 - bias)
}

/// Encode `features` and apply every gate of `circuit` with `parameters`.
pub fn prepare_state(
    circuit: &CircuitSpec,
    parameters: &[f64],
    features: &[f64],
    tolerance: f64,
) -> QclResult<Statevector> {
    circuit.check_features(features)?;
    if parameters.len() != circuit.num_parameters() {
        return Err(QclError::ParameterCountMismatch {
            expected: circuit.num_parameters(),
            got: parameters.len(),
        });
    }
    let mut state = encode_with_tolerance(features, tolerance)?;
    for gate in circuit.gates() {
        state.apply_rotation(gate, parameters[gate.slot])?;
    }
    Ok(state)
}

/// Frequency of outcome 1 on `unit` over `measurements` trials.
///
/// Every trial measures the same prepared pure state; the state is never
/// collapsed between trials.
pub fn estimate_probability<R: Rng + ?Sized>(
    state: &Statevector,
    unit: usize,
    measurements: usize,
    rng: &mut R,
) -> QclResult<f64> {
    if measurements == 0 {
        return Err(QclError::InvalidMeasurementCount(0));
    }
    let ones = (0..measurements)
        .filter(|_| state.sample_measurement(unit, rng) == 1)
        .count();
    Ok(ones as f64 / measurements as f64)
}

/// Classify one feature vector with Monte Carlo estimation.
pub fn classify<R: Rng + ?Sized>(
    model: &Model,
    features: &[f64],
    measurements_per_sample: usize,
    rng: &mut R,
) -> QclResult<Classification> {
    let circuit = model.circuit();
    let state = prepare_state(circuit, model.parameters(), features, 0.0)?;
    let probability =
        estimate_probability(&state, circuit.output_unit(), measurements_per_sample, rng)?;
    Ok(Classification {
        probability,
        label: label_for(probability, model.bias()),
    })
}

/// Classify one feature vector with the exact output probability.
pub fn classify_exact(model: &Model, features: &[f64]) -> QclResult<Classification> {
    let circuit = model.circuit();
    let state = prepare_state(circuit, model.parameters(), features, 0.0)?;
    let probability = state.measurement_probability(circuit.output_unit(), 1);
    Ok(Classification {
        probability,
        label: label_for(probability, model.bias()),
    })
}

/// Labels implied by `probabilities` under `bias`.
pub fn infer_labels(probabilities: &[f64], bias: f64) -> Vec<u8> {
    probabilities.iter().map(|&p| label_for(p, bias)).collect()
}

/// Number of `indices` whose inferred label disagrees with the sample label.
///
/// `probabilities[k]` belongs to `samples[indices[k]]`.
pub fn count_misclassifications(
    probabilities: &[f64],
    bias: f64,
    samples: &[Sample],
    indices: &[usize],
) -> usize {
    probabilities
        .iter()
        .zip(indices)
        .filter(|&(&p, &i)| label_for(p, bias) != samples[i].label())
        .count()
}

/// Batch estimator shared by training and validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimator {
    mode: ProbabilityMode,
    tolerance: f64,
    parallel: bool,
}

impl Estimator {
    /// Monte Carlo estimation with `measurements` trials per sample.
    pub fn sampled(measurements: usize) -> QclResult<Self> {
        if measurements == 0 {
            return Err(QclError::InvalidMeasurementCount(0));
        }
        Ok(Self {
            mode: ProbabilityMode::Sampled { measurements },
            tolerance: 0.0,
            parallel: false,
        })
    }

    /// Exact probabilities, no sampling noise.
    pub fn exact() -> Self {
        Self {
            mode: ProbabilityMode::Exact,
            tolerance: 0.0,
            parallel: false,
        }
    }

    /// Norm threshold below which inputs are degenerate.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Estimate samples of a batch on the rayon pool.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Estimation mode.
    pub fn mode(&self) -> ProbabilityMode {
        self.mode
    }

    /// P(output = 1) for `samples[i]`, drawing from the stream `key` assigns to `i`.
    pub fn probability(
        &self,
        circuit: &CircuitSpec,
        parameters: &[f64],
        sample: &Sample,
        index: usize,
        key: StreamKey,
    ) -> QclResult<f64> {
        let state = prepare_state(circuit, parameters, sample.features(), self.tolerance)?;
        let unit = circuit.output_unit();
        match self.mode {
            ProbabilityMode::Exact => Ok(state.measurement_probability(unit, 1)),
            ProbabilityMode::Sampled { measurements } => {
                estimate_probability(&state, unit, measurements, &mut key.stream(index))
            }
        }
    }

    /// Probabilities for every index of a batch, in batch order.
    pub fn probabilities(
        &self,
        circuit: &CircuitSpec,
        parameters: &[f64],
        samples: &[Sample],
        indices: &[usize],
        key: StreamKey,
    ) -> QclResult<Vec<f64>> {
        let one = |&i: &usize| {
            let sample = samples.get(i).ok_or(QclError::ScheduleRange {
                index: i,
                len: samples.len(),
            })?;
            self.probability(circuit, parameters, sample, i, key)
        };
        if self.parallel {
            indices.par_iter().map(one).collect()
        } else {
            indices.iter().map(one).collect()
        }
    }
}
