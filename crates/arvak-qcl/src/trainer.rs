//! Multi-start local search over classifier parameters and bias.
//!
//! Algorithm, per candidate start:
//!   bias = 0
//!   repeat up to max_epochs:
//!     for each schedule batch:
//!       for each minibatch:  propose θ' with the update strategy,
//!                            keep θ' iff batch misses do not increase
//!       refit bias on the batch (1-D threshold search)
//!     refit bias on the whole schedule, measure the miss rate
//!     improvement < tolerance → stall; stop after max_stalls stalls
//!
//! Every surviving candidate is then scored on the validation schedule and
//! the one with the fewest misses wins.

use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::circuit::CircuitSpec;
use crate::config::{MinibatchStrategy, TrainingOptions};
use crate::encoder::encode;
use crate::error::{QclError, QclResult};
use crate::estimator::{Estimator, label_for};
use crate::model::{Model, Sample};
use crate::rng::StreamKey;
use crate::schedule::SamplingSchedule;
use crate::strategy::{BatchObjective, GradientStep, UpdateStrategy};
use crate::validator::validate_with;

/// Threshold offset used when every sample should be labeled 1.
const LOW_EDGE_MARGIN: f64 = 0.01;

/// Outcome of a one-dimensional bias search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiasFit {
    /// Bias minimizing misses.
    pub bias: f64,
    /// Misses at that bias.
    pub misses: usize,
}

/// Bias minimizing misclassifications of `probabilities` against `labels`.
///
/// Only the ordering of the probabilities matters, so the search scans the
/// thresholds between consecutive distinct values plus the two edges (label
/// everything 1, label everything 0). Ties go to the threshold closest to the
/// one implied by `current_bias`. A split is only taken when [`label_for`]
/// reproduces it under the stored bias, and the returned miss count is
/// recounted with that rule.
pub fn fit_bias(probabilities: &[f64], labels: &[u8], current_bias: f64) -> BiasFit {
    let n = probabilities.len().min(labels.len());
    if n == 0 {
        return BiasFit {
            bias: current_bias,
            misses: 0,
        };
    }
    let mut points: Vec<(f64, u8)> = probabilities
        .iter()
        .copied()
        .zip(labels.iter().copied())
        .take(n)
        .collect();
    points.sort_by(|a, b| a.0.total_cmp(&b.0));

    let current_threshold = 0.5 - current_bias;
    let consider = |misses: usize, bias: f64, best: &mut Option<(usize, f64)>| {
        let distance = |b: f64| ((0.5 - b) - current_threshold).abs();
        let better = match *best {
            None => true,
            Some((m, b)) => misses < m || (misses == m && distance(bias) < distance(b)),
        };
        if better {
            *best = Some((misses, bias));
        }
    };

    // Threshold below everything: all predicted 1, every 0-label is a miss.
    let mut misses = points.iter().filter(|(_, l)| *l == 0).count();
    let mut best = None;
    let low_edge = 0.5 + LOW_EDGE_MARGIN;
    if points.iter().all(|&(p, _)| label_for(p, low_edge) == 1) {
        consider(misses, low_edge, &mut best);
    }

    for k in 0..n {
        // Point k moves below the threshold and is now predicted 0.
        if points[k].1 == 0 {
            misses -= 1;
        } else {
            misses += 1;
        }
        let above = match points.get(k + 1) {
            Some(next) if next.0 > points[k].0 => Some(next.0),
            Some(_) => continue,
            None => None,
        };
        if let Some(bias) = split_bias(points[k].0, above) {
            consider(misses, bias, &mut best);
        }
    }

    let bias = best.map_or(current_bias, |(_, b)| b);
    let misses = points
        .iter()
        .filter(|&&(p, l)| label_for(p, bias) != l)
        .count();
    BiasFit { bias, misses }
}

/// Bias that labels `below` 0 and `above` (if any) 1 under [`label_for`].
///
/// Tries the midpoint first, then `below` itself; `None` when the two values
/// are too close for any stored bias to separate them.
fn split_bias(below: f64, above: Option<f64>) -> Option<f64> {
    let Some(above) = above else {
        let bias = 0.5 - 1.0;
        return (label_for(below, bias) == 0).then_some(bias);
    };
    [(below + above) / 2.0, below]
        .into_iter()
        .map(|threshold| 0.5 - threshold)
        .find(|&bias| label_for(below, bias) == 0 && label_for(above, bias) == 1)
}

/// Best-bias fit of `objective` under `parameters`.
fn refit(objective: &BatchObjective<'_>, parameters: &[f64], key: StreamKey) -> QclResult<BiasFit> {
    let probs = objective.probabilities(parameters, key)?;
    let labels: Vec<u8> = objective
        .indices
        .iter()
        .map(|&i| objective.samples[i].label())
        .collect();
    Ok(fit_bias(&probs, &labels, objective.bias))
}

/// Per-candidate summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateReport {
    /// Position in the initial parameter list.
    pub index: usize,
    /// Epochs run.
    pub epochs: usize,
    /// Misses on the training schedule at the best point found.
    pub training_misses: Option<usize>,
    /// Misses on the validation schedule.
    pub validation_misses: Option<usize>,
    /// Why the candidate was dropped, if it was.
    pub excluded: Option<String>,
}

/// Best model over all candidates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingResult {
    /// Winning model.
    pub model: Model,
    /// Its misses on the validation schedule.
    pub misses: usize,
    /// Validation samples evaluated per candidate.
    pub evaluated: usize,
    /// Index of the winning start.
    pub candidate: usize,
    /// Every candidate, in start order.
    pub candidates: Vec<CandidateReport>,
}

impl TrainingResult {
    /// Validation miss rate of the winner (0 when nothing was evaluated).
    pub fn miss_rate(&self) -> f64 {
        if self.evaluated == 0 {
            0.0
        } else {
            self.misses as f64 / self.evaluated as f64
        }
    }
}

/// A converged candidate before validation.
struct Trained {
    parameters: Vec<f64>,
    bias: f64,
    misses: usize,
    epochs: usize,
}

/// Trains a circuit classifier with a pluggable update strategy.
#[derive(Debug, Clone)]
pub struct Trainer<S = GradientStep> {
    options: TrainingOptions,
    strategy: S,
}

impl Trainer<GradientStep> {
    /// Trainer using [`GradientStep`].
    pub fn new(options: TrainingOptions) -> Self {
        Self {
            options,
            strategy: GradientStep::default(),
        }
    }
}

impl<S: UpdateStrategy> Trainer<S> {
    /// Trainer using `strategy`.
    pub fn with_strategy(options: TrainingOptions, strategy: S) -> Self {
        Self { options, strategy }
    }

    /// Active options.
    pub fn options(&self) -> &TrainingOptions {
        &self.options
    }

    fn estimator(&self) -> QclResult<Estimator> {
        let estimator = if self.options.exact_probabilities {
            Estimator::exact()
        } else {
            Estimator::sampled(self.options.measurements_per_sample)?
        };
        Ok(estimator.with_parallel(self.options.parallel))
    }

    /// Train from every start in `initial` and return the best model on
    /// `validation`.
    pub fn train(
        &self,
        circuit: &Arc<CircuitSpec>,
        samples: &[Sample],
        initial: &[Vec<f64>],
        training: &SamplingSchedule,
        validation: &SamplingSchedule,
    ) -> QclResult<TrainingResult> {
        self.options.validate()?;
        if samples.is_empty() {
            return Err(QclError::EmptyDataset);
        }
        if initial.is_empty() {
            return Err(QclError::NoCandidates);
        }
        training.check_range(samples.len())?;
        validation.check_range(samples.len())?;
        let expected = circuit.num_parameters();
        if let Some(bad) = initial.iter().find(|p| p.len() != expected) {
            return Err(QclError::ParameterCountMismatch {
                expected,
                got: bad.len(),
            });
        }
        for start in initial {
            if let Some((slot, &value)) = start.iter().enumerate().find(|(_, v)| !v.is_finite()) {
                return Err(QclError::NonFiniteParameter { slot, value });
            }
        }
        for sample in samples {
            circuit.check_features(sample.features())?;
            encode(sample.features())?;
        }

        let estimator = self.estimator()?;
        info!(
            candidates = initial.len(),
            samples = samples.len(),
            parameters = expected,
            strategy = self.strategy.name(),
            "training circuit classifier"
        );

        let run = |(index, start): (usize, &Vec<f64>)| {
            self.search(index, circuit, samples, start, training, estimator)
        };
        let outcomes: Vec<QclResult<Trained>> = if self.options.parallel {
            initial.par_iter().enumerate().map(run).collect()
        } else {
            initial.iter().enumerate().map(run).collect()
        };

        let validation_key = StreamKey::new(self.options.seed).for_candidate(usize::MAX);
        let mut reports = Vec::with_capacity(outcomes.len());
        let mut first_violation = None;
        let mut best: Option<(usize, Model, usize, usize)> = None;

        for (index, outcome) in outcomes.into_iter().enumerate() {
            let trained = match outcome {
                Ok(t) => t,
                Err(e @ QclError::NumericalInvariantViolation { .. }) => {
                    warn!(candidate = index, error = %e, "candidate excluded");
                    reports.push(CandidateReport {
                        index,
                        epochs: 0,
                        training_misses: None,
                        validation_misses: None,
                        excluded: Some(e.to_string()),
                    });
                    first_violation.get_or_insert(e);
                    continue;
                }
                Err(e) => return Err(e),
            };

            let model = Model::from_parts(Arc::clone(circuit), trained.parameters, trained.bias)?;
            let report = validate_with(&model, samples, validation, estimator, validation_key)?;
            debug!(
                candidate = index,
                training_misses = trained.misses,
                validation_misses = report.misses,
                "candidate validated"
            );
            reports.push(CandidateReport {
                index,
                epochs: trained.epochs,
                training_misses: Some(trained.misses),
                validation_misses: Some(report.misses),
                excluded: None,
            });
            if best.as_ref().is_none_or(|(m, ..)| report.misses < *m) {
                best = Some((report.misses, model, report.evaluated, index));
            }
        }

        match best {
            Some((misses, model, evaluated, candidate)) => {
                info!(candidate, misses, evaluated, "training finished");
                Ok(TrainingResult {
                    model,
                    misses,
                    evaluated,
                    candidate,
                    candidates: reports,
                })
            }
            None => Err(first_violation.unwrap_or(QclError::NoCandidates)),
        }
    }

    /// Local search from one start.
    fn search(
        &self,
        index: usize,
        circuit: &CircuitSpec,
        samples: &[Sample],
        start: &[f64],
        training: &SamplingSchedule,
        estimator: Estimator,
    ) -> QclResult<Trained> {
        let opts = &self.options;
        let mut key = StreamKey::new(opts.seed).for_candidate(index);
        let all = training.flattened();
        let all_labels: Vec<u8> = all.iter().map(|&i| samples[i].label()).collect();

        let mut parameters = start.to_vec();
        let mut learning_rate = opts.learning_rate;

        let probs = estimator.probabilities(circuit, &parameters, samples, &all, key.next_evaluation())?;
        let fit = fit_bias(&probs, &all_labels, 0.0);
        let mut bias = fit.bias;
        let mut best = Trained {
            parameters: parameters.clone(),
            bias,
            misses: fit.misses,
            epochs: 0,
        };
        if all.is_empty() {
            return Ok(best);
        }

        let total = all.len() as f64;
        let mut previous_rate = fit.misses as f64 / total;
        let mut stalls = 0;

        for epoch in 1..=opts.max_epochs {
            if best.misses == 0 {
                break;
            }
            best.epochs = epoch;

            for batch in training.batches() {
                if batch.is_empty() {
                    continue;
                }
                for minibatch in self.minibatches(batch, circuit, samples, &parameters, bias, estimator, &mut key)? {
                    let objective = BatchObjective {
                        circuit,
                        samples,
                        indices: &minibatch,
                        estimator,
                        bias,
                    };
                    // Both sides are scored at their own best bias on one stream.
                    let eval = key.next_evaluation();
                    let current = refit(&objective, &parameters, eval)?;
                    let proposal = self
                        .strategy
                        .propose(&objective, &parameters, learning_rate, &mut key)?;
                    let proposed = refit(&objective, &proposal, eval)?;
                    if proposed.misses <= current.misses {
                        parameters = proposal;
                    }
                }

                let probs = estimator.probabilities(circuit, &parameters, samples, batch, key.next_evaluation())?;
                let labels: Vec<u8> = batch.iter().map(|&i| samples[i].label()).collect();
                bias = fit_bias(&probs, &labels, bias).bias;
            }

            let probs = estimator.probabilities(circuit, &parameters, samples, &all, key.next_evaluation())?;
            let fit = fit_bias(&probs, &all_labels, bias);
            bias = fit.bias;
            let rate = fit.misses as f64 / total;

            if fit.misses < best.misses {
                best.parameters = parameters.clone();
                best.bias = bias;
                best.misses = fit.misses;
            }

            if previous_rate - rate < opts.tolerance {
                stalls += 1;
                learning_rate *= opts.stochastic_rescale_factor;
            } else {
                stalls = 0;
            }
            previous_rate = rate;

            debug!(
                candidate = index,
                epoch,
                misses = fit.misses,
                bias,
                learning_rate,
                stalls,
                "epoch finished"
            );
            if stalls >= opts.max_stalls {
                break;
            }
        }

        Ok(best)
    }

    /// Split a schedule batch into update steps.
    #[allow(clippy::too_many_arguments)]
    fn minibatches(
        &self,
        batch: &[usize],
        circuit: &CircuitSpec,
        samples: &[Sample],
        parameters: &[f64],
        bias: f64,
        estimator: Estimator,
        key: &mut StreamKey,
    ) -> QclResult<Vec<Vec<usize>>> {
        Ok(match self.options.minibatch {
            MinibatchStrategy::WholeBatch => vec![batch.to_vec()],
            MinibatchStrategy::Chunked { size } => {
                batch.chunks(size.max(1)).map(<[usize]>::to_vec).collect()
            }
            MinibatchStrategy::Misclassified { size } => {
                let probs =
                    estimator.probabilities(circuit, parameters, samples, batch, key.next_evaluation())?;
                let missed: Vec<usize> = batch
                    .iter()
                    .zip(&probs)
                    .filter(|&(&i, &p)| label_for(p, bias) != samples[i].label())
                    .map(|(&i, _)| i)
                    .collect();
                missed.chunks(size.max(1)).map(<[usize]>::to_vec).collect()
            }
        })
    }
}

/// Train with the default [`GradientStep`] strategy.
pub fn train(
    circuit: &Arc<CircuitSpec>,
    samples: &[Sample],
    initial: &[Vec<f64>],
    options: &TrainingOptions,
    training: &SamplingSchedule,
    validation: &SamplingSchedule,
) -> QclResult<TrainingResult> {
    Trainer::new(options.clone()).train(circuit, samples, initial, training, validation)
}
