//! Training options.
//!
//! Supports loading options from:
//! 1. YAML files
//! 2. Environment variables (with `ARVAK_QCL_` prefix)
//!
//! Environment variables override file values; unset fields fall back to
//! defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{QclError, QclResult};

/// How each batch of the training schedule is consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum MinibatchStrategy {
    /// One update step per schedule batch.
    WholeBatch,
    /// Split each batch into consecutive chunks of at most `size`.
    Chunked {
        /// Chunk size.
        size: usize,
    },
    /// Step only on the currently misclassified samples of each batch, in
    /// chunks of at most `size`.
    Misclassified {
        /// Chunk size.
        size: usize,
    },
}

impl Default for MinibatchStrategy {
    fn default() -> Self {
        MinibatchStrategy::Chunked {
            size: default_minibatch_size(),
        }
    }
}

/// Options recognized by [`crate::Trainer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingOptions {
    /// Step size for parameter updates.
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,

    /// Minimum miss-rate improvement per epoch; less counts as a stall.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Hard cap on epochs per candidate.
    #[serde(default = "default_max_epochs")]
    pub max_epochs: usize,

    /// Monte Carlo trials per sample.
    #[serde(default = "default_measurements")]
    pub measurements_per_sample: usize,

    /// How schedule batches become update steps.
    #[serde(default)]
    pub minibatch: MinibatchStrategy,

    /// Consecutive stalls tolerated before a candidate halts.
    #[serde(default = "default_max_stalls")]
    pub max_stalls: usize,

    /// Learning-rate multiplier applied on every stall.
    #[serde(default = "default_rescale_factor")]
    pub stochastic_rescale_factor: f64,

    /// Base seed for all measurement and perturbation streams.
    #[serde(default)]
    pub seed: u64,

    /// Train candidates and estimate batches on the rayon pool.
    #[serde(default = "default_true")]
    pub parallel: bool,

    /// Use exact probabilities instead of sampling.
    #[serde(default)]
    pub exact_probabilities: bool,
}

fn default_learning_rate() -> f64 {
    0.1
}

fn default_tolerance() -> f64 {
    0.005
}

fn default_max_epochs() -> usize {
    16
}

fn default_measurements() -> usize {
    10_000
}

fn default_minibatch_size() -> usize {
    10
}

fn default_max_stalls() -> usize {
    1
}

fn default_rescale_factor() -> f64 {
    1.01
}

fn default_true() -> bool {
    true
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            learning_rate: default_learning_rate(),
            tolerance: default_tolerance(),
            max_epochs: default_max_epochs(),
            measurements_per_sample: default_measurements(),
            minibatch: MinibatchStrategy::default(),
            max_stalls: default_max_stalls(),
            stochastic_rescale_factor: default_rescale_factor(),
            seed: 0,
            parallel: true,
            exact_probabilities: false,
        }
    }
}

impl TrainingOptions {
    /// Set the learning rate.
    #[must_use]
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Set the convergence tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the epoch cap.
    #[must_use]
    pub fn with_max_epochs(mut self, max_epochs: usize) -> Self {
        self.max_epochs = max_epochs;
        self
    }

    /// Set Monte Carlo trials per sample.
    #[must_use]
    pub fn with_measurements(mut self, measurements: usize) -> Self {
        self.measurements_per_sample = measurements;
        self
    }

    /// Set the minibatch strategy.
    #[must_use]
    pub fn with_minibatch(mut self, minibatch: MinibatchStrategy) -> Self {
        self.minibatch = minibatch;
        self
    }

    /// Set the stall limit.
    #[must_use]
    pub fn with_max_stalls(mut self, max_stalls: usize) -> Self {
        self.max_stalls = max_stalls;
        self
    }

    /// Set the base seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Enable or disable rayon.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Train on exact probabilities.
    #[must_use]
    pub fn with_exact_probabilities(mut self, exact: bool) -> Self {
        self.exact_probabilities = exact;
        self
    }

    /// Load options from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> QclResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| QclError::Config(format!("{}: {e}", path.as_ref().display())))?;
        Self::from_yaml_str(&contents)
    }

    /// Parse options from YAML.
    pub fn from_yaml_str(source: &str) -> QclResult<Self> {
        let options: TrainingOptions = serde_yaml_ng::from_str(source)?;
        options.validate()?;
        Ok(options)
    }

    /// Override fields from `ARVAK_QCL_*` environment variables.
    ///
    /// Unparseable values are ignored.
    #[must_use]
    pub fn merge_env(mut self) -> Self {
        if let Some(v) = env_parse("ARVAK_QCL_LEARNING_RATE") {
            self.learning_rate = v;
        }
        if let Some(v) = env_parse("ARVAK_QCL_TOLERANCE") {
            self.tolerance = v;
        }
        if let Some(v) = env_parse("ARVAK_QCL_MAX_EPOCHS") {
            self.max_epochs = v;
        }
        if let Some(v) = env_parse("ARVAK_QCL_MEASUREMENTS") {
            self.measurements_per_sample = v;
        }
        if let Some(v) = env_parse("ARVAK_QCL_MAX_STALLS") {
            self.max_stalls = v;
        }
        if let Some(v) = env_parse("ARVAK_QCL_SEED") {
            self.seed = v;
        }
        if let Some(v) = env_parse("ARVAK_QCL_PARALLEL") {
            self.parallel = v;
        }
        self
    }

    /// Defaults with environment overrides.
    pub fn from_env() -> Self {
        Self::default().merge_env()
    }

    /// Reject values training cannot run with.
    pub fn validate(&self) -> QclResult<()> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(QclError::Config(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return Err(QclError::Config(format!(
                "tolerance must be non-negative, got {}",
                self.tolerance
            )));
        }
        if self.measurements_per_sample == 0 && !self.exact_probabilities {
            return Err(QclError::InvalidMeasurementCount(0));
        }
        if self.max_stalls == 0 {
            return Err(QclError::Config("max_stalls must be at least 1".into()));
        }
        if !(self.stochastic_rescale_factor.is_finite() && self.stochastic_rescale_factor > 0.0) {
            return Err(QclError::Config(format!(
                "stochastic_rescale_factor must be positive, got {}",
                self.stochastic_rescale_factor
            )));
        }
        match self.minibatch {
            MinibatchStrategy::Chunked { size: 0 } | MinibatchStrategy::Misclassified { size: 0 } => {
                Err(QclError::Config("minibatch size must be at least 1".into()))
            }
            _ => Ok(()),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let options = TrainingOptions::default();
        assert!(options.validate().is_ok());
        assert_eq!(options.max_epochs, 16);
        assert_eq!(options.minibatch, MinibatchStrategy::Chunked { size: 10 });
    }

    #[test]
    fn test_yaml_partial_uses_defaults() {
        let options = TrainingOptions::from_yaml_str(
            "learning_rate: 0.5\nminibatch:\n  kind: misclassified\n  size: 4\n",
        )
        .unwrap();
        assert_eq!(options.learning_rate, 0.5);
        assert_eq!(options.minibatch, MinibatchStrategy::Misclassified { size: 4 });
        assert_eq!(options.measurements_per_sample, 10_000);
    }

    #[test]
    fn test_yaml_whole_batch() {
        let options = TrainingOptions::from_yaml_str("minibatch:\n  kind: whole_batch\n").unwrap();
        assert_eq!(options.minibatch, MinibatchStrategy::WholeBatch);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(TrainingOptions::default().with_learning_rate(0.0).validate().is_err());
        assert!(TrainingOptions::default().with_measurements(0).validate().is_err());
        assert!(
            TrainingOptions::default()
                .with_measurements(0)
                .with_exact_probabilities(true)
                .validate()
                .is_ok()
        );
        assert!(
            TrainingOptions::default()
                .with_minibatch(MinibatchStrategy::Chunked { size: 0 })
                .validate()
                .is_err()
        );
        assert!(TrainingOptions::from_yaml_str("tolerance: -1.0\n").is_err());
    }
}
