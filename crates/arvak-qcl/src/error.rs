//! Error types for the classifier crate.

use thiserror::Error;

/// Errors produced while encoding, simulating, estimating or training.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QclError {
    /// Feature vector has zero (or non-finite) norm, so it has no direction.
    #[error("feature vector has degenerate norm {norm}")]
    DegenerateInput {
        /// The offending L2 norm.
        norm: f64,
    },

    /// Training or validation was asked to run on no samples.
    #[error("dataset is empty")]
    EmptyDataset,

    /// A sampling schedule references a sample that does not exist.
    #[error("schedule references sample {index} but dataset only has {len} samples")]
    ScheduleRange {
        /// The out-of-range index.
        index: usize,
        /// Number of samples in the dataset.
        len: usize,
    },

    /// Amplitude normalization drifted past the fatal threshold.
    ///
    /// This signals a simulator defect, not a recoverable condition.
    #[error("amplitude normalization drifted by {drift:e}")]
    NumericalInvariantViolation {
        /// Absolute deviation of the squared-magnitude sum from 1.
        drift: f64,
    },

    /// A rotation gate names a unit outside the register or reuses a unit.
    #[error("invalid gate on unit {target}: {reason}")]
    InvalidGate {
        /// Target unit of the offending gate.
        target: usize,
        /// What is wrong with it.
        reason: String,
    },

    /// Feature vector size does not fit the circuit's register.
    #[error("{features} features need {needed} units but circuit has {units}")]
    FeatureLengthMismatch {
        /// Number of features supplied.
        features: usize,
        /// Units the encoding needs.
        needed: usize,
        /// Units in the circuit.
        units: usize,
    },

    /// Parameter vector length does not match the circuit's slot count.
    #[error("circuit expects {expected} parameters, got {got}")]
    ParameterCountMismatch {
        /// Number of parameter slots in the circuit.
        expected: usize,
        /// Length of the supplied parameter vector.
        got: usize,
    },

    /// Monte Carlo estimation needs at least one trial.
    #[error("measurements per sample must be at least 1, got {0}")]
    InvalidMeasurementCount(usize),

    /// Labels are binary.
    #[error("label must be 0 or 1, got {0}")]
    InvalidLabel(u8),

    /// Training was started without any initial parameter vector.
    #[error("no initial parameter vectors supplied")]
    NoCandidates,

    /// A rotation angle or parameter is NaN or infinite.
    #[error("parameter slot {slot} is not finite ({value})")]
    NonFiniteParameter {
        /// Parameter slot carrying the value.
        slot: usize,
        /// The offending value.
        value: f64,
    },

    /// Amplitude vector could not be constructed.
    #[error("invalid amplitude vector: {0}")]
    InvalidState(String),

    /// Options or circuit description could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<serde_yaml_ng::Error> for QclError {
    fn from(e: serde_yaml_ng::Error) -> Self {
        QclError::Config(e.to_string())
    }
}

impl From<serde_json::Error> for QclError {
    fn from(e: serde_json::Error) -> Self {
        QclError::Config(e.to_string())
    }
}

/// Result type for classifier operations.
pub type QclResult<T> = Result<T, QclError>;
