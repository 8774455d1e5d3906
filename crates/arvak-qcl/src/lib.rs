//! `arvak-qcl` — circuit-centric binary classifier.
//!
//! A feature vector is amplitude-encoded into an n-unit statevector, a
//! parameterized circuit of single-axis rotations (optionally controlled) is
//! applied, and one output unit is measured. The probability of reading 1,
//! compared against `0.5 - bias`, gives the label.
//!
//! - [`statevector`]: dense `Complex64` simulator
//! - [`encoder`]: amplitude encoding with zero padding
//! - [`estimator`]: exact or Monte Carlo output probabilities
//! - [`trainer`]: multi-start local search over parameters and bias
//! - [`validator`]: miss rate over a sampling schedule
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use arvak_qcl::{Axis, CircuitSpec, Model, RotationGate, SamplingSchedule, validate_exact};
//! use arvak_qcl::model::Sample;
//!
//! let circuit = CircuitSpec::new(1, vec![RotationGate::new(0, Axis::Y, 0)]).unwrap();
//! let model = Model::from_parts(Arc::new(circuit), vec![0.0], 0.0).unwrap();
//!
//! let samples = vec![
//!     Sample::new(vec![1.0, 0.1], 0).unwrap(),
//!     Sample::new(vec![0.1, 1.0], 1).unwrap(),
//! ];
//! let rate = validate_exact(&model, &samples, &SamplingSchedule::whole(2)).unwrap();
//! assert_eq!(rate, 0.0);
//! ```

pub mod circuit;
pub mod config;
pub mod encoder;
pub mod error;
pub mod estimator;
pub mod model;
pub mod rng;
pub mod schedule;
pub mod statevector;
pub mod strategy;
pub mod trainer;
pub mod validator;

pub use circuit::{Axis, CircuitSpec, RotationGate};
pub use config::{MinibatchStrategy, TrainingOptions};
pub use error::{QclError, QclResult};
pub use estimator::{Classification, Estimator, ProbabilityMode, classify, classify_exact};
pub use model::{Model, Sample, random_initial_parameters};
pub use schedule::SamplingSchedule;
pub use statevector::Statevector;
pub use strategy::{GradientStep, RandomPerturbation, UpdateStrategy};
pub use trainer::{CandidateReport, Trainer, TrainingResult, train};
pub use validator::{ValidationReport, validate, validate_exact, validate_with};
