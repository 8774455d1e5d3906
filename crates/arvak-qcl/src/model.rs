//! Samples and trained models.

use std::f64::consts::PI;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::circuit::CircuitSpec;
use crate::error::{QclError, QclResult};

/// A labeled feature vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSample")]
pub struct Sample {
    features: Vec<f64>,
    label: u8,
}

#[derive(Deserialize)]
struct RawSample {
    features: Vec<f64>,
    label: u8,
}

impl TryFrom<RawSample> for Sample {
    type Error = QclError;

    fn try_from(raw: RawSample) -> QclResult<Self> {
        Sample::new(raw.features, raw.label)
    }
}

impl Sample {
    /// Build a sample; the label must be 0 or 1.
    pub fn new(features: Vec<f64>, label: u8) -> QclResult<Self> {
        if label > 1 {
            return Err(QclError::InvalidLabel(label));
        }
        Ok(Self { features, label })
    }

    /// Feature vector.
    pub fn features(&self) -> &[f64] {
        &self.features
    }

    /// Ground-truth label.
    pub fn label(&self) -> u8 {
        self.label
    }
}

/// Circuit geometry plus learned parameters and bias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawModel")]
pub struct Model {
    circuit: Arc<CircuitSpec>,
    parameters: Vec<f64>,
    bias: f64,
}

#[derive(Deserialize)]
struct RawModel {
    circuit: CircuitSpec,
    parameters: Vec<f64>,
    bias: f64,
}

impl TryFrom<RawModel> for Model {
    type Error = QclError;

    fn try_from(raw: RawModel) -> QclResult<Self> {
        Model::from_parts(Arc::new(raw.circuit), raw.parameters, raw.bias)
    }
}

impl Model {
    /// Assemble a model, checking the parameter count against the circuit.
    pub fn from_parts(circuit: Arc<CircuitSpec>, parameters: Vec<f64>, bias: f64) -> QclResult<Self> {
        let expected = circuit.num_parameters();
        if parameters.len() != expected {
            return Err(QclError::ParameterCountMismatch {
                expected,
                got: parameters.len(),
            });
        }
        Ok(Self {
            circuit,
            parameters,
            bias,
        })
    }

    /// Shared circuit geometry.
    pub fn circuit(&self) -> &Arc<CircuitSpec> {
        &self.circuit
    }

    /// Learned rotation angles, indexed by slot.
    pub fn parameters(&self) -> &[f64] {
        &self.parameters
    }

    /// Learned threshold shift.
    pub fn bias(&self) -> f64 {
        self.bias
    }

    /// Decision threshold on P(output = 1).
    pub fn threshold(&self) -> f64 {
        0.5 - self.bias
    }

    /// Check that `features` fits this model's register.
    pub fn check_features(&self, features: &[f64]) -> QclResult<()> {
        self.circuit.check_features(features)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> QclResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load from JSON, revalidating parameter count and circuit.
    pub fn from_json(source: &str) -> QclResult<Self> {
        Ok(serde_json::from_str(source)?)
    }
}

/// `count` parameter vectors of length `num_parameters`, uniform in [-π, π).
pub fn random_initial_parameters(num_parameters: usize, count: usize, seed: u64) -> Vec<Vec<f64>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| (0..num_parameters).map(|_| rng.gen_range(-PI..PI)).collect())
        .collect()
}
