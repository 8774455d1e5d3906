//! Circuit geometry: which rotation acts on which unit, under which controls,
//! driven by which parameter slot.
//!
//! A [`CircuitSpec`] only fixes the *shape* of a classifier. Learned values
//! live in [`crate::Model`]; the same spec is shared (behind an `Arc`) by every
//! model and every training candidate.
//!
//! # Example
//!
//! ```rust
//! use arvak_qcl::circuit::{Axis, CircuitSpec, combined, cyclic_entangling_layer, local_rotations_layer};
//!
//! let gates = combined(vec![
//!     local_rotations_layer(2, Axis::Y),
//!     cyclic_entangling_layer(2, Axis::X, 1),
//! ]);
//! let spec = CircuitSpec::new(2, gates).unwrap();
//! assert_eq!(spec.num_parameters(), 4);
//! assert_eq!(spec.output_unit(), 1);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::encoder::units_for_features;
use crate::error::{QclError, QclResult};

/// Rotation axis of a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// Rotation about X.
    X,
    /// Rotation about Y.
    Y,
    /// Rotation about Z.
    Z,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::X => write!(f, "rx"),
            Axis::Y => write!(f, "ry"),
            Axis::Z => write!(f, "rz"),
        }
    }
}

/// One parameterized, optionally controlled, rotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationGate {
    /// Unit the rotation acts on.
    pub target: usize,
    /// Units that must all read 1 for the rotation to act.
    #[serde(default)]
    pub controls: Vec<usize>,
    /// Rotation axis.
    pub axis: Axis,
    /// Index into the model's parameter vector.
    pub slot: usize,
}

impl RotationGate {
    /// Unconditional rotation.
    pub fn new(target: usize, axis: Axis, slot: usize) -> Self {
        Self {
            target,
            controls: Vec::new(),
            axis,
            slot,
        }
    }

    /// Rotation conditioned on `controls`.
    pub fn controlled(target: usize, controls: Vec<usize>, axis: Axis, slot: usize) -> Self {
        Self {
            target,
            controls,
            axis,
            slot,
        }
    }

    /// Whether the gate carries any control units.
    pub fn is_controlled(&self) -> bool {
        !self.controls.is_empty()
    }

    /// Check unit indices against a register of `num_units`.
    pub fn validate(&self, num_units: usize) -> QclResult<()> {
        if self.target >= num_units {
            return Err(QclError::InvalidGate {
                target: self.target,
                reason: format!("target outside register of {num_units} units"),
            });
        }
        for (i, &c) in self.controls.iter().enumerate() {
            if c >= num_units {
                return Err(QclError::InvalidGate {
                    target: self.target,
                    reason: format!("control {c} outside register of {num_units} units"),
                });
            }
            if c == self.target {
                return Err(QclError::InvalidGate {
                    target: self.target,
                    reason: "unit is both target and control".into(),
                });
            }
            if self.controls[..i].contains(&c) {
                return Err(QclError::InvalidGate {
                    target: self.target,
                    reason: format!("duplicate control {c}"),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for RotationGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(θ[{}]) u{}", self.axis, self.slot, self.target)?;
        if self.is_controlled() {
            let controls: Vec<String> = self.controls.iter().map(|c| format!("u{c}")).collect();
            write!(f, " if {}", controls.join(","))?;
        }
        Ok(())
    }
}

/// Largest register a circuit may declare (2^24 amplitudes).
pub const MAX_UNITS: usize = 24;

#[derive(Deserialize)]
struct RawCircuitSpec {
    num_units: usize,
    gates: Vec<RotationGate>,
    #[serde(default)]
    output_unit: Option<usize>,
}

/// Ordered, immutable sequence of rotation gates over a fixed register.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCircuitSpec")]
pub struct CircuitSpec {
    num_units: usize,
    gates: Vec<RotationGate>,
    output_unit: usize,
}

impl TryFrom<RawCircuitSpec> for CircuitSpec {
    type Error = QclError;

    fn try_from(raw: RawCircuitSpec) -> QclResult<Self> {
        let spec = CircuitSpec::new(raw.num_units, raw.gates)?;
        match raw.output_unit {
            Some(unit) => spec.with_output_unit(unit),
            None => Ok(spec),
        }
    }
}

impl CircuitSpec {
    /// Build a spec, validating every gate. The measured unit defaults to the
    /// highest-index unit.
    pub fn new(num_units: usize, gates: Vec<RotationGate>) -> QclResult<Self> {
        if num_units == 0 {
            return Err(QclError::Config("circuit needs at least one unit".into()));
        }
        if num_units > MAX_UNITS {
            return Err(QclError::Config(format!(
                "circuit declares {num_units} units, at most {MAX_UNITS} are supported"
            )));
        }
        for gate in &gates {
            gate.validate(num_units)?;
        }
        Ok(Self {
            num_units,
            gates,
            output_unit: num_units - 1,
        })
    }

    /// Measure a different unit.
    pub fn with_output_unit(mut self, unit: usize) -> QclResult<Self> {
        if unit >= self.num_units {
            return Err(QclError::Config(format!(
                "output unit {unit} outside register of {} units",
                self.num_units
            )));
        }
        self.output_unit = unit;
        Ok(self)
    }

    /// Number of simulated units.
    pub fn num_units(&self) -> usize {
        self.num_units
    }

    /// Gates in application order.
    pub fn gates(&self) -> &[RotationGate] {
        &self.gates
    }

    /// Unit whose measurement decides the label.
    pub fn output_unit(&self) -> usize {
        self.output_unit
    }

    /// Length a parameter vector must have: highest slot + 1.
    pub fn num_parameters(&self) -> usize {
        self.gates.iter().map(|g| g.slot + 1).max().unwrap_or(0)
    }

    /// Check that `features` encodes onto exactly this register.
    pub fn check_features(&self, features: &[f64]) -> QclResult<()> {
        let needed = units_for_features(features.len());
        if needed != self.num_units {
            return Err(QclError::FeatureLengthMismatch {
                features: features.len(),
                needed,
                units: self.num_units,
            });
        }
        Ok(())
    }

    /// Load a spec from YAML (JSON is valid YAML).
    pub fn from_yaml_str(source: &str) -> QclResult<Self> {
        Ok(serde_yaml_ng::from_str(source)?)
    }
}

impl fmt::Display for CircuitSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "circuit: {} units, {} gates, {} parameters, measure u{}",
            self.num_units,
            self.gates.len(),
            self.num_parameters(),
            self.output_unit
        )?;
        for gate in &self.gates {
            writeln!(f, "  {gate}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Layer builders
// ---------------------------------------------------------------------------

/// One unconditional rotation per unit, slots `0..num_units`.
pub fn local_rotations_layer(num_units: usize, axis: Axis) -> Vec<RotationGate> {
    (0..num_units)
        .map(|unit| RotationGate::new(unit, axis, unit))
        .collect()
}

/// Unconditional rotations on the listed units only, slots numbered in order.
pub fn partial_rotations_layer(units: &[usize], axis: Axis) -> Vec<RotationGate> {
    units
        .iter()
        .enumerate()
        .map(|(slot, &unit)| RotationGate::new(unit, axis, slot))
        .collect()
}

/// Rotation on each unit `i` controlled by unit `(i + stride) mod num_units`.
///
/// A stride that maps a unit onto itself (multiple of `num_units`) yields an
/// empty layer.
pub fn cyclic_entangling_layer(num_units: usize, axis: Axis, stride: usize) -> Vec<RotationGate> {
    if num_units < 2 || stride % num_units == 0 {
        return Vec::new();
    }
    (0..num_units)
        .map(|unit| {
            RotationGate::controlled(unit, vec![(unit + stride) % num_units], axis, unit)
        })
        .collect()
}

/// Concatenate layers, shifting slots so each layer gets its own parameters.
pub fn combined(layers: Vec<Vec<RotationGate>>) -> Vec<RotationGate> {
    let mut offset = 0;
    let mut gates = Vec::new();
    for layer in layers {
        let width = layer.iter().map(|g| g.slot + 1).max().unwrap_or(0);
        gates.extend(layer.into_iter().map(|mut g| {
            g.slot += offset;
            g
        }));
        offset += width;
    }
    gates
}
