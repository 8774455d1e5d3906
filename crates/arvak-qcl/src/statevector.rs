//! Statevector simulation engine.
//!
//! Unit `k` is bit `k` of the basis-state index (little-endian), so for a
//! single unit the amplitudes are `[|0⟩, |1⟩]`.

use num_complex::Complex64;
use rand::Rng;

use crate::circuit::{Axis, RotationGate};
use crate::error::{QclError, QclResult};

/// Drift beyond this is a simulator defect.
pub const FATAL_DRIFT: f64 = 1e-6;

/// A normalized amplitude vector over a small register.
#[derive(Debug, Clone, PartialEq)]
pub struct Statevector {
    /// The state amplitudes (2^n complex numbers).
    amplitudes: Vec<Complex64>,
    /// Number of units.
    num_units: usize,
}

impl Statevector {
    /// Create a new statevector initialized to |0...0⟩.
    pub fn new(num_units: usize) -> Self {
        let size = 1 << num_units;
        let mut amplitudes = vec![Complex64::new(0.0, 0.0); size];
        amplitudes[0] = Complex64::new(1.0, 0.0);
        Self {
            amplitudes,
            num_units,
        }
    }

    /// Wrap existing amplitudes. The length must be a power of two and the
    /// vector must already be normalized.
    pub fn from_amplitudes(amplitudes: Vec<Complex64>) -> QclResult<Self> {
        let len = amplitudes.len();
        if len < 2 || !len.is_power_of_two() {
            return Err(QclError::InvalidState(format!(
                "length {len} is not a power of two of at least 2"
            )));
        }
        let state = Self {
            num_units: len.trailing_zeros() as usize,
            amplitudes,
        };
        state.check_norm()?;
        Ok(state)
    }

    /// Number of units.
    pub fn num_units(&self) -> usize {
        self.num_units
    }

    /// Raw amplitudes.
    pub fn amplitudes(&self) -> &[Complex64] {
        &self.amplitudes
    }

    /// Sum of squared magnitudes.
    pub fn norm_sqr(&self) -> f64 {
        self.amplitudes.iter().map(Complex64::norm_sqr).sum()
    }

    /// Absolute deviation of [`Self::norm_sqr`] from 1.
    pub fn norm_drift(&self) -> f64 {
        (self.norm_sqr() - 1.0).abs()
    }

    /// Fail with [`QclError::NumericalInvariantViolation`] on fatal drift.
    pub fn check_norm(&self) -> QclResult<()> {
        let drift = self.norm_drift();
        if drift > FATAL_DRIFT || !drift.is_finite() {
            return Err(QclError::NumericalInvariantViolation { drift });
        }
        Ok(())
    }

    /// Apply a (possibly controlled) rotation by `theta`.
    ///
    /// Only amplitude pairs whose control bits all read 1 are rotated; the
    /// rest of the vector is left as is.
    pub fn apply_rotation(&mut self, gate: &RotationGate, theta: f64) -> QclResult<()> {
        gate.validate(self.num_units)?;
        if !theta.is_finite() {
            return Err(QclError::NonFiniteParameter {
                slot: gate.slot,
                value: theta,
            });
        }
        let ctrl_mask = gate.controls.iter().fold(0usize, |m, &c| m | (1 << c));
        let [[m00, m01], [m10, m11]] = rotation_matrix(gate.axis, theta);
        self.apply_2x2(gate.target, ctrl_mask, m00, m01, m10, m11);
        self.check_norm()
    }

    fn apply_2x2(
        &mut self,
        target: usize,
        ctrl_mask: usize,
        m00: Complex64,
        m01: Complex64,
        m10: Complex64,
        m11: Complex64,
    ) {
        let tgt_mask = 1 << target;
        for i in 0..(1 << self.num_units) {
            if (i & ctrl_mask == ctrl_mask) && (i & tgt_mask == 0) {
                let j = i | tgt_mask;
                let a = self.amplitudes[i];
                let b = self.amplitudes[j];
                self.amplitudes[i] = m00 * a + m01 * b;
                self.amplitudes[j] = m10 * a + m11 * b;
            }
        }
    }

    /// Probability that `unit` reads `outcome` (0 or 1).
    pub fn measurement_probability(&self, unit: usize, outcome: u8) -> f64 {
        let mask = 1 << unit;
        let p_one: f64 = self
            .amplitudes
            .iter()
            .enumerate()
            .filter(|(i, _)| i & mask != 0)
            .map(|(_, a)| a.norm_sqr())
            .sum::<f64>()
            .clamp(0.0, 1.0);
        if outcome == 0 { 1.0 - p_one } else { p_one }
    }

    /// Draw one measurement outcome of `unit` from `rng`.
    ///
    /// Consumes exactly one uniform draw and leaves the state untouched, so
    /// repeated calls are independent trials on the same pure state.
    pub fn sample_measurement<R: Rng + ?Sized>(&self, unit: usize, rng: &mut R) -> u8 {
        let r: f64 = rng.r#gen();
        u8::from(r < self.measurement_probability(unit, 1))
    }

    /// Project `unit` onto `outcome` and renormalize.
    pub fn collapse(&mut self, unit: usize, outcome: u8) -> QclResult<()> {
        let p = self.measurement_probability(unit, outcome);
        if p <= 0.0 {
            return Err(QclError::InvalidState(format!(
                "outcome {outcome} on unit {unit} has zero probability"
            )));
        }
        let mask = 1 << unit;
        let keep_set = outcome != 0;
        let scale = 1.0 / p.sqrt();
        for (i, amp) in self.amplitudes.iter_mut().enumerate() {
            if (i & mask != 0) == keep_set {
                *amp *= scale;
            } else {
                *amp = Complex64::new(0.0, 0.0);
            }
        }
        self.check_norm()
    }
}

/// Standard single-unit rotation matrix about `axis`.
pub fn rotation_matrix(axis: Axis, theta: f64) -> [[Complex64; 2]; 2] {
    let c = (theta / 2.0).cos();
    let s = (theta / 2.0).sin();
    match axis {
        Axis::X => {
            let neg_i_s = Complex64::new(0.0, -s);
            [[Complex64::new(c, 0.0), neg_i_s], [neg_i_s, Complex64::new(c, 0.0)]]
        }
        Axis::Y => [
            [Complex64::new(c, 0.0), Complex64::new(-s, 0.0)],
            [Complex64::new(s, 0.0), Complex64::new(c, 0.0)],
        ],
        Axis::Z => [
            [Complex64::from_polar(1.0, -theta / 2.0), Complex64::new(0.0, 0.0)],
            [Complex64::new(0.0, 0.0), Complex64::from_polar(1.0, theta / 2.0)],
        ],
    }
}
