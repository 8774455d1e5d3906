//! Amplitude encoding of feature vectors.
//!
//! Feature `i` becomes the amplitude of basis state `i` after L2
//! normalization. Only the direction of the vector survives; two inputs that
//! differ by a positive scale factor encode to the same state.

use num_complex::Complex64;

use crate::error::{QclError, QclResult};
use crate::statevector::Statevector;

/// Units needed to hold `num_features` amplitudes (at least one).
pub fn units_for_features(num_features: usize) -> usize {
    let units = num_features.next_power_of_two().trailing_zeros() as usize;
    units.max(1)
}

/// Encode with a zero-norm check only.
pub fn encode(features: &[f64]) -> QclResult<Statevector> {
    encode_with_tolerance(features, 0.0)
}

/// Encode, treating any norm at or below `tolerance` as degenerate.
pub fn encode_with_tolerance(features: &[f64], tolerance: f64) -> QclResult<Statevector> {
    let norm = features.iter().map(|x| x * x).sum::<f64>().sqrt();
    if !norm.is_finite() || norm <= tolerance.max(0.0) {
        return Err(QclError::DegenerateInput { norm });
    }

    let size = 1 << units_for_features(features.len());
    let mut amplitudes = vec![Complex64::new(0.0, 0.0); size];
    for (amp, &x) in amplitudes.iter_mut().zip(features) {
        *amp = Complex64::new(x / norm, 0.0);
    }
    Statevector::from_amplitudes(amplitudes)
}
