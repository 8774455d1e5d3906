//! Tests for the statevector simulator and amplitude encoder.

use approx::assert_abs_diff_eq;
use num_complex::Complex64;
use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

use arvak_qcl::circuit::{Axis, RotationGate, combined, cyclic_entangling_layer, local_rotations_layer};
use arvak_qcl::encoder::{encode, encode_with_tolerance, units_for_features};
use arvak_qcl::statevector::Statevector;
use arvak_qcl::QclError;

fn arb_axis() -> impl Strategy<Value = Axis> {
    prop_oneof![Just(Axis::X), Just(Axis::Y), Just(Axis::Z)]
}

/// Gates on a 3-unit register, with at most one control.
fn arb_gate() -> impl Strategy<Value = RotationGate> {
    (0usize..3, prop::option::of(1usize..3), arb_axis()).prop_map(|(target, shift, axis)| {
        match shift {
            Some(s) => RotationGate::controlled(target, vec![(target + s) % 3], axis, 0),
            None => RotationGate::new(target, axis, 0),
        }
    })
}

fn arb_features() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-10.0f64..10.0, 1..=16)
        .prop_filter("non-degenerate", |v| v.iter().map(|x| x * x).sum::<f64>() > 1e-6)
}

// ---------------------------------------------------------------------------
// Encoder
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn encoded_state_has_unit_norm(features in arb_features()) {
        let state = encode(&features).unwrap();
        prop_assert!((state.norm_sqr() - 1.0).abs() < 1e-9);
        prop_assert_eq!(state.num_units(), units_for_features(features.len()));
    }

    #[test]
    fn encoding_ignores_positive_scale(features in arb_features(), scale in 0.01f64..100.0) {
        let a = encode(&features).unwrap();
        let scaled: Vec<f64> = features.iter().map(|x| x * scale).collect();
        let b = encode(&scaled).unwrap();
        for (x, y) in a.amplitudes().iter().zip(b.amplitudes()) {
            prop_assert!((x - y).norm() < 1e-9);
        }
    }
}

#[test]
fn encoding_pads_with_zeros() {
    let state = encode(&[3.0, 0.0, 4.0]).unwrap();
    assert_eq!(state.num_units(), 2);
    assert_abs_diff_eq!(state.amplitudes()[0].re, 0.6, epsilon = 1e-12);
    assert_abs_diff_eq!(state.amplitudes()[2].re, 0.8, epsilon = 1e-12);
    assert_eq!(state.amplitudes()[3], Complex64::new(0.0, 0.0));
}

#[test]
fn single_feature_uses_one_unit() {
    let state = encode(&[-2.0]).unwrap();
    assert_eq!(state.num_units(), 1);
    assert_abs_diff_eq!(state.amplitudes()[0].re, -1.0, epsilon = 1e-12);
}

#[test]
fn degenerate_inputs_rejected() {
    assert!(matches!(encode(&[0.0, 0.0]), Err(QclError::DegenerateInput { .. })));
    assert!(matches!(encode(&[]), Err(QclError::DegenerateInput { .. })));
    assert!(matches!(encode(&[f64::NAN, 1.0]), Err(QclError::DegenerateInput { .. })));
    assert!(matches!(
        encode_with_tolerance(&[1e-3, 0.0], 1e-2),
        Err(QclError::DegenerateInput { .. })
    ));
}

// ---------------------------------------------------------------------------
// Rotations
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn rotations_preserve_norm(
        features in prop::collection::vec(-5.0f64..5.0, 8)
            .prop_filter("non-degenerate", |v| v.iter().map(|x| x * x).sum::<f64>() > 1e-6),
        gates in prop::collection::vec(arb_gate(), 1..20),
        angles in prop::collection::vec(-10.0f64..10.0, 20),
    ) {
        let mut state = encode(&features).unwrap();
        for (gate, theta) in gates.iter().zip(&angles) {
            state.apply_rotation(gate, *theta).unwrap();
        }
        prop_assert!(state.norm_drift() < 1e-9);
    }

    #[test]
    fn outcome_probabilities_are_complementary(
        features in prop::collection::vec(-5.0f64..5.0, 4)
            .prop_filter("non-degenerate", |v| v.iter().map(|x| x * x).sum::<f64>() > 1e-6),
        unit in 0usize..2,
    ) {
        let state = encode(&features).unwrap();
        let p0 = state.measurement_probability(unit, 0);
        let p1 = state.measurement_probability(unit, 1);
        prop_assert!((p0 + p1 - 1.0).abs() < 1e-9);
        prop_assert!((0.0..=1.0).contains(&p1));
    }
}

#[test]
fn ry_pi_flips_basis_state() {
    let mut state = Statevector::new(1);
    state
        .apply_rotation(&RotationGate::new(0, Axis::Y, 0), std::f64::consts::PI)
        .unwrap();
    assert_abs_diff_eq!(state.measurement_probability(0, 1), 1.0, epsilon = 1e-12);
}

#[test]
fn rz_leaves_probabilities_unchanged() {
    let mut state = encode(&[0.6, 0.8]).unwrap();
    state.apply_rotation(&RotationGate::new(0, Axis::Z, 0), 1.3).unwrap();
    assert_abs_diff_eq!(state.measurement_probability(0, 1), 0.64, epsilon = 1e-12);
}

#[test]
fn controlled_rotation_needs_control_set() {
    // u1 = 0 → the controlled flip on u0 does nothing.
    let gate = RotationGate::controlled(0, vec![1], Axis::X, 0);
    let mut state = Statevector::new(2);
    state.apply_rotation(&gate, std::f64::consts::PI).unwrap();
    assert_abs_diff_eq!(state.measurement_probability(0, 1), 0.0, epsilon = 1e-12);

    // Basis state |10⟩ (u1 = 1) → u0 flips.
    let mut state = encode(&[0.0, 0.0, 1.0, 0.0]).unwrap();
    state.apply_rotation(&gate, std::f64::consts::PI).unwrap();
    assert_abs_diff_eq!(state.measurement_probability(0, 1), 1.0, epsilon = 1e-12);
}

#[test]
fn invalid_gates_rejected() {
    let mut state = Statevector::new(2);
    let out_of_range = RotationGate::new(2, Axis::X, 0);
    assert!(matches!(
        state.apply_rotation(&out_of_range, 0.1),
        Err(QclError::InvalidGate { target: 2, .. })
    ));
    let self_controlled = RotationGate::controlled(1, vec![1], Axis::X, 0);
    assert!(state.apply_rotation(&self_controlled, 0.1).is_err());
}

#[test]
fn non_finite_angle_is_rejected_before_simulation() {
    let mut state = Statevector::new(1);
    assert!(matches!(
        state.apply_rotation(&RotationGate::new(0, Axis::Y, 0), f64::NAN),
        Err(QclError::NonFiniteParameter { slot: 0, .. })
    ));
    assert!(state.norm_drift() < 1e-12);
}

#[test]
fn layered_circuit_preserves_norm() {
    let gates = combined(vec![
        local_rotations_layer(3, Axis::Y),
        cyclic_entangling_layer(3, Axis::X, 1),
        local_rotations_layer(3, Axis::Z),
    ]);
    let mut state = encode(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]).unwrap();
    for (k, gate) in gates.iter().enumerate() {
        state.apply_rotation(gate, 0.3 * k as f64 + 0.1).unwrap();
    }
    assert!(state.norm_drift() < 1e-12);
}

// ---------------------------------------------------------------------------
// Measurement
// ---------------------------------------------------------------------------

#[test]
fn sampling_does_not_disturb_state() {
    let state = encode(&[0.6, 0.8]).unwrap();
    let before = state.clone();
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..50 {
        let outcome = state.sample_measurement(0, &mut rng);
        assert!(outcome <= 1);
    }
    assert_eq!(state, before);
}

#[test]
fn collapse_projects_and_renormalizes() {
    let mut state = encode(&[0.6, 0.8]).unwrap();
    state.collapse(0, 1).unwrap();
    assert_abs_diff_eq!(state.measurement_probability(0, 1), 1.0, epsilon = 1e-12);

    let mut basis = Statevector::new(1);
    assert!(matches!(basis.collapse(0, 1), Err(QclError::InvalidState(_))));
}
