//! Tests for the smoothed-parameter primitive.

use rackmod_dsp::utils::smoothed_parameter::SmoothedParameter;

#[test]
fn approaches_the_target_without_overshoot() {
    let mut parameter = SmoothedParameter::new(0.0, 0.1);
    parameter.set_target(1.0);

    let mut previous = 0.0;
    for n in 0..200 {
        let value = parameter.next();
        if n < 50 {
            assert!(value > previous, "step {n} must increase");
        }
        assert!(value >= previous, "step {n} must not decrease");
        assert!(value <= 1.0, "step {n} must never overshoot");
        previous = value;
    }
    assert!((previous - 1.0).abs() < 1e-5);
}

#[test]
fn snaps_with_zero_coefficient() {
    let mut parameter = SmoothedParameter::new(0.0, 0.0);
    parameter.set_target(0.75);
    assert_eq!(parameter.next(), 0.75);
    assert_eq!(parameter.value(), 0.75);
    assert_eq!(parameter.target(), 0.75);
}

#[test]
fn snap_to_pins_both_ends() {
    let mut parameter = SmoothedParameter::new(0.0, 0.5);
    parameter.set_target(1.0);
    parameter.next();
    parameter.snap_to(0.2);
    assert_eq!(parameter.value(), 0.2);
    assert_eq!(parameter.next(), 0.2);
}

#[test]
fn descending_moves_are_symmetric() {
    let mut parameter = SmoothedParameter::new(1.0, 0.2);
    parameter.set_target(0.0);

    let mut previous = 1.0;
    for _ in 0..100 {
        let value = parameter.next();
        assert!(value <= previous);
        assert!(value >= 0.0);
        previous = value;
    }
    assert!(previous < 1e-4);
}

#[test]
fn coefficient_change_applies_from_the_next_step() {
    let mut parameter = SmoothedParameter::new(0.0, 0.5);
    parameter.set_target(1.0);
    assert_eq!(parameter.next(), 0.5);

    parameter.set_coefficient(0.0);
    assert_eq!(parameter.next(), 1.0);
}
