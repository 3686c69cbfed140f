//! Tests for the envelope state machines.

use rackmod_dsp::envelope::{AdsrEnvelope, AhrEnvelope, EnvelopeStage};

// 1 kHz keeps the ms-to-samples conversion exact in the assertions.
const SAMPLE_RATE: f32 = 1000.0;

fn ahr(attack_ms: f32, hold_ms: f32, release_ms: f32) -> AhrEnvelope {
    let mut env = AhrEnvelope::new();
    env.init(SAMPLE_RATE);
    env.set_time(EnvelopeStage::Attack, attack_ms);
    env.set_time(EnvelopeStage::Hold, hold_ms);
    env.set_time(EnvelopeStage::Release, release_ms);
    env
}

fn adsr(attack_ms: f32, decay_ms: f32, sustain: f32, release_ms: f32) -> AdsrEnvelope {
    let mut env = AdsrEnvelope::new();
    env.init(SAMPLE_RATE);
    env.set_time(EnvelopeStage::Attack, attack_ms);
    env.set_time(EnvelopeStage::Decay, decay_ms);
    env.set_time(EnvelopeStage::Release, release_ms);
    env.set_sustain_level(sustain);
    env
}

#[test]
fn ahr_ramps_linearly_and_completes() {
    let mut env = ahr(8.0, 0.0, 16.0);
    assert!(!env.is_active());

    env.set_trigger(true);
    assert!(env.is_active());

    // Attack: 1/8 per sample up to full scale.
    for n in 1..=8 {
        let out = env.process(1.0);
        assert!(
            (out - n as f32 / 8.0).abs() < 1e-6,
            "attack step {n}: {out}"
        );
    }
    // Release: 1/16 per sample back to zero.
    for n in 1..=16 {
        let out = env.process(1.0);
        assert!(
            (out - (1.0 - n as f32 / 16.0)).abs() < 1e-6,
            "release step {n}: {out}"
        );
    }

    assert!(!env.is_active());
    assert!(env.take_completed());
    assert!(!env.take_completed());
    assert_eq!(env.process(1.0), 0.0);
}

#[test]
fn ahr_holds_at_full_scale() {
    let mut env = ahr(4.0, 3.0, 4.0);
    env.set_trigger(true);

    for _ in 0..4 {
        env.process(1.0);
    }
    assert_eq!(env.level(), 1.0);
    assert_eq!(env.stage(), EnvelopeStage::Hold);

    for _ in 0..3 {
        assert_eq!(env.process(1.0), 1.0);
    }
    assert_eq!(env.stage(), EnvelopeStage::Release);
}

#[test]
fn retrigger_defers_until_zero_crossing() {
    let mut env = ahr(4.0, 0.0, 100.0);
    env.set_trigger(true);
    for _ in 0..4 {
        env.process(0.5);
    }
    assert_eq!(env.stage(), EnvelopeStage::Release);

    // Retrigger while releasing: nothing happens while the signal
    // stays non-negative.
    env.set_trigger(true);
    let before = env.level();
    for _ in 0..10 {
        env.process(0.5);
    }
    assert_eq!(env.stage(), EnvelopeStage::Release);
    assert!(env.level() < before);

    // First non-negative to negative transition restarts the attack.
    env.process(-0.5);
    assert_eq!(env.stage(), EnvelopeStage::Attack);
    assert!((env.level() - 0.25).abs() < 1e-6);
}

#[test]
fn adsr_reaches_sustain_and_releases_from_it() {
    let mut env = adsr(4.0, 4.0, 0.5, 8.0);
    env.set_trigger(true);

    for n in 1..=4 {
        let out = env.process(1.0);
        assert!((out - n as f32 / 4.0).abs() < 1e-6, "attack step {n}");
    }
    for n in 1..=4 {
        let out = env.process(1.0);
        assert!(
            (out - (1.0 - 0.125 * n as f32)).abs() < 1e-6,
            "decay step {n}"
        );
    }
    assert_eq!(env.stage(), EnvelopeStage::Sustain);

    // Sustain holds for as long as the gate does.
    for _ in 0..50 {
        assert!((env.process(1.0) - 0.5).abs() < 1e-6);
    }

    env.set_trigger(false);
    for n in 1..=8 {
        let out = env.process(1.0);
        assert!(
            (out - (0.5 - 0.0625 * n as f32)).abs() < 1e-6,
            "release step {n}"
        );
    }
    assert!(!env.is_active());
    assert!(env.take_completed());
}

#[test]
fn adsr_gate_off_during_attack_releases_from_current_level() {
    let mut env = adsr(8.0, 4.0, 0.5, 4.0);
    env.set_trigger(true);
    for _ in 0..4 {
        env.process(1.0);
    }
    assert!((env.level() - 0.5).abs() < 1e-6);

    env.set_trigger(false);
    assert_eq!(env.stage(), EnvelopeStage::Release);
    for n in 1..=4 {
        let out = env.process(1.0);
        assert!(
            (out - (0.5 - 0.125 * n as f32)).abs() < 1e-6,
            "release step {n}"
        );
    }
    assert!(!env.is_active());
}

#[test]
fn zero_duration_stages_complete_in_one_step() {
    let mut env = adsr(0.0, 0.0, 0.25, 0.0);
    env.set_trigger(true);
    env.process(1.0);
    // Attack jumped to full scale in a single step.
    assert!(env.level() >= 0.25);
    env.process(1.0);
    env.process(1.0);
    assert_eq!(env.stage(), EnvelopeStage::Sustain);
    assert!((env.level() - 0.25).abs() < 1e-6);

    env.set_trigger(false);
    env.process(1.0);
    assert!(!env.is_active());
}

#[test]
fn output_is_clamped_to_sample_range() {
    let mut env = ahr(0.0, 10.0, 10.0);
    env.set_trigger(true);
    env.process(1.0);
    assert_eq!(env.process(2.0), 1.0);
    assert_eq!(env.process(-2.0), -1.0);
}
