//! Tests for the effects: delay, ladder, biquad, reverb.


use core::f32::consts::TAU;

use rackmod_dsp::fx::biquad::{Biquad, BiquadMode};
use rackmod_dsp::fx::delay::Delay;
use rackmod_dsp::fx::ladder::{LadderFilter, LadderMode};
use rackmod_dsp::fx::reverb::{AllpassFilter, CombFilter, Reverb};
use rackmod_dsp::fx::{process_chain, Effect};
use rackmod_dsp::utils::delay_line::DelayLine;
use rackmod_dsp::SAMPLE_RATE;

fn impulse_response<F: FnMut(f32) -> f32>(mut process: F, length: usize) -> Vec<f32> {
    (0..length)
        .map(|n| process(if n == 0 { 1.0 } else { 0.0 }))
        .collect()
}

#[test]
fn delay_line_recovers_written_samples_by_age() {
    for capacity in [2usize, 3, 7, 64] {
        let mut line = DelayLine::new(capacity);
        line.write(0.25);
        line.write(0.5);

        // One tap back is the latest write, two taps back the one
        // before it, for any line length.
        assert_eq!(line.read_with_delay(1), 0.5, "capacity {capacity}");
        assert_eq!(line.read_with_delay(2), 0.25, "capacity {capacity}");
    }

    let mut line = DelayLine::new(4);
    for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
        line.write(v);
    }
    // The oldest slot has been overwritten; the full-length tap reads
    // the oldest value still stored.
    assert_eq!(line.read(), 2.0);
    assert_eq!(line.read_with_delay(1), 5.0);

    line.reset();
    assert_eq!(line.read(), 0.0);
    assert_eq!(line.max_delay(), 4);
}

#[test]
fn comb_impulse_response_is_geometric() {
    let delay = 10;
    let feedback = 0.5;
    let mut comb = CombFilter::new(delay, feedback);

    let out = impulse_response(|x| comb.process(x), 45);

    for (n, sample) in out.iter().enumerate() {
        if n > 0 && n % delay == 0 {
            let k = n / delay;
            let expected = feedback.powi(k as i32 - 1);
            assert!(
                (sample - expected).abs() < 1e-6,
                "echo {k} at sample {n}: expected {expected}, got {sample}"
            );
        } else {
            assert!(sample.abs() < 1e-9, "sample {n} should be silent");
        }
    }
}

#[test]
fn allpass_impulse_response_matches_closed_form() {
    let delay = 8;
    let feedback = 0.8;
    let mut allpass = AllpassFilter::new(delay, feedback);

    let out = impulse_response(|x| allpass.process(x), 9);

    assert!((out[0] - -feedback).abs() < 1e-6, "got {}", out[0]);
    assert!(
        (out[delay] - (1.0 - feedback * feedback)).abs() < 1e-6,
        "got {}",
        out[delay]
    );
    for (n, sample) in out.iter().enumerate().take(delay).skip(1) {
        assert!(sample.abs() < 1e-9, "sample {n} should be silent");
    }
}

#[test]
fn delay_produces_decaying_echoes() {
    let mut delay = Delay::new(SAMPLE_RATE, 100.0);
    delay.set_smoothing(0.0, 0.0);
    // Feedback filter at Nyquist: bypassed so amplitudes are exact.
    delay.set_feedback_cutoff(SAMPLE_RATE);
    delay.set_feedback(0.5);
    delay.set_wet(1.0);
    delay.set_bpm(120.0);
    // 0.000125 beats at 120 BPM is exactly 3 samples at 48 kHz.
    delay.set_delay_beats(0.000125);

    let out = impulse_response(|x| delay.process(x), 12);

    assert!((out[0] - 0.9).abs() < 1e-4, "dry tap: {}", out[0]);
    assert!((out[3] - 0.5).abs() < 1e-4, "echo 1: {}", out[3]);
    assert!((out[6] - 0.25).abs() < 1e-4, "echo 2: {}", out[6]);
    assert!((out[9] - 0.125).abs() < 1e-4, "echo 3: {}", out[9]);
    for n in [1, 2, 4, 5, 7, 8, 10, 11] {
        assert!(out[n].abs() < 1e-4, "sample {n} should be silent");
    }
}

#[test]
fn delay_below_one_sample_passes_dry() {
    let mut delay = Delay::new(SAMPLE_RATE, 100.0);
    delay.set_smoothing(0.0, 0.0);
    delay.set_wet(1.0);
    delay.set_delay_beats(0.0);

    let dry: Vec<f32> = (0..16).map(|n| (n as f32 * 0.1).sin()).collect();
    let mut processed = dry.clone();
    delay.render(&mut processed);
    assert_eq!(processed, dry);
}

#[test]
fn delay_time_is_clamped_to_capacity() {
    let mut delay = Delay::new(SAMPLE_RATE, 10.0);
    delay.set_smoothing(0.0, 0.0);
    delay.set_feedback_cutoff(SAMPLE_RATE);
    delay.set_feedback(0.5);
    delay.set_wet(1.0);
    // 4 beats at 60 BPM wants 4 s; the line only holds 10 ms.
    delay.set_bpm(60.0);
    delay.set_delay_beats(4.0);

    let capacity = (10.0 * SAMPLE_RATE / 1000.0) as usize;
    let out = impulse_response(|x| delay.process(x), capacity + 2);
    let echo_at = out
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, s)| s.abs() > 1e-3)
        .map(|(n, _)| n);
    assert_eq!(echo_at, Some(capacity - 1));
}

#[test]
fn ladder_passes_dc_with_open_cutoff() {
    let mut filter = LadderFilter::new();
    filter.init(SAMPLE_RATE);
    filter.set_smoothing(0.0);
    filter.set_cutoff(20_000.0);
    filter.set_resonance(0.0);

    let mut out = 0.0;
    for _ in 0..2000 {
        out = filter.process(0.1);
    }
    assert!((out - 0.1).abs() < 5e-3, "settled at {out}");
}

#[test]
fn ladder_highpass_is_input_minus_lowpass() {
    let mut lowpass = LadderFilter::new();
    let mut highpass = LadderFilter::new();
    for f in [&mut lowpass, &mut highpass] {
        f.init(SAMPLE_RATE);
        f.set_smoothing(0.0);
        f.set_cutoff(800.0);
        f.set_resonance(0.3);
    }
    highpass.set_mode(LadderMode::HighPass);

    for n in 0..1024 {
        let input = (TAU * 220.0 * n as f32 / SAMPLE_RATE).sin();
        let lp = lowpass.process(input);
        let hp = highpass.process(input);
        assert!((lp + hp - input).abs() < 1e-5, "sample {n}");
    }
}

#[test]
fn ladder_stays_bounded_at_full_resonance() {
    let mut filter = LadderFilter::new();
    filter.init(SAMPLE_RATE);
    filter.set_smoothing(0.0);
    filter.set_cutoff(2000.0);
    filter.set_resonance(1.0);

    let mut out = vec![0.0; 48_000];
    out[0] = 1.0;
    filter.render(&mut out);
    for (n, sample) in out.iter().enumerate() {
        assert!(sample.is_finite(), "sample {n} not finite");
        assert!(sample.abs() < 10.0, "sample {n} unbounded: {sample}");
    }
}

#[test]
fn biquad_lowpass_separates_bands() {
    let rms = |cutoff: f32, tone: f32| -> f32 {
        let mut filter = Biquad::new(BiquadMode::LowPass);
        filter.init(SAMPLE_RATE);
        filter.set_cutoff(cutoff);
        filter.set_q(core::f32::consts::FRAC_1_SQRT_2);

        let total = 9600;
        let mut buffer: Vec<f32> = (0..total)
            .map(|n| (TAU * tone * n as f32 / SAMPLE_RATE).sin())
            .collect();
        filter.render(&mut buffer);

        let tail = &buffer[total / 2..];
        (tail.iter().map(|y| y * y).sum::<f32>() / tail.len() as f32).sqrt()
    };

    let passed = rms(200.0, 50.0);
    let stopped = rms(200.0, 8000.0);
    assert!(passed > 0.6, "passband rms {passed}");
    assert!(stopped < 0.05, "stopband rms {stopped}");
}

#[test]
fn biquad_highpass_separates_bands() {
    let rms = |tone: f32| -> f32 {
        let mut filter = Biquad::new(BiquadMode::HighPass);
        filter.init(SAMPLE_RATE);
        filter.set_cutoff(2000.0);

        let mut sum = 0.0;
        let total = 9600;
        for n in 0..total {
            let y = filter.process((TAU * tone * n as f32 / SAMPLE_RATE).sin());
            if n >= total / 2 {
                sum += y * y;
            }
        }
        (sum / (total / 2) as f32).sqrt()
    };

    assert!(rms(8000.0) > 0.6);
    assert!(rms(50.0) < 0.05);
}

#[test]
fn reverb_tail_follows_rt60() {
    let tail_energy = |rt60: f32| -> f32 {
        let mut reverb = Reverb::new(SAMPLE_RATE);
        reverb.set_smoothing(0.0);
        reverb.set_wet(1.0);
        reverb.set_rt60(rt60);

        let out = impulse_response(|x| reverb.process(x), 24_000);
        out[18_000..].iter().map(|s| s * s).sum()
    };

    let short = tail_energy(0.2);
    let long = tail_energy(2.5);
    assert!(
        long > 10.0 * short,
        "long tail {long} vs short tail {short}"
    );
}

#[test]
fn reverb_produces_a_diffuse_response() {
    let mut reverb = Reverb::new(SAMPLE_RATE);
    reverb.set_smoothing(0.0);
    reverb.set_wet(1.0);
    reverb.set_rt60(1.5);

    let mut out = vec![0.0; 48_000];
    out[0] = 1.0;
    reverb.render(&mut out);
    let nonzero = out.iter().filter(|s| s.abs() > 1e-5).count();
    assert!(nonzero > 10_000, "only {nonzero} audible samples");
    assert!(out.iter().all(|s| s.is_finite()));

    wav_writer::write("fx/reverb_impulse.wav", &out).ok();
}

#[test]
fn effect_chain_dispatches_in_order() {
    let mut chain = [
        Effect::Biquad({
            let mut f = Biquad::new(BiquadMode::LowPass);
            f.init(SAMPLE_RATE);
            f.set_cutoff(12_000.0);
            f
        }),
        Effect::Ladder({
            let mut f = LadderFilter::new();
            f.init(SAMPLE_RATE);
            f.set_smoothing(0.0);
            f.set_cutoff(18_000.0);
            f
        }),
    ];

    let mut settled = 0.0;
    for _ in 0..4000 {
        settled = process_chain(&mut chain, 0.1);
    }
    assert!((settled - 0.1).abs() < 1e-2, "chain settled at {settled}");

    for effect in chain.iter_mut() {
        effect.reset();
    }
    assert!(process_chain(&mut chain, 0.0).abs() < 1e-9);
}
