//! Tempo-synced feedback delay line.

use crate::fx::biquad::{Biquad, BiquadMode};
use crate::utils::delay_line::DelayLine;
use crate::utils::smoothed_parameter::SmoothedParameter;

const MAX_FEEDBACK: f32 = 0.99;
const DEFAULT_MAX_DELAY_MS: f32 = 2000.0;
const DEFAULT_FEEDBACK_CUTOFF: f32 = 6000.0;
/// Delay-time changes glide slowly; jumping the read tap shifts pitch.
const TIME_SMOOTHING: f32 = 0.000_5;
const MIX_SMOOTHING: f32 = 0.001;

#[derive(Debug)]
pub struct Delay {
    sample_rate: f32,
    line: DelayLine,
    feedback_filter: Biquad,
    delay_samples: SmoothedParameter,
    wet: SmoothedParameter,
    feedback: f32,
    delay_beats: f32,
    bpm: f32,
}

impl Delay {
    /// Allocates the line once for `max_delay_ms` worth of samples;
    /// nothing reallocates after this.
    pub fn new(sample_rate: f32, max_delay_ms: f32) -> Self {
        let max_delay_ms = if max_delay_ms > 0.0 {
            max_delay_ms
        } else {
            DEFAULT_MAX_DELAY_MS
        };
        let capacity = (max_delay_ms * sample_rate / 1000.0) as usize;

        let mut feedback_filter = Biquad::new(BiquadMode::LowPass);
        feedback_filter.init(sample_rate);
        feedback_filter.set_cutoff(DEFAULT_FEEDBACK_CUTOFF);

        let mut delay = Self {
            sample_rate,
            line: DelayLine::new(capacity),
            feedback_filter,
            delay_samples: SmoothedParameter::new(0.0, TIME_SMOOTHING),
            wet: SmoothedParameter::new(0.0, MIX_SMOOTHING),
            feedback: 0.5,
            delay_beats: 1.0,
            bpm: 120.0,
        };
        delay.update_delay_target();
        delay.delay_samples.snap_to(delay.delay_samples.target());
        delay
    }

    pub fn reset(&mut self) {
        self.line.reset();
        self.feedback_filter.reset();
    }

    /// Delay length in beats (quarter notes) of the current tempo.
    pub fn set_delay_beats(&mut self, beats: f32) {
        self.delay_beats = beats.max(0.0);
        self.update_delay_target();
    }

    /// Tempo in BPM, typically fed from the clock estimator.
    pub fn set_bpm(&mut self, bpm: f32) {
        if bpm > 0.0 {
            self.bpm = bpm;
            self.update_delay_target();
        }
    }

    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = feedback.clamp(0.0, MAX_FEEDBACK);
    }

    pub fn set_wet(&mut self, wet: f32) {
        self.wet.set_target(wet.clamp(0.0, 1.0));
    }

    /// Cutoff of the lowpass in the feedback path. At or above Nyquist
    /// the filter is bypassed entirely.
    pub fn set_feedback_cutoff(&mut self, cutoff: f32) {
        self.feedback_filter.set_cutoff(cutoff);
    }

    /// Smoothing coefficients for delay time and wet mix; 0 snaps.
    pub fn set_smoothing(&mut self, time_coefficient: f32, mix_coefficient: f32) {
        self.delay_samples.set_coefficient(time_coefficient);
        self.wet.set_coefficient(mix_coefficient);
    }

    fn update_delay_target(&mut self) {
        let samples = 60.0 * self.delay_beats / self.bpm * self.sample_rate;
        let max = (self.line.max_delay() - 1) as f32;
        self.delay_samples.set_target(samples.clamp(0.0, max));
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let delay = self.delay_samples.next();
        let wet = self.wet.next();

        if delay < 1.0 {
            return input;
        }

        let delayed = self.line.read_with_delay_frac(delay);
        let filtered = if self.feedback_filter.cutoff() >= 0.49 * self.sample_rate {
            delayed
        } else {
            self.feedback_filter.process(delayed)
        };
        let feedback_signal = filtered * self.feedback;

        self.line.write(input + feedback_signal);

        // Dry level never drops below 0.9; full-wet operation is not
        // supported on this hardware family.
        let dry = (1.0 - wet).max(0.9);
        input * dry + feedback_signal * wet
    }

    pub fn render(&mut self, in_out: &mut [f32]) {
        for sample in in_out.iter_mut() {
            *sample = self.process(*sample);
        }
    }
}
