//! Comb/all-pass reverberator.
//!
//! Four parallel comb filters feed a serial chain of four all-pass
//! diffusers. Comb feedback is derived from the requested RT60 per
//! filter, so the four lines decay at the same physical rate despite
//! their different lengths.

#[allow(unused_imports)]
use num_traits::float::Float;

use crate::utils::crossfade;
use crate::utils::delay_line::DelayLine;
use crate::utils::smoothed_parameter::SmoothedParameter;

/// Mutually detuned comb lengths in milliseconds.
const COMB_DELAYS_MS: [f32; 4] = [29.7, 37.1, 41.1, 43.7];
/// All-pass lengths in milliseconds, shortest last.
const ALLPASS_DELAYS_MS: [f32; 4] = [5.0, 3.7, 1.27, 0.63];
const ALLPASS_FEEDBACK: f32 = 0.8;
/// Comb feedback stays clear of the self-oscillation bound.
const MAX_COMB_FEEDBACK: f32 = 0.98;
const MIX_SMOOTHING: f32 = 0.001;

/// Single-delay-line feedback comb. Produces echoes every
/// `delay_samples` with geometric decay `feedback^k`.
#[derive(Debug)]
pub struct CombFilter {
    line: DelayLine,
    feedback: f32,
}

impl CombFilter {
    pub fn new(delay_samples: usize, feedback: f32) -> Self {
        Self {
            line: DelayLine::new(delay_samples.max(1)),
            feedback: feedback.clamp(0.0, MAX_COMB_FEEDBACK),
        }
    }

    pub fn reset(&mut self) {
        self.line.reset();
    }

    #[inline]
    pub fn delay_samples(&self) -> usize {
        self.line.max_delay()
    }

    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = feedback.clamp(0.0, MAX_COMB_FEEDBACK);
    }

    #[inline]
    pub fn feedback(&self) -> f32 {
        self.feedback
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let delayed = self.line.read();
        self.line.write(input + delayed * self.feedback);
        delayed
    }
}

/// Schroeder all-pass section: flat magnitude at steady state, smears
/// phase. `output = delayed - feedback * input`,
/// `buffered = input + feedback * output`.
#[derive(Debug)]
pub struct AllpassFilter {
    line: DelayLine,
    feedback: f32,
}

impl AllpassFilter {
    pub fn new(delay_samples: usize, feedback: f32) -> Self {
        Self {
            line: DelayLine::new(delay_samples.max(1)),
            feedback,
        }
    }

    pub fn reset(&mut self) {
        self.line.reset();
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let delayed = self.line.read();
        let output = delayed - self.feedback * input;
        self.line.write(input + self.feedback * output);
        output
    }
}

#[derive(Debug)]
pub struct Reverb {
    sample_rate: f32,
    combs: [CombFilter; 4],
    allpasses: [AllpassFilter; 4],
    wet: SmoothedParameter,
    rt60: f32,
}

impl Reverb {
    pub fn new(sample_rate: f32) -> Self {
        let comb_at = |ms: f32| ((ms * sample_rate / 1000.0) as usize).max(1);
        let mut reverb = Self {
            sample_rate,
            combs: COMB_DELAYS_MS.map(|ms| CombFilter::new(comb_at(ms), 0.0)),
            allpasses: ALLPASS_DELAYS_MS
                .map(|ms| AllpassFilter::new(comb_at(ms), ALLPASS_FEEDBACK)),
            wet: SmoothedParameter::new(0.3, MIX_SMOOTHING),
            rt60: 2.0,
        };
        reverb.set_rt60(reverb.rt60);
        reverb
    }

    pub fn reset(&mut self) {
        for comb in self.combs.iter_mut() {
            comb.reset();
        }
        for allpass in self.allpasses.iter_mut() {
            allpass.reset();
        }
    }

    /// Decay time to -60 dB in seconds. Recomputes each comb's feedback
    /// from its own delay length so all four decay at the same rate.
    pub fn set_rt60(&mut self, rt60: f32) {
        self.rt60 = rt60.max(0.05);
        for comb in self.combs.iter_mut() {
            let delay_samples = comb.delay_samples() as f32;
            let exponent = -3.0 * delay_samples / (self.sample_rate * self.rt60);
            comb.set_feedback(10.0_f32.powf(exponent));
        }
    }

    #[inline]
    pub fn rt60(&self) -> f32 {
        self.rt60
    }

    pub fn set_wet(&mut self, wet: f32) {
        self.wet.set_target(wet.clamp(0.0, 1.0));
    }

    pub fn set_smoothing(&mut self, coefficient: f32) {
        self.wet.set_coefficient(coefficient);
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let mut tank = 0.0;
        for comb in self.combs.iter_mut() {
            tank += comb.process(input);
        }
        tank *= 0.25;

        for allpass in self.allpasses.iter_mut() {
            tank = allpass.process(tank);
        }

        crossfade(input, tank, self.wet.next())
    }

    pub fn render(&mut self, in_out: &mut [f32]) {
        for sample in in_out.iter_mut() {
            *sample = self.process(*sample);
        }
    }
}
