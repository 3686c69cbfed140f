//! Four-pole transistor-ladder filter emulation.
//!
//! Four saturating one-pole stages in cascade with global resonance
//! feedback. Cutoff and resonance run through per-sample smoothing so
//! panel sweeps stay click-free.

#[allow(unused_imports)]
use num_traits::float::Float;

use crate::utils::smoothed_parameter::SmoothedParameter;
use crate::utils::{flush_denormal, soft_limit};

/// Resonance feedback never reaches the self-oscillation pole.
const MAX_FEEDBACK: f32 = 3.99;
const FEEDBACK_WARP: f32 = 1.386249;
const DEFAULT_SMOOTHING: f32 = 0.001;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum LadderMode {
    #[default]
    LowPass,
    HighPass,
}

#[derive(Debug, Clone)]
pub struct LadderFilter {
    sample_rate: f32,
    mode: LadderMode,
    cutoff: SmoothedParameter,
    resonance: SmoothedParameter,
    stage: [f32; 4],
    feedback_sample: f32,
}

impl LadderFilter {
    pub fn new() -> Self {
        let mut f = Self {
            sample_rate: crate::SAMPLE_RATE,
            mode: LadderMode::LowPass,
            cutoff: SmoothedParameter::new(1000.0, DEFAULT_SMOOTHING),
            resonance: SmoothedParameter::new(0.0, DEFAULT_SMOOTHING),
            stage: [0.0; 4],
            feedback_sample: 0.0,
        };
        f.init(crate::SAMPLE_RATE);
        f
    }

    pub fn init(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.reset();
    }

    pub fn reset(&mut self) {
        self.stage = [0.0; 4];
        self.feedback_sample = 0.0;
    }

    pub fn set_mode(&mut self, mode: LadderMode) {
        self.mode = mode;
    }

    /// Cutoff in Hz, clamped below Nyquist before the warp is applied.
    pub fn set_cutoff(&mut self, cutoff: f32) {
        self.cutoff
            .set_target(cutoff.clamp(10.0, 0.49 * self.sample_rate));
    }

    /// Resonance in 0..1 of the usable range.
    pub fn set_resonance(&mut self, resonance: f32) {
        self.resonance.set_target(resonance.clamp(0.0, 1.0));
    }

    /// Smoothing coefficient for both controls; 0 snaps immediately.
    pub fn set_smoothing(&mut self, coefficient: f32) {
        self.cutoff.set_coefficient(coefficient);
        self.resonance.set_coefficient(coefficient);
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let cutoff = self.cutoff.next();
        let resonance = self.resonance.next();

        // Frequency warp of the normalized cutoff.
        let fc = cutoff / (0.5 * self.sample_rate);
        let p = fc * (1.8 - 0.8 * fc);

        let r = (resonance * ((1.0 - p) * FEEDBACK_WARP).exp()).min(MAX_FEEDBACK);

        let mut x = input - r * self.feedback_sample;
        for stage in self.stage.iter_mut() {
            let saturated = soft_limit(x);
            *stage = flush_denormal(*stage + p * (saturated - *stage));
            x = *stage;
        }
        self.feedback_sample = self.stage[3];

        // Resonance bleeds low-frequency energy; compensate.
        let lowpass = self.stage[3] * (1.0 + resonance * 0.5);

        match self.mode {
            LadderMode::LowPass => lowpass,
            LadderMode::HighPass => input - lowpass,
        }
    }

    pub fn render(&mut self, in_out: &mut [f32]) {
        for sample in in_out.iter_mut() {
            *sample = self.process(*sample);
        }
    }
}

impl Default for LadderFilter {
    fn default() -> Self {
        Self::new()
    }
}
