//! Second-order IIR filter, RBJ cookbook coefficients.
//!
//! Serves as pre/post coloration and as the delay's feedback-path
//! lowpass. Parameters are not smoothed here; a caller that modulates
//! cutoff or Q at audio rate wraps them in a
//! [`SmoothedParameter`](crate::utils::smoothed_parameter::SmoothedParameter)
//! of its own.

#[allow(unused_imports)]
use num_traits::float::Float;

use core::f32::consts::TAU;

use crate::utils::flush_denormal;

const MIN_Q: f32 = 0.05;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum BiquadMode {
    #[default]
    LowPass,
    HighPass,
}

#[derive(Debug, Clone)]
pub struct Biquad {
    sample_rate: f32,
    mode: BiquadMode,
    cutoff: f32,
    q: f32,

    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,

    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl Biquad {
    pub fn new(mode: BiquadMode) -> Self {
        let mut f = Self {
            sample_rate: crate::SAMPLE_RATE,
            mode,
            cutoff: 1000.0,
            q: core::f32::consts::FRAC_1_SQRT_2,
            b0: 0.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        };
        f.init(crate::SAMPLE_RATE);
        f
    }

    pub fn init(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.reset();
        self.update_coeffs();
    }

    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }

    pub fn set_mode(&mut self, mode: BiquadMode) {
        self.mode = mode;
        self.update_coeffs();
    }

    pub fn set_cutoff(&mut self, cutoff: f32) {
        self.cutoff = cutoff.clamp(1.0, 0.497 * self.sample_rate);
        self.update_coeffs();
    }

    pub fn set_q(&mut self, q: f32) {
        self.q = q.max(MIN_Q);
        self.update_coeffs();
    }

    #[inline]
    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }

    fn update_coeffs(&mut self) {
        let omega = TAU * self.cutoff / self.sample_rate;
        let sin_omega = omega.sin();
        let cos_omega = omega.cos();
        let alpha = sin_omega / (2.0 * self.q);

        let (b0, b1, b2) = match self.mode {
            BiquadMode::LowPass => {
                let b1 = 1.0 - cos_omega;
                (b1 * 0.5, b1, b1 * 0.5)
            }
            BiquadMode::HighPass => {
                let b1 = -(1.0 + cos_omega);
                (-b1 * 0.5, b1, -b1 * 0.5)
            }
        };
        let a0 = 1.0 + alpha;
        let a0_inv = 1.0 / a0;

        self.b0 = b0 * a0_inv;
        self.b1 = b1 * a0_inv;
        self.b2 = b2 * a0_inv;
        self.a1 = -2.0 * cos_omega * a0_inv;
        self.a2 = (1.0 - alpha) * a0_inv;
    }

    /// Direct-form-1 step on the two-sample input/output histories.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let output = self.b0 * input + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = flush_denormal(self.y1);
        self.y1 = flush_denormal(output);

        output
    }

    pub fn render(&mut self, in_out: &mut [f32]) {
        for sample in in_out.iter_mut() {
            *sample = self.process(*sample);
        }
    }
}
