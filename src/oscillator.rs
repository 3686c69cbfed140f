//! Waveform generators driven by an integer phase accumulator.
//!
//! Frequency changes are committed only when the phase counter wraps
//! back to zero, so a running cycle is never shortened or stretched
//! mid-waveform.

#[allow(unused_imports)]
use num_traits::float::Float;

use core::f32::consts::TAU;

const MIN_DUTY_PERCENT: f32 = 5.0;
const MAX_DUTY_PERCENT: f32 = 95.0;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    #[default]
    Saw,
    Sine,
    Square,
    Triangle,
}

#[derive(Debug, Clone)]
pub struct Oscillator {
    waveform: Waveform,
    sample_rate: f32,
    phase: u32,
    period: u32,
    pending_period: u32,
    duty_percent: f32,
}

impl Oscillator {
    pub fn new(waveform: Waveform) -> Self {
        Self {
            waveform,
            sample_rate: crate::SAMPLE_RATE,
            phase: 0,
            period: 0,
            pending_period: 0,
            duty_percent: 50.0,
        }
    }

    pub fn init(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.phase = 0;
        self.period = 0;
        self.pending_period = 0;
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    #[inline]
    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Store the cycle length for `frequency` Hz. Takes effect at the
    /// next phase wrap. Non-positive frequencies map to a zero period,
    /// which renders as silence.
    #[inline]
    pub fn set_frequency(&mut self, frequency: f32) {
        self.pending_period = if frequency > 0.0 {
            (self.sample_rate / frequency + 0.5) as u32
        } else {
            0
        };
    }

    /// Square-wave duty cycle in percent, clamped to 5..95.
    pub fn set_duty_cycle(&mut self, percent: f32) {
        self.duty_percent = percent.clamp(MIN_DUTY_PERCENT, MAX_DUTY_PERCENT);
    }

    pub fn reset(&mut self) {
        self.phase = 0;
    }

    /// Produce one sample in [-1, 1] and advance the phase.
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        if self.phase == 0 {
            self.period = self.pending_period;
        }
        let period = self.period;
        if period == 0 {
            return 0.0;
        }

        let phase = self.phase as f32;
        let length = period as f32;
        let sample = match self.waveform {
            Waveform::Saw => 2.0 * phase / length - 1.0,
            Waveform::Sine => (TAU * phase / length).sin(),
            Waveform::Square => {
                if phase * 100.0 < length * self.duty_percent {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Triangle => {
                let half = length * 0.5;
                if phase < half {
                    2.0 * phase / half - 1.0
                } else {
                    1.0 - 2.0 * (phase - half) / half
                }
            }
        };

        self.phase += 1;
        if self.phase >= period {
            self.phase = 0;
        }

        sample
    }

    /// Fill a buffer, one [`next_sample`](Self::next_sample) per slot.
    pub fn render(&mut self, out: &mut [f32]) {
        for out_sample in out.iter_mut() {
            *out_sample = self.next_sample();
        }
    }
}
