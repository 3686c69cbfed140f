//! Envelope state machines for the voice amplitude and filter paths.
//!
//! Both variants retrigger through a zero-crossing gate: restarting the
//! attack while the processed signal is away from zero would put a step
//! into the output, so a retrigger received mid-flight is deferred until
//! the signal next crosses from non-negative to negative.

/// Stage identifiers shared by both envelope variants. `Hold` belongs
/// to the attack/hold/release envelope, `Decay`/`Sustain` to the ADSR.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStage {
    #[default]
    Idle,
    Attack,
    Hold,
    Decay,
    Sustain,
    Release,
}

fn duration_to_samples(sample_rate: f32, ms: f32) -> u32 {
    if ms <= 0.0 {
        0
    } else {
        (ms * sample_rate / 1000.0 + 0.5) as u32
    }
}

#[inline]
fn ramp_increment(samples: u32, span: f32) -> f32 {
    if samples == 0 {
        // Zero-duration stages complete in a single step.
        1.0
    } else {
        span / samples as f32
    }
}

/// One-shot attack/hold/release envelope. The gate does not cut the
/// envelope short: once triggered it runs attack, holds at full level
/// for the configured hold time, then releases on its own. Re-arming
/// happens through the caller's gate logic.
#[derive(Debug, Clone)]
pub struct AhrEnvelope {
    sample_rate: f32,
    attack_samples: u32,
    hold_samples: u32,
    release_samples: u32,
    stage: EnvelopeStage,
    level: f32,
    hold_remaining: u32,
    release_decrement: f32,
    retrigger_pending: bool,
    previous_sample: f32,
    completed: bool,
}

impl AhrEnvelope {
    pub fn new() -> Self {
        let mut e = Self {
            sample_rate: crate::SAMPLE_RATE,
            attack_samples: 0,
            hold_samples: 0,
            release_samples: 0,
            stage: EnvelopeStage::Idle,
            level: 0.0,
            hold_remaining: 0,
            release_decrement: 0.0,
            retrigger_pending: false,
            previous_sample: 0.0,
            completed: false,
        };
        e.init(crate::SAMPLE_RATE);
        e
    }

    pub fn init(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.stage = EnvelopeStage::Idle;
        self.level = 0.0;
        self.retrigger_pending = false;
        self.previous_sample = 0.0;
        self.completed = false;
        self.set_time(EnvelopeStage::Attack, 5.0);
        self.set_time(EnvelopeStage::Hold, 0.0);
        self.set_time(EnvelopeStage::Release, 100.0);
    }

    /// Configure a stage duration in milliseconds. Stages this variant
    /// does not have are ignored.
    pub fn set_time(&mut self, stage: EnvelopeStage, ms: f32) {
        let samples = duration_to_samples(self.sample_rate, ms);
        match stage {
            EnvelopeStage::Attack => self.attack_samples = samples,
            EnvelopeStage::Hold => self.hold_samples = samples,
            EnvelopeStage::Release => self.release_samples = samples,
            _ => {}
        }
    }

    pub fn set_trigger(&mut self, trigger: bool) {
        if !trigger {
            return;
        }
        if self.stage == EnvelopeStage::Idle {
            self.start_attack();
        } else {
            self.retrigger_pending = true;
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.stage != EnvelopeStage::Idle
    }

    #[inline]
    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    #[inline]
    pub fn level(&self) -> f32 {
        self.level
    }

    /// Drain the completion latch set when the release reaches zero.
    pub fn take_completed(&mut self) -> bool {
        core::mem::take(&mut self.completed)
    }

    fn start_attack(&mut self) {
        self.stage = EnvelopeStage::Attack;
        self.level = 0.0;
    }

    /// Scale one sample by the current level and advance the state
    /// machine by one step.
    #[inline]
    pub fn process(&mut self, sample: f32) -> f32 {
        if self.retrigger_pending && self.previous_sample >= 0.0 && sample < 0.0 {
            self.retrigger_pending = false;
            self.start_attack();
        }
        self.previous_sample = sample;

        match self.stage {
            EnvelopeStage::Idle => {}
            EnvelopeStage::Attack => {
                self.level += ramp_increment(self.attack_samples, 1.0);
                if self.level >= 1.0 {
                    self.level = 1.0;
                    if self.hold_samples > 0 {
                        self.stage = EnvelopeStage::Hold;
                        self.hold_remaining = self.hold_samples;
                    } else {
                        self.enter_release();
                    }
                }
            }
            EnvelopeStage::Hold => {
                self.hold_remaining -= 1;
                if self.hold_remaining == 0 {
                    self.enter_release();
                }
            }
            EnvelopeStage::Release => {
                self.level -= self.release_decrement;
                if self.level <= 0.0 {
                    self.level = 0.0;
                    self.stage = EnvelopeStage::Idle;
                    self.completed = true;
                }
            }
            _ => {}
        }

        (sample * self.level).clamp(-1.0, 1.0)
    }

    fn enter_release(&mut self) {
        self.stage = EnvelopeStage::Release;
        self.release_decrement = ramp_increment(self.release_samples, self.level);
    }
}

impl Default for AhrEnvelope {
    fn default() -> Self {
        Self::new()
    }
}

/// Gate-driven attack/decay/sustain/release envelope.
#[derive(Debug, Clone)]
pub struct AdsrEnvelope {
    sample_rate: f32,
    attack_samples: u32,
    decay_samples: u32,
    release_samples: u32,
    sustain_level: f32,
    stage: EnvelopeStage,
    level: f32,
    release_decrement: f32,
    gate: bool,
    retrigger_pending: bool,
    previous_sample: f32,
    completed: bool,
}

impl AdsrEnvelope {
    pub fn new() -> Self {
        let mut e = Self {
            sample_rate: crate::SAMPLE_RATE,
            attack_samples: 0,
            decay_samples: 0,
            release_samples: 0,
            sustain_level: 1.0,
            stage: EnvelopeStage::Idle,
            level: 0.0,
            release_decrement: 0.0,
            gate: false,
            retrigger_pending: false,
            previous_sample: 0.0,
            completed: false,
        };
        e.init(crate::SAMPLE_RATE);
        e
    }

    pub fn init(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.stage = EnvelopeStage::Idle;
        self.level = 0.0;
        self.gate = false;
        self.retrigger_pending = false;
        self.previous_sample = 0.0;
        self.completed = false;
        self.set_time(EnvelopeStage::Attack, 5.0);
        self.set_time(EnvelopeStage::Decay, 50.0);
        self.set_time(EnvelopeStage::Release, 200.0);
        self.set_sustain_level(0.8);
    }

    pub fn set_time(&mut self, stage: EnvelopeStage, ms: f32) {
        let samples = duration_to_samples(self.sample_rate, ms);
        match stage {
            EnvelopeStage::Attack => self.attack_samples = samples,
            EnvelopeStage::Decay => self.decay_samples = samples,
            EnvelopeStage::Release => self.release_samples = samples,
            _ => {}
        }
    }

    pub fn set_sustain_level(&mut self, level: f32) {
        self.sustain_level = level.clamp(0.0, 1.0);
    }

    pub fn set_trigger(&mut self, trigger: bool) {
        if trigger {
            self.gate = true;
            if self.stage == EnvelopeStage::Idle {
                self.start_attack();
            } else {
                self.retrigger_pending = true;
            }
        } else {
            self.gate = false;
            self.retrigger_pending = false;
            match self.stage {
                EnvelopeStage::Attack | EnvelopeStage::Decay | EnvelopeStage::Sustain => {
                    self.enter_release();
                }
                _ => {}
            }
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.stage != EnvelopeStage::Idle
    }

    #[inline]
    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    #[inline]
    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn take_completed(&mut self) -> bool {
        core::mem::take(&mut self.completed)
    }

    fn start_attack(&mut self) {
        self.stage = EnvelopeStage::Attack;
        self.level = 0.0;
    }

    fn enter_release(&mut self) {
        self.stage = EnvelopeStage::Release;
        self.release_decrement = ramp_increment(self.release_samples, self.level);
    }

    #[inline]
    pub fn process(&mut self, sample: f32) -> f32 {
        if self.retrigger_pending && self.previous_sample >= 0.0 && sample < 0.0 {
            self.retrigger_pending = false;
            self.start_attack();
        }
        self.previous_sample = sample;

        match self.stage {
            EnvelopeStage::Idle => {}
            EnvelopeStage::Attack => {
                self.level += ramp_increment(self.attack_samples, 1.0);
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.stage = EnvelopeStage::Decay;
                }
            }
            EnvelopeStage::Decay => {
                self.level -= ramp_increment(self.decay_samples, 1.0 - self.sustain_level);
                if self.level <= self.sustain_level {
                    self.level = self.sustain_level;
                    self.stage = EnvelopeStage::Sustain;
                }
            }
            EnvelopeStage::Sustain => {
                // Held by the gate; set_trigger(false) moves to Release.
            }
            EnvelopeStage::Release => {
                self.level -= self.release_decrement;
                if self.level <= 0.0 {
                    self.level = 0.0;
                    self.stage = EnvelopeStage::Idle;
                    self.completed = true;
                }
            }
            EnvelopeStage::Hold => {}
        }

        (sample * self.level).clamp(-1.0, 1.0)
    }
}

impl Default for AdsrEnvelope {
    fn default() -> Self {
        Self::new()
    }
}
