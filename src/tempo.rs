//! MIDI-clock tempo tracking.
//!
//! The estimator counts realtime clock ticks (24 per quarter note),
//! keeps a short circular history of beat timestamps and produces a
//! smoothed, hysteresis-gated BPM report. Reports are rate-limited so a
//! wobbly external clock does not flood the consumers, but a changed
//! tempo is always reported eventually.

#[allow(unused_imports)]
use num_traits::float::Float;

/// MIDI realtime status bytes understood by the estimator.
pub const MIDI_CLOCK: u8 = 0xF8;
pub const MIDI_START: u8 = 0xFA;
pub const MIDI_CONTINUE: u8 = 0xFB;
pub const MIDI_STOP: u8 = 0xFC;

pub const TICKS_PER_QUARTER_NOTE: u32 = 24;

const BEAT_HISTORY: usize = 8;
const BEAT_INTERVALS: f32 = (BEAT_HISTORY - 1) as f32;
/// Estimates during lock-in converge fast, later ones favor stability.
const LOCK_IN_ESTIMATES: u32 = 4;
const FAST_SMOOTHING: f32 = 0.5;
const SLOW_SMOOTHING: f32 = 0.1;
const MIN_REPORT_DELTA: f32 = 1.0;
const MAX_UNREPORTED_BEATS: u32 = 16;
const MIN_BPM: f32 = 20.0;
const MAX_BPM: f32 = 999.0;

#[derive(Debug)]
pub struct BpmEstimator {
    tick_count: u32,
    timestamps_ms: [u32; BEAT_HISTORY],
    head: usize,
    stored: usize,
    smoothed_bpm: f32,
    estimates: u32,
    last_reported: Option<u16>,
    beats_since_report: u32,
}

impl BpmEstimator {
    pub fn new() -> Self {
        Self {
            tick_count: 0,
            timestamps_ms: [0; BEAT_HISTORY],
            head: 0,
            stored: 0,
            smoothed_bpm: 0.0,
            estimates: 0,
            last_reported: None,
            beats_since_report: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Smoothed estimate, available once the beat history has filled.
    pub fn bpm(&self) -> Option<f32> {
        (self.estimates > 0).then_some(self.smoothed_bpm)
    }

    /// Feed one MIDI realtime status byte with its arrival time in
    /// milliseconds. Returns a rounded BPM when a report is due.
    pub fn on_message(&mut self, status: u8, now_ms: u32) -> Option<u16> {
        match status {
            MIDI_CLOCK => self.on_clock_tick(now_ms),
            MIDI_START | MIDI_CONTINUE | MIDI_STOP => {
                log::debug!("transport message {:#04x}, tempo state reset", status);
                self.reset();
                None
            }
            _ => None,
        }
    }

    /// Feed one clock tick. Estimation only runs on every 24th tick.
    pub fn on_clock_tick(&mut self, now_ms: u32) -> Option<u16> {
        self.tick_count += 1;
        if self.tick_count < TICKS_PER_QUARTER_NOTE {
            return None;
        }
        self.tick_count = 0;

        self.timestamps_ms[self.head] = now_ms;
        self.head = (self.head + 1) % BEAT_HISTORY;
        if self.stored < BEAT_HISTORY {
            self.stored += 1;
            if self.stored < BEAT_HISTORY {
                return None;
            }
        }
        self.beats_since_report += 1;

        // The slot the head now points at is the oldest timestamp; the
        // span to the newest covers BEAT_HISTORY - 1 intervals.
        let span_ms = now_ms.wrapping_sub(self.timestamps_ms[self.head]);
        if span_ms == 0 {
            return None;
        }
        let instantaneous = 60_000.0 * BEAT_INTERVALS / span_ms as f32;
        if !(MIN_BPM..=MAX_BPM).contains(&instantaneous) {
            return None;
        }

        if self.estimates == 0 {
            self.smoothed_bpm = instantaneous;
        } else {
            let coefficient = if self.estimates < LOCK_IN_ESTIMATES {
                FAST_SMOOTHING
            } else {
                SLOW_SMOOTHING
            };
            self.smoothed_bpm += coefficient * (instantaneous - self.smoothed_bpm);
        }
        self.estimates += 1;

        self.report()
    }

    fn report(&mut self) -> Option<u16> {
        let rounded = (self.smoothed_bpm + 0.5) as u16;
        let due = match self.last_reported {
            None => true,
            Some(last) => {
                rounded != last
                    && (self.estimates <= LOCK_IN_ESTIMATES
                        || (self.smoothed_bpm - last as f32).abs() >= MIN_REPORT_DELTA
                        || self.beats_since_report >= MAX_UNREPORTED_BEATS)
            }
        };
        if !due {
            return None;
        }
        self.last_reported = Some(rounded);
        self.beats_since_report = 0;
        log::debug!("tempo report: {} bpm", rounded);
        Some(rounded)
    }
}

impl Default for BpmEstimator {
    fn default() -> Self {
        Self::new()
    }
}
