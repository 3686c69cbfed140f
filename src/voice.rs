//! Polyphonic note slots and the fixed-pool voice allocator.

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::envelope::{AdsrEnvelope, EnvelopeStage};
use crate::oscillator::{Oscillator, Waveform};
use crate::utils::note_to_frequency;

/// Upper bound on unison oscillators per voice.
pub const MAX_OSCILLATORS_PER_VOICE: usize = 3;

/// One note slot: a bank of oscillators, an amplitude envelope and an
/// optional filter envelope, reused across notes for the lifetime of
/// the pool.
#[derive(Debug, Clone)]
pub struct Voice {
    oscillators: [Oscillator; MAX_OSCILLATORS_PER_VOICE],
    oscillator_count: usize,
    amplitude: AdsrEnvelope,
    filter: Option<AdsrEnvelope>,
    note: Option<u8>,
    velocity_gain: f32,
}

impl Voice {
    pub fn new(sample_rate: f32, oscillator_count: usize, waveform: Waveform) -> Self {
        let oscillator_count = oscillator_count.clamp(1, MAX_OSCILLATORS_PER_VOICE);
        let mut oscillators = [
            Oscillator::new(waveform),
            Oscillator::new(waveform),
            Oscillator::new(waveform),
        ];
        for osc in oscillators.iter_mut() {
            osc.init(sample_rate);
        }
        let mut amplitude = AdsrEnvelope::new();
        amplitude.init(sample_rate);

        Self {
            oscillators,
            oscillator_count,
            amplitude,
            filter: None,
            note: None,
            velocity_gain: 0.0,
        }
    }

    /// Attach a filter envelope, retriggered together with the
    /// amplitude envelope. Its level is read back with
    /// [`filter_level`](Self::filter_level).
    pub fn set_filter_envelope(&mut self, envelope: AdsrEnvelope) {
        self.filter = Some(envelope);
    }

    pub fn amplitude_envelope_mut(&mut self) -> &mut AdsrEnvelope {
        &mut self.amplitude
    }

    pub fn oscillator_mut(&mut self, index: usize) -> Option<&mut Oscillator> {
        self.oscillators[..self.oscillator_count].get_mut(index)
    }

    #[inline]
    pub fn is_free(&self) -> bool {
        !self.amplitude.is_active()
    }

    #[inline]
    pub fn note(&self) -> Option<u8> {
        self.note
    }

    /// Start a note. `detune_offsets` holds per-oscillator semitone
    /// offsets for unison spreads; missing entries mean no offset.
    pub fn note_on(&mut self, note: u8, velocity: u8, detune_offsets: &[i8]) {
        for (index, osc) in self.oscillators[..self.oscillator_count].iter_mut().enumerate() {
            let offset = detune_offsets.get(index).copied().unwrap_or(0);
            osc.set_frequency(note_to_frequency(note as f32 + offset as f32));
        }
        // Perceived-loudness curve: normalized velocity squared.
        let normalized = velocity.min(127) as f32 / 127.0;
        self.velocity_gain = normalized * normalized;
        self.note = Some(note);
        self.amplitude.set_trigger(true);
        if let Some(filter) = self.filter.as_mut() {
            filter.set_trigger(true);
        }
    }

    /// Release the voice, but only when `note` matches the note it is
    /// playing. A stale note-off must not cut a reassigned voice.
    pub fn note_off(&mut self, note: u8) {
        if self.note == Some(note) {
            self.amplitude.set_trigger(false);
            if let Some(filter) = self.filter.as_mut() {
                filter.set_trigger(false);
            }
        }
    }

    /// Current filter-envelope level, 0 when no filter envelope is
    /// attached.
    #[inline]
    pub fn filter_level(&self) -> f32 {
        self.filter.as_ref().map_or(0.0, |f| f.level())
    }

    pub fn take_completed(&mut self) -> bool {
        self.amplitude.take_completed()
    }

    /// Produce one sample: oscillator mix, amplitude envelope, velocity.
    #[inline]
    pub fn process(&mut self) -> f32 {
        let mut mix = 0.0;
        for osc in self.oscillators[..self.oscillator_count].iter_mut() {
            mix += osc.next_sample();
        }
        mix /= self.oscillator_count as f32;

        if let Some(filter) = self.filter.as_mut() {
            filter.process(mix);
        }

        let shaped = self.amplitude.process(mix);
        (shaped * self.velocity_gain).clamp(-1.0, 1.0)
    }

    /// True once the gate was released and the amplitude envelope is
    /// ramping down.
    pub fn is_releasing(&self) -> bool {
        self.amplitude.stage() == EnvelopeStage::Release
    }
}

/// Fixed pool of voices allocated once at init and referenced by index.
/// Allocation is a linear free-slot scan; when every voice is busy the
/// note is dropped, never stolen.
#[derive(Debug)]
pub struct VoicePool {
    voices: Box<[Voice]>,
}

impl VoicePool {
    pub fn new(
        sample_rate: f32,
        num_voices: usize,
        oscillators_per_voice: usize,
        waveform: Waveform,
    ) -> Self {
        let num_voices = num_voices.max(1);
        let voices: Vec<Voice> = (0..num_voices)
            .map(|_| Voice::new(sample_rate, oscillators_per_voice, waveform))
            .collect();
        Self {
            voices: voices.into_boxed_slice(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.voices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    pub fn voice(&self, index: usize) -> Option<&Voice> {
        self.voices.get(index)
    }

    pub fn voice_mut(&mut self, index: usize) -> Option<&mut Voice> {
        self.voices.get_mut(index)
    }

    /// Index of the first voice whose amplitude envelope is inactive.
    pub fn find_free_voice(&self) -> Option<usize> {
        self.voices.iter().position(Voice::is_free)
    }

    /// Allocate a voice and start the note on it. Returns the voice
    /// index, or `None` when the pool is exhausted and the note was
    /// dropped.
    pub fn note_on(&mut self, note: u8, velocity: u8, detune_offsets: &[i8]) -> Option<usize> {
        match self.find_free_voice() {
            Some(index) => {
                self.voices[index].note_on(note, velocity, detune_offsets);
                Some(index)
            }
            None => {
                log::debug!("no free voice, dropping note {}", note);
                None
            }
        }
    }

    /// Release every voice currently holding `note`.
    pub fn note_off(&mut self, note: u8) {
        for voice in self.voices.iter_mut() {
            voice.note_off(note);
        }
    }

    /// Sum of all voices for one sample period.
    #[inline]
    pub fn process(&mut self) -> f32 {
        let mut mix = 0.0;
        for voice in self.voices.iter_mut() {
            mix += voice.process();
        }
        mix
    }

    /// Drain one completed-voice latch, if any. Called after processing
    /// so the integrator can forward voice-freed events to the control
    /// context.
    pub fn poll_finished(&mut self) -> Option<usize> {
        self.voices
            .iter_mut()
            .position(|voice| voice.take_completed())
    }
}
