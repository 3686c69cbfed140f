//! Offline render of the full engine wiring.
//!
//! Plays a short chord sequence through the polyphonic pool and the
//! effect chain, with the delay synced to a simulated MIDI clock, and
//! writes the result to `out/offline_render.wav`. Voice and effect
//! state is shared between the control side and the audio callback
//! behind a spin mutex, locked only around the minimal mutation, the
//! same critical-section discipline the firmware uses across cores.

use std::sync::Arc;

use simple_logger::SimpleLogger;
use spin::Mutex;

use rackmod_dsp::engine::{audio_scheduler, EngineEvent, Frame};
use rackmod_dsp::fx::biquad::{Biquad, BiquadMode};
use rackmod_dsp::fx::delay::Delay;
use rackmod_dsp::fx::ladder::LadderFilter;
use rackmod_dsp::fx::reverb::Reverb;
use rackmod_dsp::fx::{process_chain, Effect};
use rackmod_dsp::oscillator::Waveform;
use rackmod_dsp::tempo::{BpmEstimator, MIDI_CLOCK, MIDI_START};
use rackmod_dsp::voice::VoicePool;
use rackmod_dsp::SAMPLE_RATE;

const BPM: f32 = 125.0;
const BEATS: usize = 16;
const NUM_VOICES: usize = 6;

struct SynthState {
    pool: VoicePool,
    chain: [Effect; 4],
}

fn main() {
    SimpleLogger::new()
        .with_level(log::LevelFilter::Debug)
        .init()
        .unwrap();

    let samples_per_beat = (60.0 / BPM * SAMPLE_RATE) as usize;

    let mut ladder = LadderFilter::new();
    ladder.init(SAMPLE_RATE);
    ladder.set_cutoff(2400.0);
    ladder.set_resonance(0.35);

    let mut delay = Delay::new(SAMPLE_RATE, 1000.0);
    delay.set_delay_beats(0.75);
    delay.set_feedback(0.45);
    delay.set_wet(0.6);

    let mut reverb = Reverb::new(SAMPLE_RATE);
    reverb.set_rt60(1.8);
    reverb.set_wet(0.25);

    let mut tone = Biquad::new(BiquadMode::HighPass);
    tone.init(SAMPLE_RATE);
    tone.set_cutoff(40.0);

    let synth = Arc::new(Mutex::new(SynthState {
        pool: VoicePool::new(SAMPLE_RATE, NUM_VOICES, 2, Waveform::Saw),
        chain: [
            Effect::Ladder(ladder),
            Effect::Delay(delay),
            Effect::Reverb(reverb),
            Effect::Biquad(tone),
        ],
    }));

    let (mut task, control) = audio_scheduler();
    let emitter = task.emitter();
    let audio_synth = Arc::clone(&synth);
    task.register_callback(move |_input: Frame| {
        let mut state = audio_synth.lock();
        let mixed = state.pool.process() * 0.5;
        let sample = process_chain(&mut state.chain, mixed);
        if let Some(index) = state.pool.poll_finished() {
            emitter.emit(EngineEvent::VoiceFreed(index));
        }
        Frame::mono(sample)
    });
    control.start();

    // Control-side tempo tracking: the estimator consumes a simulated
    // MIDI clock and its reports retune the delay.
    let mut estimator = BpmEstimator::new();
    estimator.on_message(MIDI_START, 0);

    // One chord per bar, root in the second oscillator an octave down.
    let chords: [&[u8]; 4] = [&[45, 57, 60], &[41, 53, 57], &[43, 55, 58], &[38, 50, 53]];

    let mut rendered = Vec::with_capacity(BEATS * samples_per_beat);
    for beat in 0..BEATS {
        let beat_ms = (beat as f32 * 60_000.0 / BPM) as u32;
        for tick in 0..24 {
            let tick_ms = beat_ms + (tick as f32 * 60_000.0 / BPM / 24.0) as u32;
            if let Some(bpm) = estimator.on_message(MIDI_CLOCK, tick_ms) {
                let mut state = synth.lock();
                for effect in state.chain.iter_mut() {
                    if let Effect::Delay(delay) = effect {
                        delay.set_bpm(bpm as f32);
                    }
                }
                log::info!("delay retuned to {bpm} bpm");
            }
        }

        let chord = chords[(beat / 4) % chords.len()];
        if beat % 4 == 0 {
            let mut state = synth.lock();
            for note in chord {
                state.pool.note_on(*note, 100, &[0, -12]);
            }
        }
        if beat % 4 == 3 {
            let mut state = synth.lock();
            for note in chord {
                state.pool.note_off(*note);
            }
        }

        for _ in 0..samples_per_beat {
            rendered.push(task.process(Frame::SILENCE).left);
        }

        while let Some(event) = control.poll_event() {
            log::debug!("event: {event:?}");
        }
    }

    control.request_stop();
    task.process(Frame::SILENCE);
    assert!(matches!(control.poll_event(), Some(EngineEvent::Stopped)));

    write_wav("out/offline_render.wav", &rendered);
    log::info!("rendered {} samples", rendered.len());
}

fn write_wav(path: &str, samples: &[f32]) {
    std::fs::create_dir_all("out").ok();
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE as u32,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for sample in samples {
        writer.write_sample(*sample).unwrap();
    }
    writer.finalize().unwrap();
}
