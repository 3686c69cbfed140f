//! Effects of the module family's signal chain.

pub mod biquad;
pub mod delay;
pub mod ladder;
pub mod reverb;

use biquad::Biquad;
use delay::Delay;
use ladder::LadderFilter;
use reverb::Reverb;

/// The closed set of chainable effects, dispatched by match rather than
/// through trait objects so the hot path has no indirect calls.
#[derive(Debug)]
pub enum Effect {
    Delay(Delay),
    Ladder(LadderFilter),
    Biquad(Biquad),
    Reverb(Reverb),
}

impl Effect {
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        match self {
            Effect::Delay(fx) => fx.process(input),
            Effect::Ladder(fx) => fx.process(input),
            Effect::Biquad(fx) => fx.process(input),
            Effect::Reverb(fx) => fx.process(input),
        }
    }

    pub fn reset(&mut self) {
        match self {
            Effect::Delay(fx) => fx.reset(),
            Effect::Ladder(fx) => fx.reset(),
            Effect::Biquad(fx) => fx.reset(),
            Effect::Reverb(fx) => fx.reset(),
        }
    }
}

/// Run a sample through a chain of effects in order.
#[inline]
pub fn process_chain(chain: &mut [Effect], input: f32) -> f32 {
    let mut sample = input;
    for effect in chain.iter_mut() {
        sample = effect.process(sample);
    }
    sample
}
