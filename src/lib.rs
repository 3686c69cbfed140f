#![doc = include_str!("../README.md")]
#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod engine;
pub mod envelope;
pub mod fx;
pub mod oscillator;
pub mod tempo;
pub mod utils;
pub mod voice;

/// Native sample rate of the module family in Hz.
///
/// Components take their sample rate at `init` so tests and offline
/// renders can run at other rates; this constant is the hardware
/// default.
pub const SAMPLE_RATE: f32 = 48_000.0;
