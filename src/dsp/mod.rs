//! DSP vocabulary — the small amount of signal math that lives in Rust.
//!
//! Oscillators, filters and convolution are rendered by the host audio
//! engine. What stays here is the math the control logic needs (pitch,
//! octave ratios, cutoff clamping) and the held-value random generator that
//! runs inside an AudioWorklet.

pub mod filter;
pub mod oscillator;
pub mod pitch;
pub mod random_lfo;

pub use filter::FilterType;
pub use oscillator::{LfoShape, Waveform};
