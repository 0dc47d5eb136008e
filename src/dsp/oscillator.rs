//! Oscillator vocabulary — waveform shapes and octave switch ratios.

use serde::{Deserialize, Serialize};

use super::pitch::clamp_frequency;

/// Supported waveform shapes for the audio-rate oscillators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl Waveform {
    /// Switch positions, in knob order.
    pub const ALL: [Waveform; 4] = [
        Waveform::Sine,
        Waveform::Square,
        Waveform::Sawtooth,
        Waveform::Triangle,
    ];

    /// The host oscillator type name.
    pub fn as_str(self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Square => "square",
            Waveform::Sawtooth => "sawtooth",
            Waveform::Triangle => "triangle",
        }
    }
}

/// LFO shapes: the four oscillator waveforms plus the held random source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LfoShape {
    Periodic(Waveform),
    Random,
}

impl LfoShape {
    pub const ALL: [LfoShape; 5] = [
        LfoShape::Periodic(Waveform::Sine),
        LfoShape::Periodic(Waveform::Square),
        LfoShape::Periodic(Waveform::Sawtooth),
        LfoShape::Periodic(Waveform::Triangle),
        LfoShape::Random,
    ];
}

/// Octave switch ratios: two down, unison, two up.
pub const OCTAVE_RATIOS: [f32; 5] = [0.25, 0.5, 1.0, 2.0, 4.0];

/// Index of the unison ratio, used whenever an index is out of range.
pub const DEFAULT_OCTAVE_INDEX: usize = 2;

/// Resolve an octave switch index to its ratio.
///
/// Out-of-range indices fall back to unison and are logged.
pub fn octave_ratio(index: usize) -> f32 {
    match OCTAVE_RATIOS.get(index) {
        Some(ratio) => *ratio,
        None => {
            log::warn!(
                target: "pitch",
                "octave index {index} out of range, using {DEFAULT_OCTAVE_INDEX}"
            );
            OCTAVE_RATIOS[DEFAULT_OCTAVE_INDEX]
        }
    }
}

/// Frequency of one oscillator for a shared base frequency.
pub fn oscillator_frequency(base: f32, octave_index: usize, sample_rate: f32) -> f32 {
    clamp_frequency(base * octave_ratio(octave_index), sample_rate)
}
