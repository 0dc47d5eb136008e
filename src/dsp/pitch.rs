//! Pitch helpers — MIDI note numbers, frequencies and safe clamping.

/// Lowest frequency any oscillator or cutoff is allowed to reach.
pub const MIN_FREQUENCY: f32 = 20.0;

/// Default tuning pitch (A4) in Hz.
pub const A4_PITCH: f64 = 440.0;

/// Convert a MIDI note number to frequency using the given tuning pitch.
///
/// `tuning_pitch` is the frequency of A4 (MIDI 69).
/// Formula: `tuning_pitch * 2^((midi - 69) / 12)`
pub fn midi_to_frequency(midi: u8, tuning_pitch: f64) -> f64 {
    tuning_pitch * (2.0_f64).powf((midi as f64 - 69.0) / 12.0)
}

/// Name of a MIDI note using sharps, e.g. 61 → "C#4".
pub fn midi_to_name(midi: u8) -> String {
    const NAMES: [&str; 12] = [
        "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
    ];
    let octave = midi as i32 / 12 - 1;
    format!("{}{octave}", NAMES[midi as usize % 12])
}

/// Clamp a frequency into `[20 Hz, nyquist]`.
///
/// Non-finite input (NaN from a bad ratio, infinities) collapses to the
/// lower bound and is logged; it is never passed on to the host.
pub fn clamp_frequency(freq: f32, sample_rate: f32) -> f32 {
    let nyquist = (sample_rate / 2.0).max(MIN_FREQUENCY);
    if !freq.is_finite() {
        log::warn!(target: "pitch", "non-finite frequency {freq} replaced with {MIN_FREQUENCY} Hz");
        return MIN_FREQUENCY;
    }
    freq.clamp(MIN_FREQUENCY, nyquist)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a4_is_tuning_pitch() {
        assert!((midi_to_frequency(69, 440.0) - 440.0).abs() < 1e-9);
        assert!((midi_to_frequency(69, 432.0) - 432.0).abs() < 1e-9);
    }

    #[test]
    fn middle_c() {
        let f = midi_to_frequency(60, A4_PITCH);
        assert!((f - 261.626).abs() < 0.01, "C4 should be ~261.63Hz, got {f}");
    }

    #[test]
    fn note_names() {
        assert_eq!(midi_to_name(60), "C4");
        assert_eq!(midi_to_name(61), "C#4");
        assert_eq!(midi_to_name(69), "A4");
        assert_eq!(midi_to_name(0), "C-1");
        assert_eq!(midi_to_name(127), "G9");
    }

    #[test]
    fn clamp_keeps_frequencies_audible() {
        assert_eq!(clamp_frequency(5.0, 48000.0), MIN_FREQUENCY);
        assert_eq!(clamp_frequency(30000.0, 48000.0), 24000.0);
        assert_eq!(clamp_frequency(f32::NAN, 48000.0), MIN_FREQUENCY);
        assert_eq!(clamp_frequency(440.0, 48000.0), 440.0);
    }
}
