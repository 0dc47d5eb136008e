//! Synth configuration — tuning, timing constants and generator settings.
//!
//! Everything here has a sensible default, so an empty JSON object (or no
//! config at all) yields a working synth.

use serde::{Deserialize, Serialize};

use crate::dsp::pitch::A4_PITCH;
use crate::error::ConfigError;

/// How the filter cutoff follows the played note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyFollowMode {
    /// Offset proportional to the cutoff knob: `cutoff * ratio * semitones / 12`.
    CutoffRelative,
    /// Fixed Hz offset per octave away from the reference note.
    PerOctave,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KeyFollow {
    pub mode: KeyFollowMode,
    /// Note at which key-follow adds nothing.
    pub reference_note: u8,
    pub ratio: f32,
    pub hz_per_octave: f32,
}

impl Default for KeyFollow {
    fn default() -> Self {
        KeyFollow {
            mode: KeyFollowMode::CutoffRelative,
            reference_note: 60,
            ratio: 0.5,
            hz_per_octave: 600.0,
        }
    }
}

impl KeyFollow {
    /// Cutoff offset in Hz for `note` with the cutoff knob at `cutoff`.
    pub fn offset(&self, cutoff: f32, note: u8) -> f32 {
        let octaves = (note as f32 - self.reference_note as f32) / 12.0;
        match self.mode {
            KeyFollowMode::CutoffRelative => cutoff * self.ratio * octaves,
            KeyFollowMode::PerOctave => self.hz_per_octave * octaves,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SynthConfig {
    /// Frequency of A4 in Hz.
    pub tuning_pitch: f64,
    pub key_follow: KeyFollow,
    /// Shortest envelope stage, in seconds.
    pub min_ramp_time: f64,
    /// Gate level treated as silence (linear gain).
    pub gain_floor: f32,
    /// Time constant for knob smoothing, in seconds.
    pub smoothing_time_constant: f64,
    /// Portamento at or below this glides nowhere; pitch jumps instead.
    pub portamento_threshold: f64,
    /// Glide time constant as a fraction of the portamento time.
    pub glide_ratio: f64,
    pub noise_seconds: f64,
    pub reverb_seconds: f64,
    pub reverb_decay: f64,
    /// Note played by the first computer-keyboard key.
    pub keyboard_base_note: u8,
    /// Pixels of vertical drag that sweep a knob's full range.
    pub drag_sensitivity: f32,
    pub seed: u64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        SynthConfig {
            tuning_pitch: A4_PITCH,
            key_follow: KeyFollow::default(),
            min_ramp_time: 0.001,
            gain_floor: 1e-4,
            smoothing_time_constant: 0.01,
            portamento_threshold: 0.005,
            glide_ratio: 1.0 / 3.0,
            noise_seconds: 2.0,
            reverb_seconds: 2.5,
            reverb_decay: 2.0,
            keyboard_base_note: 48,
            drag_sensitivity: 200.0,
            seed: 0x5EED_CAFE,
        }
    }
}

/// Lowest and highest base note the octave shift keys may reach.
pub const KEYBOARD_BASE_RANGE: (u8, u8) = (12, 96);

impl SynthConfig {
    /// Parse a JSON config and validate it. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: SynthConfig = serde_json::from_str(json)?;
        config.validate()?;
        log::info!(target: "config", "configuration loaded (tuning {} Hz)", config.tuning_pitch);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("tuningPitch", self.tuning_pitch)?;
        positive("minRampTime", self.min_ramp_time)?;
        positive("smoothingTimeConstant", self.smoothing_time_constant)?;
        positive("glideRatio", self.glide_ratio)?;
        positive("noiseSeconds", self.noise_seconds)?;
        positive("reverbSeconds", self.reverb_seconds)?;
        positive("dragSensitivity", self.drag_sensitivity as f64)?;

        if !(self.gain_floor > 0.0 && self.gain_floor < 1.0) {
            return Err(out_of_range("gainFloor", self.gain_floor as f64));
        }
        if !(self.portamento_threshold >= 0.0 && self.portamento_threshold.is_finite()) {
            return Err(out_of_range("portamentoThreshold", self.portamento_threshold));
        }
        if !(self.reverb_decay >= 0.0 && self.reverb_decay.is_finite()) {
            return Err(out_of_range("reverbDecay", self.reverb_decay));
        }

        let (lo, hi) = KEYBOARD_BASE_RANGE;
        if !(lo..=hi).contains(&self.keyboard_base_note) {
            return Err(out_of_range("keyboardBaseNote", self.keyboard_base_note as f64));
        }

        let kf = &self.key_follow;
        if kf.reference_note > 127 {
            return Err(out_of_range("keyFollow.referenceNote", kf.reference_note as f64));
        }
        if !kf.ratio.is_finite() {
            return Err(out_of_range("keyFollow.ratio", kf.ratio as f64));
        }
        if !kf.hz_per_octave.is_finite() {
            return Err(out_of_range("keyFollow.hzPerOctave", kf.hz_per_octave as f64));
        }
        Ok(())
    }
}

fn out_of_range(field: &'static str, value: f64) -> ConfigError {
    ConfigError::OutOfRange { field, value }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(out_of_range(field, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SynthConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tuning_pitch, 440.0);
        assert_eq!(config.key_follow.reference_note, 60);
    }

    #[test]
    fn empty_json_is_default() {
        let config = SynthConfig::from_json("{}").unwrap();
        assert_eq!(config, SynthConfig::default());
    }

    #[test]
    fn partial_json_overrides_fields() {
        let config = SynthConfig::from_json(
            r#"{"tuningPitch": 432, "keyFollow": {"mode": "perOctave", "hzPerOctave": 300}}"#,
        )
        .unwrap();
        assert_eq!(config.tuning_pitch, 432.0);
        assert_eq!(config.key_follow.mode, KeyFollowMode::PerOctave);
        assert_eq!(config.key_follow.reference_note, 60, "unset nested fields keep defaults");
        assert_eq!(config.glide_ratio, 1.0 / 3.0);
    }

    #[test]
    fn rejects_bad_values() {
        let err = SynthConfig::from_json(r#"{"tuningPitch": -1}"#).unwrap_err();
        assert!(
            matches!(err, ConfigError::OutOfRange { field: "tuningPitch", .. }),
            "expected tuningPitch to be rejected, got {err}"
        );

        let err = SynthConfig::from_json(r#"{"keyboardBaseNote": 120}"#).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { field: "keyboardBaseNote", .. }));

        assert!(matches!(
            SynthConfig::from_json("not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn key_follow_offsets() {
        let relative = KeyFollow::default();
        assert_eq!(relative.offset(1000.0, 60), 0.0);
        assert!((relative.offset(1000.0, 72) - 500.0).abs() < 1e-3);
        assert!((relative.offset(1000.0, 48) + 500.0).abs() < 1e-3);

        let per_octave = KeyFollow {
            mode: KeyFollowMode::PerOctave,
            hz_per_octave: 300.0,
            ..KeyFollow::default()
        };
        assert!((per_octave.offset(5000.0, 84) - 600.0).abs() < 1e-3);
    }
}
