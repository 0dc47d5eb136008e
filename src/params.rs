//! Synth parameters — the closed set of knobs and switches.
//!
//! Every parameter has a stable dotted path (`filter.frequency`), a kind
//! (continuous range, stepped switch, on/off) and a binding that says where
//! its value goes: straight onto a live graph parameter, into a stepped
//! host setting, or nowhere until the next envelope trigger.
//!
//! Values are stored twice: the `logical` value the UI reads back and the
//! `applied` value derived from it by a pure mapping.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::Serialize;

use crate::dsp::oscillator::{DEFAULT_OCTAVE_INDEX, OCTAVE_RATIOS, octave_ratio};
use crate::dsp::{FilterType, LfoShape, Waveform};
use crate::error::SynthError;
use crate::graph::topology::{GraphParam, Vco};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParamId {
    Vco1Waveform,
    Vco1Octave,
    Vco1Detune,
    Vco1Level,
    Vco2Waveform,
    Vco2Octave,
    Vco2Detune,
    Vco2Level,
    NoiseLevel,
    FilterType,
    FilterFrequency,
    FilterQ,
    FilterEnvDepth,
    FilterKeyFollow,
    FilterEnvAttack,
    FilterEnvDecay,
    FilterEnvSustain,
    FilterEnvRelease,
    VcaEnvAttack,
    VcaEnvDecay,
    VcaEnvSustain,
    VcaEnvRelease,
    LfoWaveform,
    LfoFrequency,
    LfoVco1Depth,
    LfoVco2Depth,
    LfoFilterDepth,
    LfoAmpDepth,
    VoicePortamento,
    VoiceLegato,
    ReverbMix,
    MasterVolume,
}

/// Value shape and range of a parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamKind {
    Continuous { min: f32, max: f32, default: f32 },
    Stepped { steps: usize, default: usize },
    Switch { default: bool },
}

impl ParamKind {
    pub fn default_value(self) -> ParamValue {
        match self {
            ParamKind::Continuous { default, .. } => ParamValue::Continuous(default),
            ParamKind::Stepped { default, .. } => ParamValue::Index(default),
            ParamKind::Switch { default } => ParamValue::Switch(default),
        }
    }
}

/// Where a parameter's value goes once it changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// One live graph parameter, smoothed.
    Direct(GraphParam),
    /// Oscillator type of one VCO.
    Waveform(Vco),
    /// Octave switch of one VCO; re-pitches a sounding note.
    Octave(Vco),
    FilterType,
    /// Filter cutoff resting value; key-follow is added by the engine.
    Cutoff,
    /// LFO source selection (oscillator shape or the random generator).
    LfoShape,
    /// Rate of both LFO sources.
    LfoRate,
    /// Dry/wet crossfade.
    ReverbMix,
    /// Read at envelope trigger or note change only.
    ComputationOnly,
}

const fn continuous(min: f32, max: f32, default: f32) -> ParamKind {
    ParamKind::Continuous { min, max, default }
}

impl ParamId {
    pub const COUNT: usize = 32;

    pub const ALL: [ParamId; ParamId::COUNT] = [
        ParamId::Vco1Waveform,
        ParamId::Vco1Octave,
        ParamId::Vco1Detune,
        ParamId::Vco1Level,
        ParamId::Vco2Waveform,
        ParamId::Vco2Octave,
        ParamId::Vco2Detune,
        ParamId::Vco2Level,
        ParamId::NoiseLevel,
        ParamId::FilterType,
        ParamId::FilterFrequency,
        ParamId::FilterQ,
        ParamId::FilterEnvDepth,
        ParamId::FilterKeyFollow,
        ParamId::FilterEnvAttack,
        ParamId::FilterEnvDecay,
        ParamId::FilterEnvSustain,
        ParamId::FilterEnvRelease,
        ParamId::VcaEnvAttack,
        ParamId::VcaEnvDecay,
        ParamId::VcaEnvSustain,
        ParamId::VcaEnvRelease,
        ParamId::LfoWaveform,
        ParamId::LfoFrequency,
        ParamId::LfoVco1Depth,
        ParamId::LfoVco2Depth,
        ParamId::LfoFilterDepth,
        ParamId::LfoAmpDepth,
        ParamId::VoicePortamento,
        ParamId::VoiceLegato,
        ParamId::ReverbMix,
        ParamId::MasterVolume,
    ];

    pub fn path(self) -> &'static str {
        match self {
            ParamId::Vco1Waveform => "vco1.waveform",
            ParamId::Vco1Octave => "vco1.octave",
            ParamId::Vco1Detune => "vco1.detune",
            ParamId::Vco1Level => "vco1.level",
            ParamId::Vco2Waveform => "vco2.waveform",
            ParamId::Vco2Octave => "vco2.octave",
            ParamId::Vco2Detune => "vco2.detune",
            ParamId::Vco2Level => "vco2.level",
            ParamId::NoiseLevel => "noise.level",
            ParamId::FilterType => "filter.type",
            ParamId::FilterFrequency => "filter.frequency",
            ParamId::FilterQ => "filter.q",
            ParamId::FilterEnvDepth => "filter.envDepth",
            ParamId::FilterKeyFollow => "filter.keyFollow",
            ParamId::FilterEnvAttack => "filterEnv.attack",
            ParamId::FilterEnvDecay => "filterEnv.decay",
            ParamId::FilterEnvSustain => "filterEnv.sustain",
            ParamId::FilterEnvRelease => "filterEnv.release",
            ParamId::VcaEnvAttack => "vcaEnv.attack",
            ParamId::VcaEnvDecay => "vcaEnv.decay",
            ParamId::VcaEnvSustain => "vcaEnv.sustain",
            ParamId::VcaEnvRelease => "vcaEnv.release",
            ParamId::LfoWaveform => "lfo.waveform",
            ParamId::LfoFrequency => "lfo.frequency",
            ParamId::LfoVco1Depth => "lfo.vco1Depth",
            ParamId::LfoVco2Depth => "lfo.vco2Depth",
            ParamId::LfoFilterDepth => "lfo.filterDepth",
            ParamId::LfoAmpDepth => "lfo.ampDepth",
            ParamId::VoicePortamento => "voice.portamento",
            ParamId::VoiceLegato => "voice.legato",
            ParamId::ReverbMix => "reverb.mix",
            ParamId::MasterVolume => "master.volume",
        }
    }

    pub fn from_path(path: &str) -> Option<ParamId> {
        ParamId::ALL.into_iter().find(|id| id.path() == path)
    }

    pub fn kind(self) -> ParamKind {
        match self {
            ParamId::Vco1Waveform => ParamKind::Stepped {
                steps: Waveform::ALL.len(),
                default: 2,
            },
            ParamId::Vco2Waveform => ParamKind::Stepped {
                steps: Waveform::ALL.len(),
                default: 1,
            },
            ParamId::Vco1Octave => ParamKind::Stepped {
                steps: OCTAVE_RATIOS.len(),
                default: DEFAULT_OCTAVE_INDEX,
            },
            ParamId::Vco2Octave => ParamKind::Stepped {
                steps: OCTAVE_RATIOS.len(),
                default: 1,
            },
            ParamId::Vco1Detune => continuous(-100.0, 100.0, 0.0),
            ParamId::Vco2Detune => continuous(-100.0, 100.0, 7.0),
            ParamId::Vco1Level => continuous(0.0, 1.0, 0.6),
            ParamId::Vco2Level => continuous(0.0, 1.0, 0.4),
            ParamId::NoiseLevel => continuous(0.0, 1.0, 0.0),
            ParamId::FilterType => ParamKind::Stepped {
                steps: FilterType::ALL.len(),
                default: 0,
            },
            ParamId::FilterFrequency => continuous(20.0, 20000.0, 1200.0),
            ParamId::FilterQ => continuous(0.1, 30.0, 4.0),
            ParamId::FilterEnvDepth => continuous(0.0, 8000.0, 2500.0),
            ParamId::FilterKeyFollow => ParamKind::Switch { default: false },
            ParamId::FilterEnvAttack => continuous(0.0, 5.0, 0.01),
            ParamId::FilterEnvDecay => continuous(0.0, 5.0, 0.4),
            ParamId::FilterEnvSustain => continuous(0.0, 1.0, 0.3),
            ParamId::FilterEnvRelease => continuous(0.0, 5.0, 0.4),
            ParamId::VcaEnvAttack => continuous(0.0, 5.0, 0.005),
            ParamId::VcaEnvDecay => continuous(0.0, 5.0, 0.2),
            ParamId::VcaEnvSustain => continuous(0.0, 1.0, 0.8),
            ParamId::VcaEnvRelease => continuous(0.0, 5.0, 0.3),
            ParamId::LfoWaveform => ParamKind::Stepped {
                steps: LfoShape::ALL.len(),
                default: 0,
            },
            ParamId::LfoFrequency => continuous(0.1, 100.0, 5.0),
            ParamId::LfoVco1Depth | ParamId::LfoVco2Depth => continuous(0.0, 100.0, 0.0),
            ParamId::LfoFilterDepth => continuous(0.0, 5000.0, 0.0),
            ParamId::LfoAmpDepth => continuous(0.0, 1.0, 0.0),
            ParamId::VoicePortamento => continuous(0.0, 2.0, 0.0),
            ParamId::VoiceLegato => ParamKind::Switch { default: false },
            ParamId::ReverbMix => continuous(0.0, 1.0, 0.25),
            ParamId::MasterVolume => continuous(0.0, 1.0, 0.7),
        }
    }

    pub fn binding(self) -> Binding {
        match self {
            ParamId::Vco1Waveform => Binding::Waveform(Vco::One),
            ParamId::Vco2Waveform => Binding::Waveform(Vco::Two),
            ParamId::Vco1Octave => Binding::Octave(Vco::One),
            ParamId::Vco2Octave => Binding::Octave(Vco::Two),
            ParamId::Vco1Detune => Binding::Direct(GraphParam::Vco1Detune),
            ParamId::Vco2Detune => Binding::Direct(GraphParam::Vco2Detune),
            ParamId::Vco1Level => Binding::Direct(GraphParam::Vco1Level),
            ParamId::Vco2Level => Binding::Direct(GraphParam::Vco2Level),
            ParamId::NoiseLevel => Binding::Direct(GraphParam::NoiseLevel),
            ParamId::FilterType => Binding::FilterType,
            ParamId::FilterFrequency => Binding::Cutoff,
            ParamId::FilterQ => Binding::Direct(GraphParam::FilterQ),
            ParamId::LfoWaveform => Binding::LfoShape,
            ParamId::LfoFrequency => Binding::LfoRate,
            ParamId::LfoVco1Depth => Binding::Direct(GraphParam::LfoVco1Depth),
            ParamId::LfoVco2Depth => Binding::Direct(GraphParam::LfoVco2Depth),
            ParamId::LfoFilterDepth => Binding::Direct(GraphParam::LfoFilterDepth),
            ParamId::LfoAmpDepth => Binding::Direct(GraphParam::LfoAmpDepth),
            ParamId::ReverbMix => Binding::ReverbMix,
            ParamId::MasterVolume => Binding::Direct(GraphParam::Master),
            ParamId::FilterEnvDepth => Binding::Direct(GraphParam::FilterEnvDepth),
            ParamId::FilterKeyFollow
            | ParamId::FilterEnvAttack
            | ParamId::FilterEnvDecay
            | ParamId::FilterEnvSustain
            | ParamId::FilterEnvRelease
            | ParamId::VcaEnvAttack
            | ParamId::VcaEnvDecay
            | ParamId::VcaEnvSustain
            | ParamId::VcaEnvRelease
            | ParamId::VoicePortamento
            | ParamId::VoiceLegato => Binding::ComputationOnly,
        }
    }

    /// The octave switch for one oscillator.
    pub fn octave_of(vco: Vco) -> ParamId {
        match vco {
            Vco::One => ParamId::Vco1Octave,
            Vco::Two => ParamId::Vco2Octave,
        }
    }
}

impl FromStr for ParamId {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ParamId::from_path(s).ok_or_else(|| SynthError::UnknownParam(s.to_string()))
    }
}

/// A logical (UI-facing) parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Continuous(f32),
    Index(usize),
    Switch(bool),
}

impl ParamValue {
    /// Numeric form, as exchanged with the UI.
    pub fn as_f32(self) -> f32 {
        match self {
            ParamValue::Continuous(v) => v,
            ParamValue::Index(i) => i as f32,
            ParamValue::Switch(on) => {
                if on {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

/// The audio-facing value derived from a logical value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Applied {
    Value(f32),
    Waveform(Waveform),
    OctaveRatio(f32),
    FilterType(FilterType),
    LfoShape(LfoShape),
    /// Dry and wet gains of the reverb split.
    Crossfade { dry: f32, wet: f32 },
    Flag(bool),
}

/// Map a logical value to its applied form. Pure; indices are assumed valid.
pub fn apply(id: ParamId, logical: ParamValue) -> Applied {
    match (id, logical) {
        (ParamId::Vco1Waveform | ParamId::Vco2Waveform, ParamValue::Index(i)) => {
            Applied::Waveform(Waveform::ALL[i.min(Waveform::ALL.len() - 1)])
        }
        (ParamId::Vco1Octave | ParamId::Vco2Octave, ParamValue::Index(i)) => {
            Applied::OctaveRatio(octave_ratio(i))
        }
        (ParamId::FilterType, ParamValue::Index(i)) => {
            Applied::FilterType(FilterType::ALL[i.min(FilterType::ALL.len() - 1)])
        }
        (ParamId::LfoWaveform, ParamValue::Index(i)) => {
            Applied::LfoShape(LfoShape::ALL[i.min(LfoShape::ALL.len() - 1)])
        }
        (ParamId::ReverbMix, value) => {
            let mix = value.as_f32();
            Applied::Crossfade {
                dry: 1.0 - mix,
                wet: mix,
            }
        }
        (_, ParamValue::Switch(on)) => Applied::Flag(on),
        (_, value) => Applied::Value(value.as_f32()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSlot {
    pub logical: ParamValue,
    pub applied: Applied,
}

impl ParamSlot {
    fn new(id: ParamId, logical: ParamValue) -> Self {
        ParamSlot {
            logical,
            applied: apply(id, logical),
        }
    }
}

/// Current value of every parameter.
#[derive(Debug, Clone)]
pub struct SynthParameters {
    slots: [ParamSlot; ParamId::COUNT],
}

impl Default for SynthParameters {
    fn default() -> Self {
        SynthParameters {
            slots: ParamId::ALL.map(|id| ParamSlot::new(id, id.kind().default_value())),
        }
    }
}

impl SynthParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(&self, id: ParamId) -> &ParamSlot {
        &self.slots[id as usize]
    }

    pub fn get(&self, id: ParamId) -> ParamValue {
        self.slot(id).logical
    }

    pub fn applied(&self, id: ParamId) -> Applied {
        self.slot(id).applied
    }

    /// Numeric value of any parameter.
    pub fn number(&self, id: ParamId) -> f32 {
        self.get(id).as_f32()
    }

    pub fn index(&self, id: ParamId) -> usize {
        match self.get(id) {
            ParamValue::Index(i) => i,
            other => other.as_f32() as usize,
        }
    }

    pub fn flag(&self, id: ParamId) -> bool {
        match self.get(id) {
            ParamValue::Switch(on) => on,
            other => other.as_f32() != 0.0,
        }
    }

    /// Store a raw number for `id`, normalized to the parameter's kind.
    ///
    /// Non-finite input is rejected and leaves the value unchanged.
    /// Continuous values are clamped into range; a stepped index that is
    /// out of range resets to the default (octaves to unison). Returns the
    /// stored value.
    pub fn set(&mut self, id: ParamId, raw: f32) -> Option<ParamValue> {
        if !raw.is_finite() {
            log::warn!(target: "params", "rejected non-finite value {raw} for {}", id.path());
            return None;
        }

        let value = match id.kind() {
            ParamKind::Continuous { min, max, .. } => {
                let v = raw.clamp(min, max);
                if v != raw {
                    log::warn!(target: "params", "{} clamped from {raw} to {v}", id.path());
                }
                ParamValue::Continuous(v)
            }
            ParamKind::Stepped { steps, default } => {
                let i = raw.round();
                if i < 0.0 || i >= steps as f32 {
                    // octave switches fall back to unison, not their panel default
                    let fallback = match id {
                        ParamId::Vco1Octave | ParamId::Vco2Octave => DEFAULT_OCTAVE_INDEX,
                        _ => default,
                    };
                    log::warn!(
                        target: "params",
                        "{} index {raw} out of range, reset to {fallback}",
                        id.path()
                    );
                    ParamValue::Index(fallback)
                } else {
                    ParamValue::Index(i as usize)
                }
            }
            ParamKind::Switch { .. } => ParamValue::Switch(raw >= 0.5),
        };

        self.slots[id as usize] = ParamSlot::new(id, value);
        Some(value)
    }

    pub fn reset(&mut self, id: ParamId) -> ParamValue {
        let value = id.kind().default_value();
        self.slots[id as usize] = ParamSlot::new(id, value);
        value
    }

    /// Every parameter by path, for handing to the UI.
    pub fn snapshot(&self) -> BTreeMap<&'static str, ParamValue> {
        ParamId::ALL
            .into_iter()
            .map(|id| (id.path(), self.get(id)))
            .collect()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_unique_and_parse_back() {
        for id in ParamId::ALL {
            assert_eq!(ParamId::from_path(id.path()), Some(id));
            assert_eq!(id.path().parse::<ParamId>().ok(), Some(id));
            assert_eq!(ParamId::ALL[id as usize], id, "ALL must be in declaration order");
        }
        let err = "filter.cutof".parse::<ParamId>().unwrap_err();
        assert!(matches!(err, SynthError::UnknownParam(p) if p == "filter.cutof"));
    }

    #[test]
    fn defaults_match_the_panel() {
        let params = SynthParameters::new();
        assert_eq!(params.applied(ParamId::Vco1Waveform), Applied::Waveform(Waveform::Sawtooth));
        assert_eq!(params.applied(ParamId::Vco2Waveform), Applied::Waveform(Waveform::Square));
        assert_eq!(params.applied(ParamId::Vco1Octave), Applied::OctaveRatio(1.0));
        assert_eq!(params.applied(ParamId::Vco2Octave), Applied::OctaveRatio(0.5));
        assert_eq!(params.number(ParamId::FilterFrequency), 1200.0);
        assert_eq!(params.applied(ParamId::FilterType), Applied::FilterType(FilterType::Lowpass));
        assert_eq!(
            params.applied(ParamId::LfoWaveform),
            Applied::LfoShape(LfoShape::Periodic(Waveform::Sine))
        );
        assert!(!params.flag(ParamId::VoiceLegato));
    }

    #[test]
    fn every_param_is_bound_or_computation_only() {
        let computation_only = ParamId::ALL
            .into_iter()
            .filter(|id| id.binding() == Binding::ComputationOnly)
            .count();
        assert_eq!(computation_only, 11);
    }

    #[test]
    fn continuous_values_round_trip() {
        let mut params = SynthParameters::new();
        for id in ParamId::ALL {
            if let ParamKind::Continuous { min, max, .. } = id.kind() {
                for v in [min, (min + max) / 2.0, max] {
                    params.set(id, v);
                    assert_eq!(params.number(id), v, "{} should read back {v}", id.path());
                }
            }
        }
    }

    #[test]
    fn stepped_values_round_trip() {
        let mut params = SynthParameters::new();
        for id in ParamId::ALL {
            if let ParamKind::Stepped { steps, .. } = id.kind() {
                for i in 0..steps {
                    params.set(id, i as f32);
                    assert_eq!(params.index(id), i, "{} should read back index {i}", id.path());
                }
            }
        }
    }

    #[test]
    fn out_of_range_values_are_corrected() {
        let mut params = SynthParameters::new();
        assert_eq!(
            params.set(ParamId::FilterFrequency, 50000.0),
            Some(ParamValue::Continuous(20000.0))
        );
        params.set(ParamId::Vco1Octave, 4.0);
        assert_eq!(params.set(ParamId::Vco1Octave, 9.0), Some(ParamValue::Index(2)));
        assert_eq!(params.set(ParamId::Vco1Octave, -1.0), Some(ParamValue::Index(2)));
        assert_eq!(params.applied(ParamId::Vco1Octave), Applied::OctaveRatio(1.0));
        assert_eq!(params.set(ParamId::Vco2Octave, 5.0), Some(ParamValue::Index(2)));
        assert_eq!(params.set(ParamId::FilterType, 7.0), Some(ParamValue::Index(0)));
    }

    #[test]
    fn non_finite_is_rejected() {
        let mut params = SynthParameters::new();
        assert_eq!(params.set(ParamId::MasterVolume, f32::NAN), None);
        assert_eq!(params.set(ParamId::MasterVolume, f32::INFINITY), None);
        assert_eq!(params.number(ParamId::MasterVolume), 0.7);
    }

    #[test]
    fn reverb_mix_splits_dry_and_wet() {
        let mut params = SynthParameters::new();
        params.set(ParamId::ReverbMix, 0.4);
        match params.applied(ParamId::ReverbMix) {
            Applied::Crossfade { dry, wet } => {
                assert!((dry - 0.6).abs() < 1e-6 && (wet - 0.4).abs() < 1e-6);
            }
            other => panic!("expected a crossfade, got {other:?}"),
        }
    }

    #[test]
    fn reset_restores_default() {
        let mut params = SynthParameters::new();
        params.set(ParamId::VoiceLegato, 1.0);
        assert!(params.flag(ParamId::VoiceLegato));
        assert_eq!(params.reset(ParamId::VoiceLegato), ParamValue::Switch(false));
        assert!(!params.flag(ParamId::VoiceLegato));
    }

    #[test]
    fn snapshot_serializes_by_path() {
        let json = SynthParameters::new().to_json().unwrap();
        assert!(json.contains("\"filter.frequency\":1200.0"), "got {json}");
        assert!(json.contains("\"voice.legato\":false"), "got {json}");
        assert!(json.contains("\"vco1.octave\":2"), "got {json}");
    }
}
