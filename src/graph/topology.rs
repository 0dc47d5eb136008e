//! Synth graph topology — every node of the voice, wired once.
//!
//! ```text
//! vco1 ─ vco1Level ─┐
//! vco2 ─ vco2Level ─┼─ filter ─ gate ─┬─ dry ─────────────┬─ master ─ out
//! noise ─ noiseLevel┘                 └─ reverb ─ wet ────┘
//!
//! lfoOsc ─ oscSelect ────┐
//! random ─ randomSelect ─┴─ lfoBus ─┬─ vco1Depth ─▶ vco1.detune
//!                                   ├─ vco2Depth ─▶ vco2.detune
//!                                   ├─ filterDepth ▶ filter.frequency
//!                                   └─ ampDepth ──▶ gate.gain
//!
//! filterEnv ─ filterEnvDepth ─▶ filter.frequency
//! ```
//!
//! `filterEnv` is a constant source swept between 0 and 1 by the filter
//! envelope; `filterEnvDepth` scales it to Hz on top of the resting cutoff.

use rand::SeedableRng;
use rand::rngs::SmallRng;

use crate::config::SynthConfig;
use crate::dsp::pitch::clamp_frequency;
use crate::dsp::random_lfo::PROCESSOR_NAME;
use crate::dsp::{FilterType, LfoShape, Waveform};
use crate::params::{Applied, ParamId, SynthParameters};

use super::buffers::{impulse_response, white_noise};
use super::host::{AudioHost, HostResult, NodeId, NodeSpec, ParamName, ParamRef};

/// One of the two audio-rate oscillators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vco {
    One,
    Two,
}

impl Vco {
    pub const ALL: [Vco; 2] = [Vco::One, Vco::Two];
}

/// Named automatable parameters of the synth graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphParam {
    Vco1Frequency,
    Vco1Detune,
    Vco2Frequency,
    Vco2Detune,
    Vco1Level,
    Vco2Level,
    NoiseLevel,
    FilterFrequency,
    FilterQ,
    Gate,
    Dry,
    Wet,
    Master,
    LfoFrequency,
    RandomFrequency,
    LfoOscSelect,
    LfoRandomSelect,
    LfoVco1Depth,
    LfoVco2Depth,
    LfoFilterDepth,
    LfoAmpDepth,
    /// Unit level of the filter envelope.
    FilterEnvelope,
    FilterEnvDepth,
}

/// Where a modulation signal comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModSource {
    Lfo,
    FilterEnvelope,
}

/// A static modulation route: source, destination and the parameter that
/// scales it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModulationRoute {
    pub source: ModSource,
    pub destination: GraphParam,
    pub depth: ParamId,
}

pub const MODULATION_ROUTES: [ModulationRoute; 5] = [
    ModulationRoute {
        source: ModSource::Lfo,
        destination: GraphParam::Vco1Detune,
        depth: ParamId::LfoVco1Depth,
    },
    ModulationRoute {
        source: ModSource::Lfo,
        destination: GraphParam::Vco2Detune,
        depth: ParamId::LfoVco2Depth,
    },
    ModulationRoute {
        source: ModSource::Lfo,
        destination: GraphParam::FilterFrequency,
        depth: ParamId::LfoFilterDepth,
    },
    ModulationRoute {
        source: ModSource::Lfo,
        destination: GraphParam::Gate,
        depth: ParamId::LfoAmpDepth,
    },
    ModulationRoute {
        source: ModSource::FilterEnvelope,
        destination: GraphParam::FilterFrequency,
        depth: ParamId::FilterEnvDepth,
    },
];

/// Handles to every node of the built graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthGraph {
    pub vco1: NodeId,
    pub vco2: NodeId,
    pub noise: NodeId,
    pub vco1_level: NodeId,
    pub vco2_level: NodeId,
    pub noise_level: NodeId,
    pub filter: NodeId,
    pub gate: NodeId,
    pub dry: NodeId,
    pub reverb: NodeId,
    pub wet: NodeId,
    pub master: NodeId,
    pub lfo_osc: NodeId,
    pub lfo_random: NodeId,
    pub lfo_osc_select: NodeId,
    pub lfo_random_select: NodeId,
    pub lfo_bus: NodeId,
    pub lfo_vco1_depth: NodeId,
    pub lfo_vco2_depth: NodeId,
    pub lfo_filter_depth: NodeId,
    pub lfo_amp_depth: NodeId,
    pub filter_env: NodeId,
    pub filter_env_depth: NodeId,
}

/// Selector gains `(oscillator, random)` for an LFO shape.
pub fn lfo_selector_gains(shape: LfoShape) -> (f32, f32) {
    match shape {
        LfoShape::Random => (0.0, 1.0),
        LfoShape::Periodic(_) => (1.0, 0.0),
    }
}

fn gain<H: AudioHost>(host: &mut H, level: f32) -> HostResult<NodeId> {
    host.create_node(NodeSpec::Gain { gain: level })
}

impl SynthGraph {
    /// Create, wire and start the whole graph.
    ///
    /// All nodes are created before any source is started. The gate starts
    /// closed at the gain floor.
    pub fn build<H: AudioHost>(
        host: &mut H,
        params: &SynthParameters,
        config: &SynthConfig,
    ) -> HostResult<SynthGraph> {
        let sample_rate = host.sample_rate();
        let mut rng = SmallRng::seed_from_u64(config.seed);

        let waveform = |id| match params.applied(id) {
            Applied::Waveform(w) => w,
            _ => Waveform::Sine,
        };
        let resting = |vco| {
            let ratio = match params.applied(ParamId::octave_of(vco)) {
                Applied::OctaveRatio(r) => r,
                _ => 1.0,
            };
            clamp_frequency(config.tuning_pitch as f32 * ratio, sample_rate)
        };
        let (crossfade_dry, crossfade_wet) = match params.applied(ParamId::ReverbMix) {
            Applied::Crossfade { dry, wet } => (dry, wet),
            _ => (1.0, 0.0),
        };
        let shape = match params.applied(ParamId::LfoWaveform) {
            Applied::LfoShape(shape) => shape,
            _ => LfoShape::Periodic(Waveform::Sine),
        };
        let lfo_waveform = match shape {
            LfoShape::Periodic(w) => w,
            LfoShape::Random => Waveform::Sine,
        };
        let (osc_select, random_select) = lfo_selector_gains(shape);
        let lfo_rate = params.number(ParamId::LfoFrequency);

        let vco1 = host.create_node(NodeSpec::Oscillator {
            waveform: waveform(ParamId::Vco1Waveform),
            frequency: resting(Vco::One),
            detune: params.number(ParamId::Vco1Detune),
        })?;
        let vco2 = host.create_node(NodeSpec::Oscillator {
            waveform: waveform(ParamId::Vco2Waveform),
            frequency: resting(Vco::Two),
            detune: params.number(ParamId::Vco2Detune),
        })?;
        let noise = host.create_node(NodeSpec::NoiseSource {
            buffer: white_noise(sample_rate, config.noise_seconds, &mut rng),
        })?;
        let vco1_level = gain(host, params.number(ParamId::Vco1Level))?;
        let vco2_level = gain(host, params.number(ParamId::Vco2Level))?;
        let noise_level = gain(host, params.number(ParamId::NoiseLevel))?;
        let filter_type = match params.applied(ParamId::FilterType) {
            Applied::FilterType(t) => t,
            _ => FilterType::Lowpass,
        };
        let filter = host.create_node(NodeSpec::Filter {
            filter_type,
            frequency: clamp_frequency(params.number(ParamId::FilterFrequency), sample_rate),
            q: params.number(ParamId::FilterQ),
        })?;
        let gate = gain(host, config.gain_floor)?;
        let dry = gain(host, crossfade_dry)?;
        let reverb = host.create_node(NodeSpec::Convolver {
            impulse: impulse_response(sample_rate, config.reverb_seconds, config.reverb_decay, &mut rng),
        })?;
        let wet = gain(host, crossfade_wet)?;
        let master = gain(host, params.number(ParamId::MasterVolume))?;

        let lfo_osc = host.create_node(NodeSpec::Oscillator {
            waveform: lfo_waveform,
            frequency: lfo_rate,
            detune: 0.0,
        })?;
        let lfo_random = host.create_node(NodeSpec::Worklet {
            processor: PROCESSOR_NAME.to_string(),
            parameters: vec![(ParamName::Frequency, lfo_rate)],
        })?;
        let lfo_osc_select = gain(host, osc_select)?;
        let lfo_random_select = gain(host, random_select)?;
        let lfo_bus = gain(host, 1.0)?;
        let lfo_vco1_depth = gain(host, params.number(ParamId::LfoVco1Depth))?;
        let lfo_vco2_depth = gain(host, params.number(ParamId::LfoVco2Depth))?;
        let lfo_filter_depth = gain(host, params.number(ParamId::LfoFilterDepth))?;
        let lfo_amp_depth = gain(host, params.number(ParamId::LfoAmpDepth))?;
        let filter_env = host.create_node(NodeSpec::Constant { offset: 0.0 })?;
        let filter_env_depth = gain(host, params.number(ParamId::FilterEnvDepth))?;

        let graph = SynthGraph {
            vco1,
            vco2,
            noise,
            vco1_level,
            vco2_level,
            noise_level,
            filter,
            gate,
            dry,
            reverb,
            wet,
            master,
            lfo_osc,
            lfo_random,
            lfo_osc_select,
            lfo_random_select,
            lfo_bus,
            lfo_vco1_depth,
            lfo_vco2_depth,
            lfo_filter_depth,
            lfo_amp_depth,
            filter_env,
            filter_env_depth,
        };

        let out = host.destination();
        let wiring = [
            (vco1, vco1_level),
            (vco2, vco2_level),
            (noise, noise_level),
            (vco1_level, filter),
            (vco2_level, filter),
            (noise_level, filter),
            (filter, gate),
            (gate, dry),
            (gate, reverb),
            (reverb, wet),
            (dry, master),
            (wet, master),
            (master, out),
            (lfo_osc, lfo_osc_select),
            (lfo_random, lfo_random_select),
            (lfo_osc_select, lfo_bus),
            (lfo_random_select, lfo_bus),
        ];
        for (from, to) in wiring {
            host.connect(from, to)?;
        }

        for route in MODULATION_ROUTES {
            let source = match route.source {
                ModSource::Lfo => lfo_bus,
                ModSource::FilterEnvelope => filter_env,
            };
            if let Some(depth_gain) = graph.depth_gain(route.depth) {
                host.connect(source, depth_gain)?;
                host.connect_param(depth_gain, graph.param(route.destination))?;
            }
        }

        for source in [vco1, vco2, noise, lfo_osc, filter_env] {
            host.start(source)?;
        }

        log::info!(target: "graph", "synth graph built at {sample_rate} Hz");
        Ok(graph)
    }

    /// The node and parameter name behind a graph parameter.
    pub fn param(&self, param: GraphParam) -> ParamRef {
        let (node, name) = match param {
            GraphParam::Vco1Frequency => (self.vco1, ParamName::Frequency),
            GraphParam::Vco1Detune => (self.vco1, ParamName::Detune),
            GraphParam::Vco2Frequency => (self.vco2, ParamName::Frequency),
            GraphParam::Vco2Detune => (self.vco2, ParamName::Detune),
            GraphParam::Vco1Level => (self.vco1_level, ParamName::Gain),
            GraphParam::Vco2Level => (self.vco2_level, ParamName::Gain),
            GraphParam::NoiseLevel => (self.noise_level, ParamName::Gain),
            GraphParam::FilterFrequency => (self.filter, ParamName::Frequency),
            GraphParam::FilterQ => (self.filter, ParamName::Q),
            GraphParam::Gate => (self.gate, ParamName::Gain),
            GraphParam::Dry => (self.dry, ParamName::Gain),
            GraphParam::Wet => (self.wet, ParamName::Gain),
            GraphParam::Master => (self.master, ParamName::Gain),
            GraphParam::LfoFrequency => (self.lfo_osc, ParamName::Frequency),
            GraphParam::RandomFrequency => (self.lfo_random, ParamName::Frequency),
            GraphParam::LfoOscSelect => (self.lfo_osc_select, ParamName::Gain),
            GraphParam::LfoRandomSelect => (self.lfo_random_select, ParamName::Gain),
            GraphParam::LfoVco1Depth => (self.lfo_vco1_depth, ParamName::Gain),
            GraphParam::LfoVco2Depth => (self.lfo_vco2_depth, ParamName::Gain),
            GraphParam::LfoFilterDepth => (self.lfo_filter_depth, ParamName::Gain),
            GraphParam::LfoAmpDepth => (self.lfo_amp_depth, ParamName::Gain),
            GraphParam::FilterEnvelope => (self.filter_env, ParamName::Offset),
            GraphParam::FilterEnvDepth => (self.filter_env_depth, ParamName::Gain),
        };
        ParamRef::new(node, name)
    }

    /// The depth gain node scaled by `depth`, if that route has one.
    pub fn depth_gain(&self, depth: ParamId) -> Option<NodeId> {
        match depth {
            ParamId::LfoVco1Depth => Some(self.lfo_vco1_depth),
            ParamId::LfoVco2Depth => Some(self.lfo_vco2_depth),
            ParamId::LfoFilterDepth => Some(self.lfo_filter_depth),
            ParamId::LfoAmpDepth => Some(self.lfo_amp_depth),
            ParamId::FilterEnvDepth => Some(self.filter_env_depth),
            _ => None,
        }
    }

    pub fn oscillator(&self, vco: Vco) -> NodeId {
        match vco {
            Vco::One => self.vco1,
            Vco::Two => self.vco2,
        }
    }

    pub fn oscillator_frequency(&self, vco: Vco) -> ParamRef {
        match vco {
            Vco::One => self.param(GraphParam::Vco1Frequency),
            Vco::Two => self.param(GraphParam::Vco2Frequency),
        }
    }
}
