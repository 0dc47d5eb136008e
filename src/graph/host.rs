//! Audio host trait: a semantic-level abstraction over the browser audio graph.
//!
//! `AudioHost` captures what the synth *means* to do (create a gain stage,
//! connect it, ramp a parameter) independently of how it is done. The
//! production host records commands for the JavaScript shim to replay on
//! Web Audio nodes; the same host doubles as the test backend.

use std::fmt;

use serde::Serialize;

use crate::dsp::{FilterType, Waveform};

use super::buffers::AudioBuffer;

/// Result type for host operations.
pub type HostResult<T = ()> = Result<T, HostError>;

/// Opaque handle to a node created by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub u32);

/// Automatable parameter names exposed by the node types we create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ParamName {
    Frequency,
    Detune,
    Gain,
    Q,
    Offset,
}

impl ParamName {
    /// Property name on the Web Audio node.
    pub fn as_str(self) -> &'static str {
        match self {
            ParamName::Frequency => "frequency",
            ParamName::Detune => "detune",
            ParamName::Gain => "gain",
            ParamName::Q => "Q",
            ParamName::Offset => "offset",
        }
    }
}

/// One automatable parameter of one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ParamRef {
    pub node: NodeId,
    pub param: ParamName,
}

impl ParamRef {
    pub fn new(node: NodeId, param: ParamName) -> Self {
        ParamRef { node, param }
    }
}

/// Lifecycle of the host audio context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum HostState {
    /// Created but not yet allowed to render (autoplay policy).
    Suspended,
    Running,
    Closed,
}

/// Everything needed to create a node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum NodeSpec {
    Oscillator {
        waveform: Waveform,
        frequency: f32,
        detune: f32,
    },
    Gain {
        gain: f32,
    },
    Filter {
        #[serde(rename = "type")]
        filter_type: FilterType,
        frequency: f32,
        q: f32,
    },
    /// Looping buffer source.
    NoiseSource {
        buffer: AudioBuffer,
    },
    Convolver {
        impulse: AudioBuffer,
    },
    /// Constant source; its `offset` is the output level.
    Constant {
        offset: f32,
    },
    /// A registered AudioWorklet processor with its initial parameter values.
    Worklet {
        processor: String,
        parameters: Vec<(ParamName, f32)>,
    },
}

impl NodeSpec {
    /// Initial values of the automatable parameters this node exposes.
    pub fn params(&self) -> Vec<(ParamName, f32)> {
        match self {
            NodeSpec::Oscillator {
                frequency, detune, ..
            } => vec![(ParamName::Frequency, *frequency), (ParamName::Detune, *detune)],
            NodeSpec::Gain { gain } => vec![(ParamName::Gain, *gain)],
            NodeSpec::Constant { offset } => vec![(ParamName::Offset, *offset)],
            NodeSpec::Filter { frequency, q, .. } => vec![
                (ParamName::Frequency, *frequency),
                (ParamName::Detune, 0.0),
                (ParamName::Q, *q),
            ],
            NodeSpec::NoiseSource { .. } | NodeSpec::Convolver { .. } => Vec::new(),
            NodeSpec::Worklet { parameters, .. } => parameters.clone(),
        }
    }

    /// Scheduled sources must be started; everything else runs when connected.
    pub fn is_source(&self) -> bool {
        matches!(
            self,
            NodeSpec::Oscillator { .. } | NodeSpec::NoiseSource { .. } | NodeSpec::Constant { .. }
        )
    }
}

/// Error from a host operation.
#[derive(Debug, Clone, PartialEq)]
pub enum HostError {
    /// No audio context could be created.
    Unavailable,
    /// The context refused to start (autoplay policy, closed context).
    Blocked(String),
    UnknownNode(NodeId),
    UnknownParam(ParamRef),
    /// Sources may only be started once.
    AlreadyStarted(NodeId),
    NotASource(NodeId),
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::Unavailable => write!(f, "audio context unavailable"),
            HostError::Blocked(reason) => write!(f, "audio context blocked: {reason}"),
            HostError::UnknownNode(id) => write!(f, "unknown node {}", id.0),
            HostError::UnknownParam(p) => {
                write!(f, "node {} has no parameter '{}'", p.node.0, p.param.as_str())
            }
            HostError::AlreadyStarted(id) => write!(f, "node {} already started", id.0),
            HostError::NotASource(id) => write!(f, "node {} is not a startable source", id.0),
        }
    }
}

impl std::error::Error for HostError {}

/// Semantic-level audio host trait.
///
/// Graph construction calls are fallible. Automation calls are requests for
/// future values on the host clock and never fail; a host that cannot honour
/// one logs and drops it.
pub trait AudioHost {
    fn sample_rate(&self) -> f32;

    /// Current time on the host's audio clock, in seconds.
    fn current_time(&self) -> f64;

    fn state(&self) -> HostState;

    /// Ask the context to start rendering. Must be user-gesture gated.
    fn resume(&mut self) -> HostResult;

    fn create_node(&mut self, spec: NodeSpec) -> HostResult<NodeId>;

    /// The final output node.
    fn destination(&self) -> NodeId;

    fn connect(&mut self, from: NodeId, to: NodeId) -> HostResult;

    /// Connect a node's output into a parameter (summed with its value).
    fn connect_param(&mut self, from: NodeId, to: ParamRef) -> HostResult;

    fn start(&mut self, node: NodeId) -> HostResult;

    fn set_waveform(&mut self, node: NodeId, waveform: Waveform) -> HostResult;

    fn set_filter_type(&mut self, node: NodeId, filter_type: FilterType) -> HostResult;

    fn set_value_at_time(&mut self, param: ParamRef, value: f32, time: f64);

    fn linear_ramp_to_value_at_time(&mut self, param: ParamRef, value: f32, time: f64);

    /// Exponential approach toward `target` starting at `start`.
    fn set_target_at_time(&mut self, param: ParamRef, target: f32, start: f64, time_constant: f64);

    /// Drop every scheduled event at or after `time`.
    fn cancel_scheduled_values(&mut self, param: ParamRef, time: f64);

    /// The parameter's automated value at `time` (excluding connected inputs).
    fn param_value(&self, param: ParamRef, time: f64) -> f32;

    /// Cancel pending automation and pin the parameter at its current value.
    ///
    /// Returns the held value.
    fn cancel_and_hold(&mut self, param: ParamRef, time: f64) -> f32 {
        let current = self.param_value(param, time);
        self.cancel_scheduled_values(param, time);
        self.set_value_at_time(param, current, time);
        current
    }
}
