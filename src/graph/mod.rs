//! Audio graph — the host abstraction and the synth's fixed topology.
//!
//! Rendering happens in the host's audio engine. Rust decides which nodes
//! exist, how they are wired and what every automatable parameter should do
//! over time.

pub mod automation;
pub mod buffers;
pub mod command_host;
pub mod host;
pub mod topology;

pub use command_host::{CommandHost, GraphCommand};
pub use host::{AudioHost, HostError, HostResult, HostState, NodeId, NodeSpec, ParamName, ParamRef};
pub use topology::{GraphParam, SynthGraph, Vco};
