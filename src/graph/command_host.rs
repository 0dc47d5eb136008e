//! Command host — records graph operations for the JavaScript shim.
//!
//! Every call is appended to a command log that the browser side drains
//! and replays on real Web Audio nodes. The host also mirrors each
//! parameter's automation timeline so the synth can read back the value a
//! parameter has "right now", which Web Audio only reports on the audio
//! thread.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::dsp::{FilterType, Waveform};

use super::automation::{AutomationEvent, AutomationTimeline};
use super::host::{AudioHost, HostError, HostResult, HostState, NodeId, NodeSpec, ParamName, ParamRef};

/// One operation for the browser to replay, in order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum GraphCommand {
    Resume,
    CreateNode { id: NodeId, spec: NodeSpec },
    Connect { from: NodeId, to: NodeId },
    ConnectParam { from: NodeId, to: ParamRef },
    Start { id: NodeId, time: f64 },
    SetWaveform { id: NodeId, waveform: Waveform },
    SetFilterType { id: NodeId, filter_type: FilterType },
    Automate { param: ParamRef, event: AutomationEvent },
    Cancel { param: ParamRef, time: f64 },
}

#[derive(Debug, Clone)]
struct NodeRecord {
    spec: NodeSpec,
    started: bool,
}

/// Destination is always node 0.
const DESTINATION: NodeId = NodeId(0);

#[derive(Debug)]
pub struct CommandHost {
    sample_rate: f32,
    time: f64,
    state: HostState,
    available: bool,
    next_id: u32,
    nodes: BTreeMap<NodeId, NodeRecord>,
    connections: Vec<(NodeId, NodeId)>,
    param_connections: Vec<(NodeId, ParamRef)>,
    timelines: HashMap<ParamRef, AutomationTimeline>,
    commands: Vec<GraphCommand>,
}

impl CommandHost {
    pub fn new(sample_rate: f32) -> Self {
        CommandHost {
            sample_rate,
            time: 0.0,
            state: HostState::Suspended,
            available: true,
            next_id: 1,
            nodes: BTreeMap::new(),
            connections: Vec::new(),
            param_connections: Vec::new(),
            timelines: HashMap::new(),
            commands: Vec::new(),
        }
    }

    /// A host whose audio context could not be created.
    pub fn unavailable(sample_rate: f32) -> Self {
        CommandHost {
            available: false,
            state: HostState::Closed,
            ..CommandHost::new(sample_rate)
        }
    }

    /// Move the clock forward to `time` (the browser's `currentTime`).
    ///
    /// Time never runs backwards. Automation history older than the new
    /// time is collapsed.
    pub fn advance_to(&mut self, time: f64) {
        if time > self.time {
            self.time = time;
            for timeline in self.timelines.values_mut() {
                timeline.prune_before(time);
            }
        }
    }

    /// Take every command recorded since the last drain.
    pub fn drain_commands(&mut self) -> Vec<GraphCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Commands recorded since the last drain, without taking them.
    pub fn pending_commands(&self) -> &[GraphCommand] {
        &self.commands
    }

    pub fn node_spec(&self, id: NodeId) -> Option<&NodeSpec> {
        self.nodes.get(&id).map(|n| &n.spec)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_started(&self, id: NodeId) -> bool {
        self.nodes.get(&id).is_some_and(|n| n.started)
    }

    pub fn is_connected(&self, from: NodeId, to: NodeId) -> bool {
        self.connections.contains(&(from, to))
    }

    pub fn is_connected_to_param(&self, from: NodeId, to: ParamRef) -> bool {
        self.param_connections.contains(&(from, to))
    }

    /// Nodes whose output feeds `to`.
    pub fn inputs_of(&self, to: NodeId) -> Vec<NodeId> {
        self.connections
            .iter()
            .filter(|(_, dst)| *dst == to)
            .map(|(src, _)| *src)
            .collect()
    }

    /// A parameter's value at `time` with its connected inputs summed in.
    ///
    /// Filter cutoff is clamped to `[0, nyquist]` as Web Audio does.
    pub fn computed_value(&self, param: ParamRef, time: f64) -> f32 {
        let modulation: f32 = self
            .param_connections
            .iter()
            .filter(|(_, to)| *to == param)
            .map(|(from, _)| self.output_at(*from, time))
            .sum();
        let value = self.param_value(param, time) + modulation;
        match (self.node_spec(param.node), param.param) {
            (Some(NodeSpec::Filter { .. }), ParamName::Frequency) => value.clamp(0.0, self.sample_rate / 2.0),
            _ => value,
        }
    }

    /// Steady output of a node: started constant sources and the gains
    /// they feed. Oscillators and buffer sources count as their mean, zero.
    fn output_at(&self, node: NodeId, time: f64) -> f32 {
        match self.nodes.get(&node) {
            Some(NodeRecord {
                spec: NodeSpec::Constant { .. },
                started: true,
            }) => self.param_value(ParamRef::new(node, ParamName::Offset), time),
            Some(NodeRecord {
                spec: NodeSpec::Gain { .. },
                ..
            }) => {
                let input: f32 = self
                    .inputs_of(node)
                    .into_iter()
                    .map(|from| self.output_at(from, time))
                    .sum();
                input * self.param_value(ParamRef::new(node, ParamName::Gain), time)
            }
            _ => 0.0,
        }
    }

    /// Scheduled events currently mirrored for a parameter.
    pub fn automation(&self, param: ParamRef) -> &[AutomationEvent] {
        self.timelines.get(&param).map_or(&[], |t| t.events())
    }

    fn check_node(&self, id: NodeId) -> HostResult {
        if id == DESTINATION || self.nodes.contains_key(&id) {
            Ok(())
        } else {
            Err(HostError::UnknownNode(id))
        }
    }

    fn record_mut(&mut self, id: NodeId) -> HostResult<&mut NodeRecord> {
        self.nodes.get_mut(&id).ok_or(HostError::UnknownNode(id))
    }

    fn schedule(&mut self, param: ParamRef, event: AutomationEvent) {
        match self.timelines.get_mut(&param) {
            Some(timeline) => {
                timeline.insert(event);
                self.commands.push(GraphCommand::Automate { param, event });
            }
            None => log::warn!(target: "host", "dropping automation for unknown {param:?}"),
        }
    }
}

impl AudioHost for CommandHost {
    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn current_time(&self) -> f64 {
        self.time
    }

    fn state(&self) -> HostState {
        self.state
    }

    fn resume(&mut self) -> HostResult {
        match self.state {
            HostState::Running => Ok(()),
            HostState::Suspended => {
                self.state = HostState::Running;
                self.commands.push(GraphCommand::Resume);
                Ok(())
            }
            HostState::Closed => Err(HostError::Blocked("context is closed".to_string())),
        }
    }

    fn create_node(&mut self, spec: NodeSpec) -> HostResult<NodeId> {
        if !self.available {
            return Err(HostError::Unavailable);
        }
        let id = NodeId(self.next_id);
        self.next_id += 1;

        for (name, value) in spec.params() {
            self.timelines
                .insert(ParamRef::new(id, name), AutomationTimeline::new(value));
        }
        self.commands.push(GraphCommand::CreateNode {
            id,
            spec: spec.clone(),
        });
        self.nodes.insert(id, NodeRecord { spec, started: false });
        Ok(id)
    }

    fn destination(&self) -> NodeId {
        DESTINATION
    }

    fn connect(&mut self, from: NodeId, to: NodeId) -> HostResult {
        self.check_node(from)?;
        self.check_node(to)?;
        self.connections.push((from, to));
        self.commands.push(GraphCommand::Connect { from, to });
        Ok(())
    }

    fn connect_param(&mut self, from: NodeId, to: ParamRef) -> HostResult {
        self.check_node(from)?;
        if !self.timelines.contains_key(&to) {
            return Err(HostError::UnknownParam(to));
        }
        self.param_connections.push((from, to));
        self.commands.push(GraphCommand::ConnectParam { from, to });
        Ok(())
    }

    fn start(&mut self, node: NodeId) -> HostResult {
        let time = self.time;
        let record = self.record_mut(node)?;
        if !record.spec.is_source() {
            return Err(HostError::NotASource(node));
        }
        if record.started {
            return Err(HostError::AlreadyStarted(node));
        }
        record.started = true;
        self.commands.push(GraphCommand::Start { id: node, time });
        Ok(())
    }

    fn set_waveform(&mut self, node: NodeId, waveform: Waveform) -> HostResult {
        match &mut self.record_mut(node)?.spec {
            NodeSpec::Oscillator { waveform: current, .. } => *current = waveform,
            _ => return Err(HostError::UnknownParam(ParamRef::new(node, ParamName::Frequency))),
        }
        self.commands.push(GraphCommand::SetWaveform { id: node, waveform });
        Ok(())
    }

    fn set_filter_type(&mut self, node: NodeId, filter_type: FilterType) -> HostResult {
        match &mut self.record_mut(node)?.spec {
            NodeSpec::Filter { filter_type: current, .. } => *current = filter_type,
            _ => return Err(HostError::UnknownParam(ParamRef::new(node, ParamName::Q))),
        }
        self.commands.push(GraphCommand::SetFilterType { id: node, filter_type });
        Ok(())
    }

    fn set_value_at_time(&mut self, param: ParamRef, value: f32, time: f64) {
        self.schedule(param, AutomationEvent::SetValue { time, value });
    }

    fn linear_ramp_to_value_at_time(&mut self, param: ParamRef, value: f32, time: f64) {
        self.schedule(param, AutomationEvent::LinearRamp { time, value });
    }

    fn set_target_at_time(&mut self, param: ParamRef, target: f32, start: f64, time_constant: f64) {
        self.schedule(
            param,
            AutomationEvent::SetTarget {
                time: start,
                target,
                time_constant,
            },
        );
    }

    fn cancel_scheduled_values(&mut self, param: ParamRef, time: f64) {
        match self.timelines.get_mut(&param) {
            Some(timeline) => {
                timeline.cancel_from(time);
                self.commands.push(GraphCommand::Cancel { param, time });
            }
            None => log::warn!(target: "host", "cannot cancel automation on unknown {param:?}"),
        }
    }

    fn param_value(&self, param: ParamRef, time: f64) -> f32 {
        self.timelines.get(&param).map_or(0.0, |t| t.value_at(time))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gain(host: &mut CommandHost, level: f32) -> NodeId {
        host.create_node(NodeSpec::Gain { gain: level }).unwrap()
    }

    #[test]
    fn starts_suspended_and_resumes_once() {
        let mut host = CommandHost::new(48000.0);
        assert_eq!(host.state(), HostState::Suspended);
        host.resume().unwrap();
        host.resume().unwrap();
        assert_eq!(host.state(), HostState::Running);
        let resumes = host
            .drain_commands()
            .iter()
            .filter(|c| **c == GraphCommand::Resume)
            .count();
        assert_eq!(resumes, 1);
    }

    #[test]
    fn unavailable_host_fails_to_create() {
        let mut host = CommandHost::unavailable(48000.0);
        assert_eq!(host.create_node(NodeSpec::Gain { gain: 1.0 }), Err(HostError::Unavailable));
        assert!(host.resume().is_err());
    }

    #[test]
    fn connections_are_validated() {
        let mut host = CommandHost::new(48000.0);
        let a = gain(&mut host, 1.0);
        assert!(host.connect(a, host.destination()).is_ok());
        assert!(host.is_connected(a, NodeId(0)));
        assert_eq!(host.connect(a, NodeId(99)), Err(HostError::UnknownNode(NodeId(99))));

        let missing = ParamRef::new(a, ParamName::Q);
        assert_eq!(host.connect_param(a, missing), Err(HostError::UnknownParam(missing)));
    }

    #[test]
    fn only_sources_start_and_only_once() {
        let mut host = CommandHost::new(48000.0);
        let osc = host
            .create_node(NodeSpec::Oscillator {
                waveform: Waveform::Sine,
                frequency: 440.0,
                detune: 0.0,
            })
            .unwrap();
        let g = gain(&mut host, 1.0);
        host.start(osc).unwrap();
        assert!(host.is_started(osc));
        assert_eq!(host.start(osc), Err(HostError::AlreadyStarted(osc)));
        assert_eq!(host.start(g), Err(HostError::NotASource(g)));
    }

    #[test]
    fn mirrors_automation_values() {
        let mut host = CommandHost::new(48000.0);
        let g = gain(&mut host, 0.0);
        let p = ParamRef::new(g, ParamName::Gain);
        host.set_value_at_time(p, 0.0, 0.0);
        host.linear_ramp_to_value_at_time(p, 1.0, 1.0);
        assert!((host.param_value(p, 0.25) - 0.25).abs() < 1e-6);

        host.advance_to(0.5);
        let held = host.cancel_and_hold(p, 0.5);
        assert!((held - 0.5).abs() < 1e-6, "held value should be 0.5, got {held}");
        assert!((host.param_value(p, 2.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn connected_inputs_sum_into_a_param() {
        let mut host = CommandHost::new(48000.0);
        let filter = host
            .create_node(NodeSpec::Filter {
                filter_type: FilterType::Lowpass,
                frequency: 1000.0,
                q: 1.0,
            })
            .unwrap();
        let cutoff = ParamRef::new(filter, ParamName::Frequency);
        let level = host.create_node(NodeSpec::Constant { offset: 0.5 }).unwrap();
        let depth = gain(&mut host, 4000.0);
        host.connect(level, depth).unwrap();
        host.connect_param(depth, cutoff).unwrap();
        assert_eq!(host.computed_value(cutoff, 0.0), 1000.0, "unstarted sources are silent");

        host.start(level).unwrap();
        assert_eq!(host.computed_value(cutoff, 0.0), 3000.0);
        assert_eq!(host.param_value(cutoff, 0.0), 1000.0);

        host.set_value_at_time(ParamRef::new(depth, ParamName::Gain), 100_000.0, 0.0);
        assert_eq!(host.computed_value(cutoff, 0.0), 24000.0, "clamped to nyquist");
    }

    #[test]
    fn clock_never_runs_backwards() {
        let mut host = CommandHost::new(48000.0);
        host.advance_to(2.0);
        host.advance_to(1.0);
        assert_eq!(host.current_time(), 2.0);
    }

    #[test]
    fn commands_serialize_for_the_browser() {
        let mut host = CommandHost::new(48000.0);
        let g = gain(&mut host, 0.5);
        host.set_value_at_time(ParamRef::new(g, ParamName::Gain), 0.25, 1.0);
        let json = serde_json::to_string(&host.drain_commands()).unwrap();
        assert!(json.contains("\"op\":\"createNode\""), "got {json}");
        assert!(json.contains("\"op\":\"automate\""), "got {json}");
        assert!(host.pending_commands().is_empty());
    }
}
