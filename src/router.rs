//! Parameter router — pushes parameter values onto the live graph.

use crate::dsp::{LfoShape, Waveform};
use crate::graph::host::{AudioHost, HostResult, ParamRef};
use crate::graph::topology::{GraphParam, SynthGraph, lfo_selector_gains};
use crate::params::{Applied, Binding, ParamId, SynthParameters};

/// How a value reaches the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMode {
    /// Exponential approach with the smoothing time constant.
    Smoothed,
    /// Cancel pending automation and set now.
    Immediate,
}

/// What the engine still has to do after routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteEffect {
    Applied,
    /// An octave switch moved; a sounding note must be re-pitched.
    Repitch,
    /// The cutoff knob moved; the engine adds key-follow and writes it.
    Cutoff,
    /// Consumed at the next trigger.
    Deferred,
}

#[derive(Debug, Clone)]
pub struct ParamRouter {
    smoothing: f64,
}

impl ParamRouter {
    pub fn new(smoothing_time_constant: f64) -> Self {
        ParamRouter {
            smoothing: smoothing_time_constant,
        }
    }

    /// Apply the current value of `id` to the graph.
    pub fn route<H: AudioHost>(
        &self,
        host: &mut H,
        graph: &SynthGraph,
        params: &SynthParameters,
        id: ParamId,
        mode: ApplyMode,
    ) -> HostResult<RouteEffect> {
        let applied = params.applied(id);
        let effect = match (id.binding(), applied) {
            (Binding::Direct(target), Applied::Value(v)) => {
                self.write(host, graph.param(target), v, mode);
                RouteEffect::Applied
            }
            (Binding::Waveform(vco), Applied::Waveform(w)) => {
                host.set_waveform(graph.oscillator(vco), w)?;
                RouteEffect::Applied
            }
            (Binding::FilterType, Applied::FilterType(t)) => {
                host.set_filter_type(graph.filter, t)?;
                RouteEffect::Applied
            }
            (Binding::LfoShape, Applied::LfoShape(shape)) => {
                self.select_lfo(host, graph, shape)?;
                RouteEffect::Applied
            }
            (Binding::LfoRate, Applied::Value(rate)) => {
                self.write(host, graph.param(GraphParam::LfoFrequency), rate, mode);
                self.write(host, graph.param(GraphParam::RandomFrequency), rate, mode);
                RouteEffect::Applied
            }
            (Binding::ReverbMix, Applied::Crossfade { dry, wet }) => {
                self.write(host, graph.param(GraphParam::Dry), dry, mode);
                self.write(host, graph.param(GraphParam::Wet), wet, mode);
                RouteEffect::Applied
            }
            (Binding::Octave(_), _) => RouteEffect::Repitch,
            (Binding::Cutoff, _) => RouteEffect::Cutoff,
            (Binding::ComputationOnly, _) => RouteEffect::Deferred,
            (binding, applied) => {
                log::warn!(target: "router", "{} has no route for {binding:?} = {applied:?}", id.path());
                RouteEffect::Deferred
            }
        };
        log::debug!(target: "router", "{} -> {effect:?}", id.path());
        Ok(effect)
    }

    /// Push every bound parameter to the graph at once.
    ///
    /// Returns the effects the engine still has to handle.
    pub fn resync<H: AudioHost>(
        &self,
        host: &mut H,
        graph: &SynthGraph,
        params: &SynthParameters,
    ) -> HostResult<Vec<(ParamId, RouteEffect)>> {
        let mut pending = Vec::new();
        for id in ParamId::ALL {
            match self.route(host, graph, params, id, ApplyMode::Immediate)? {
                RouteEffect::Applied | RouteEffect::Deferred => {}
                effect => pending.push((id, effect)),
            }
        }
        log::debug!(target: "router", "resynced {} parameters", ParamId::COUNT);
        Ok(pending)
    }

    /// Write one value, smoothed or at once.
    pub fn write<H: AudioHost>(&self, host: &mut H, param: ParamRef, value: f32, mode: ApplyMode) {
        let now = host.current_time();
        match mode {
            ApplyMode::Smoothed => host.set_target_at_time(param, value, now, self.smoothing),
            ApplyMode::Immediate => {
                host.cancel_scheduled_values(param, now);
                host.set_value_at_time(param, value, now);
            }
        }
    }

    fn select_lfo<H: AudioHost>(&self, host: &mut H, graph: &SynthGraph, shape: LfoShape) -> HostResult {
        if let LfoShape::Periodic(waveform) = shape {
            host.set_waveform(graph.lfo_osc, waveform)?;
        }
        let (osc, random) = lfo_selector_gains(shape);
        self.write(host, graph.param(GraphParam::LfoOscSelect), osc, ApplyMode::Immediate);
        self.write(host, graph.param(GraphParam::LfoRandomSelect), random, ApplyMode::Immediate);
        log::debug!(target: "router", "lfo source set to {}", lfo_shape_name(shape));
        Ok(())
    }
}

/// Waveform name for logs and the UI.
pub fn lfo_shape_name(shape: LfoShape) -> &'static str {
    match shape {
        LfoShape::Periodic(w) => Waveform::as_str(w),
        LfoShape::Random => "random",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SynthConfig;
    use crate::graph::automation::AutomationEvent;
    use crate::graph::command_host::{CommandHost, GraphCommand};
    use crate::graph::host::NodeSpec;

    fn setup() -> (CommandHost, SynthGraph, SynthParameters, ParamRouter) {
        let mut host = CommandHost::new(48000.0);
        let params = SynthParameters::new();
        let graph = SynthGraph::build(&mut host, &params, &SynthConfig::default()).unwrap();
        host.drain_commands();
        (host, graph, params, ParamRouter::new(0.01))
    }

    #[test]
    fn direct_params_are_smoothed() {
        let (mut host, graph, mut params, router) = setup();
        params.set(ParamId::MasterVolume, 0.2);
        let effect = router
            .route(&mut host, &graph, &params, ParamId::MasterVolume, ApplyMode::Smoothed)
            .unwrap();
        assert_eq!(effect, RouteEffect::Applied);

        let master = graph.param(GraphParam::Master);
        assert_eq!(
            host.automation(master).last(),
            Some(&AutomationEvent::SetTarget {
                time: 0.0,
                target: 0.2,
                time_constant: 0.01
            })
        );
        assert!((host.param_value(master, 1.0) - 0.2).abs() < 1e-4);
    }

    #[test]
    fn reverb_mix_moves_both_gains() {
        let (mut host, graph, mut params, router) = setup();
        params.set(ParamId::ReverbMix, 1.0);
        router
            .route(&mut host, &graph, &params, ParamId::ReverbMix, ApplyMode::Immediate)
            .unwrap();
        assert_eq!(host.param_value(graph.param(GraphParam::Dry), 0.0), 0.0);
        assert_eq!(host.param_value(graph.param(GraphParam::Wet), 0.0), 1.0);
    }

    #[test]
    fn stepped_params_apply_immediately() {
        let (mut host, graph, mut params, router) = setup();
        params.set(ParamId::Vco2Waveform, 3.0);
        router
            .route(&mut host, &graph, &params, ParamId::Vco2Waveform, ApplyMode::Smoothed)
            .unwrap();
        assert!(matches!(
            host.node_spec(graph.vco2),
            Some(NodeSpec::Oscillator { waveform: Waveform::Triangle, .. })
        ));
        assert!(host.pending_commands().contains(&GraphCommand::SetWaveform {
            id: graph.vco2,
            waveform: Waveform::Triangle
        }));
    }

    #[test]
    fn lfo_shape_switches_sources() {
        let (mut host, graph, mut params, router) = setup();
        params.set(ParamId::LfoWaveform, 4.0);
        router
            .route(&mut host, &graph, &params, ParamId::LfoWaveform, ApplyMode::Smoothed)
            .unwrap();
        assert_eq!(host.param_value(graph.param(GraphParam::LfoOscSelect), 0.0), 0.0);
        assert_eq!(host.param_value(graph.param(GraphParam::LfoRandomSelect), 0.0), 1.0);

        params.set(ParamId::LfoWaveform, 2.0);
        router
            .route(&mut host, &graph, &params, ParamId::LfoWaveform, ApplyMode::Smoothed)
            .unwrap();
        assert_eq!(host.param_value(graph.param(GraphParam::LfoOscSelect), 0.0), 1.0);
        assert!(matches!(
            host.node_spec(graph.lfo_osc),
            Some(NodeSpec::Oscillator { waveform: Waveform::Sawtooth, .. })
        ));
    }

    #[test]
    fn lfo_rate_drives_both_sources() {
        let (mut host, graph, mut params, router) = setup();
        params.set(ParamId::LfoFrequency, 12.0);
        router
            .route(&mut host, &graph, &params, ParamId::LfoFrequency, ApplyMode::Immediate)
            .unwrap();
        assert_eq!(host.param_value(graph.param(GraphParam::LfoFrequency), 0.0), 12.0);
        assert_eq!(host.param_value(graph.param(GraphParam::RandomFrequency), 0.0), 12.0);
    }

    #[test]
    fn computation_only_params_touch_nothing() {
        let (mut host, graph, mut params, router) = setup();
        params.set(ParamId::VcaEnvAttack, 2.0);
        let effect = router
            .route(&mut host, &graph, &params, ParamId::VcaEnvAttack, ApplyMode::Smoothed)
            .unwrap();
        assert_eq!(effect, RouteEffect::Deferred);
        assert!(host.pending_commands().is_empty());
    }

    #[test]
    fn resync_reports_pitch_and_cutoff() {
        let (mut host, graph, params, router) = setup();
        let pending = router.resync(&mut host, &graph, &params).unwrap();
        assert_eq!(
            pending,
            vec![
                (ParamId::Vco1Octave, RouteEffect::Repitch),
                (ParamId::Vco2Octave, RouteEffect::Repitch),
                (ParamId::FilterFrequency, RouteEffect::Cutoff),
            ]
        );
        assert_eq!(host.param_value(graph.param(GraphParam::Master), 0.0), 0.7);
    }

    #[test]
    fn shape_names() {
        let names: Vec<_> = LfoShape::ALL.into_iter().map(lfo_shape_name).collect();
        assert_eq!(names, ["sine", "square", "sawtooth", "triangle", "random"]);
    }
}
