//! ADSR envelope controller — schedules ramps on a host parameter.
//!
//! The host renders the curve; this module decides the breakpoints. Every
//! trigger and release first cancels whatever is still scheduled on the
//! target and pins the parameter at its current value, so a retrigger
//! mid-release ramps up from where the sound actually is.

use crate::config::SynthConfig;
use crate::dsp::pitch::clamp_frequency;
use crate::graph::host::{AudioHost, ParamRef};
use crate::params::{ParamId, SynthParameters};

/// Which parameter an envelope drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeTarget {
    /// Unit level of the filter envelope source.
    Filter,
    /// Output gate gain.
    Amplitude,
}

/// Envelope stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStage {
    Idle,
    /// Attack or decay ramp in flight.
    Attacking,
    Sustained,
    Releasing,
}

/// Stage times (seconds) and sustain level (0..1), read fresh at each
/// trigger and release.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeSpec {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl EnvelopeSpec {
    pub fn from_params(target: EnvelopeTarget, params: &SynthParameters) -> Self {
        let [attack, decay, sustain, release] = match target {
            EnvelopeTarget::Filter => [
                ParamId::FilterEnvAttack,
                ParamId::FilterEnvDecay,
                ParamId::FilterEnvSustain,
                ParamId::FilterEnvRelease,
            ],
            EnvelopeTarget::Amplitude => [
                ParamId::VcaEnvAttack,
                ParamId::VcaEnvDecay,
                ParamId::VcaEnvSustain,
                ParamId::VcaEnvRelease,
            ],
        };
        EnvelopeSpec {
            attack: params.number(attack),
            decay: params.number(decay),
            sustain: params.number(sustain),
            release: params.number(release),
        }
    }
}

/// Target values of one envelope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeLevels {
    pub peak: f32,
    pub sustain: f32,
    /// Where a release ends; also the resting value.
    pub release: f32,
}

impl EnvelopeLevels {
    /// Gate levels: full peak, sustain and release floored at `gain_floor`.
    pub fn amplitude(spec: &EnvelopeSpec, gain_floor: f32) -> Self {
        EnvelopeLevels {
            peak: 1.0,
            sustain: spec.sustain.max(gain_floor),
            release: gain_floor,
        }
    }

    /// Filter levels on the 0..1 envelope source. The depth stage turns
    /// them into Hz above the resting cutoff.
    pub fn filter(spec: &EnvelopeSpec) -> Self {
        EnvelopeLevels {
            peak: 1.0,
            sustain: spec.sustain.clamp(0.0, 1.0),
            release: 0.0,
        }
    }

    pub fn for_target(target: EnvelopeTarget, spec: &EnvelopeSpec, gain_floor: f32) -> Self {
        match target {
            EnvelopeTarget::Amplitude => EnvelopeLevels::amplitude(spec, gain_floor),
            EnvelopeTarget::Filter => EnvelopeLevels::filter(spec),
        }
    }
}

/// Cutoff knob plus key-follow for `note` (when enabled), clamped.
pub fn filter_base(params: &SynthParameters, config: &SynthConfig, note: Option<u8>, sample_rate: f32) -> f32 {
    let cutoff = params.number(ParamId::FilterFrequency);
    let follow = match note {
        Some(note) if params.flag(ParamId::FilterKeyFollow) => config.key_follow.offset(cutoff, note),
        _ => 0.0,
    };
    clamp_frequency(cutoff + follow, sample_rate)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Schedule {
    Idle,
    /// Attack starts at `start`; the sustain level is reached at `sustain_at`.
    Triggered { start: f64, sustain_at: f64 },
    Released { start: f64, done_at: f64 },
}

#[derive(Debug, Clone)]
pub struct Envelope {
    target: EnvelopeTarget,
    param: ParamRef,
    schedule: Schedule,
}

impl Envelope {
    pub fn new(target: EnvelopeTarget, param: ParamRef) -> Self {
        Envelope {
            target,
            param,
            schedule: Schedule::Idle,
        }
    }

    pub fn target(&self) -> EnvelopeTarget {
        self.target
    }

    /// Start attack from the current value, then decay to sustain.
    pub fn trigger<H: AudioHost>(
        &mut self,
        host: &mut H,
        spec: &EnvelopeSpec,
        levels: &EnvelopeLevels,
        min_ramp: f64,
    ) {
        let now = host.current_time();
        let from = host.cancel_and_hold(self.param, now);
        let attack_end = now + (spec.attack as f64).max(min_ramp);
        let decay_end = attack_end + (spec.decay as f64).max(min_ramp);
        host.linear_ramp_to_value_at_time(self.param, levels.peak, attack_end);
        host.linear_ramp_to_value_at_time(self.param, levels.sustain, decay_end);
        self.schedule = Schedule::Triggered {
            start: now,
            sustain_at: decay_end,
        };
        log::debug!(
            target: "envelope",
            "{:?} trigger at {now:.3}: {from} -> {} -> {}",
            self.target,
            levels.peak,
            levels.sustain
        );
    }

    /// Ramp from the current instantaneous value to the release target.
    pub fn release<H: AudioHost>(
        &mut self,
        host: &mut H,
        spec: &EnvelopeSpec,
        levels: &EnvelopeLevels,
        min_ramp: f64,
    ) {
        let now = host.current_time();
        let from = host.cancel_and_hold(self.param, now);
        let done_at = now + (spec.release as f64).max(min_ramp);
        host.linear_ramp_to_value_at_time(self.param, levels.release, done_at);
        self.schedule = Schedule::Released { start: now, done_at };
        log::debug!(
            target: "envelope",
            "{:?} release at {now:.3}: {from} -> {}",
            self.target,
            levels.release
        );
    }

    pub fn stage_at(&self, time: f64) -> EnvelopeStage {
        match self.schedule {
            Schedule::Idle => EnvelopeStage::Idle,
            Schedule::Triggered { start, sustain_at } => {
                if time >= start && time < sustain_at {
                    EnvelopeStage::Attacking
                } else {
                    EnvelopeStage::Sustained
                }
            }
            Schedule::Released { done_at, .. } => {
                if time < done_at {
                    EnvelopeStage::Releasing
                } else {
                    EnvelopeStage::Idle
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::automation::AutomationEvent;
    use crate::graph::command_host::CommandHost;
    use crate::graph::host::{NodeSpec, ParamName};

    const FLOOR: f32 = 1e-4;

    fn gate_host() -> (CommandHost, ParamRef) {
        let mut host = CommandHost::new(48000.0);
        let gate = host.create_node(NodeSpec::Gain { gain: FLOOR }).unwrap();
        (host, ParamRef::new(gate, ParamName::Gain))
    }

    fn adsr(attack: f32, decay: f32, sustain: f32, release: f32) -> EnvelopeSpec {
        EnvelopeSpec {
            attack,
            decay,
            sustain,
            release,
        }
    }

    #[test]
    fn trigger_ramps_to_peak_then_sustain() {
        let (mut host, param) = gate_host();
        let spec = adsr(0.1, 0.2, 0.5, 0.3);
        let levels = EnvelopeLevels::amplitude(&spec, FLOOR);
        let mut env = Envelope::new(EnvelopeTarget::Amplitude, param);
        env.trigger(&mut host, &spec, &levels, 0.001);

        assert!((host.param_value(param, 0.1) - 1.0).abs() < 1e-5);
        assert!((host.param_value(param, 0.3) - 0.5).abs() < 1e-5);
        assert!((host.param_value(param, 5.0) - 0.5).abs() < 1e-5);
        assert_eq!(env.stage_at(0.05), EnvelopeStage::Attacking);
        assert_eq!(env.stage_at(0.29), EnvelopeStage::Attacking);
        assert_eq!(env.stage_at(0.31), EnvelopeStage::Sustained);
    }

    #[test]
    fn release_starts_from_instantaneous_value() {
        let (mut host, param) = gate_host();
        let spec = adsr(1.0, 0.1, 0.8, 0.5);
        let levels = EnvelopeLevels::amplitude(&spec, FLOOR);
        let mut env = Envelope::new(EnvelopeTarget::Amplitude, param);
        env.trigger(&mut host, &spec, &levels, 0.001);

        // half way up the attack
        host.advance_to(0.5);
        env.release(&mut host, &spec, &levels, 0.001);
        let held = host.param_value(param, 0.5);
        assert!((held - 0.5).abs() < 1e-3, "release should start at ~0.5, got {held}");
        assert!((host.param_value(param, 0.75) - (0.5 + FLOOR) / 2.0).abs() < 1e-3);
        assert_eq!(host.param_value(param, 2.0), FLOOR);
        assert_eq!(env.stage_at(0.6), EnvelopeStage::Releasing);
        assert_eq!(env.stage_at(1.0), EnvelopeStage::Idle);
    }

    #[test]
    fn retrigger_cancels_the_release_ramp() {
        let (mut host, param) = gate_host();
        let spec = adsr(0.1, 0.1, 0.5, 1.0);
        let levels = EnvelopeLevels::amplitude(&spec, FLOOR);
        let mut env = Envelope::new(EnvelopeTarget::Amplitude, param);
        env.trigger(&mut host, &spec, &levels, 0.001);
        host.advance_to(1.0);
        env.release(&mut host, &spec, &levels, 0.001);
        host.advance_to(1.5);
        env.trigger(&mut host, &spec, &levels, 0.001);

        let release_ramps = host
            .automation(param)
            .iter()
            .filter(|e| matches!(e, AutomationEvent::LinearRamp { value, .. } if *value == FLOOR))
            .count();
        assert_eq!(release_ramps, 0, "the old release ramp must be cancelled");
        assert!((host.param_value(param, 1.6) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn zero_times_are_floored() {
        let (mut host, param) = gate_host();
        let spec = adsr(0.0, 0.0, 1.0, 0.0);
        let levels = EnvelopeLevels::amplitude(&spec, FLOOR);
        let mut env = Envelope::new(EnvelopeTarget::Amplitude, param);
        env.trigger(&mut host, &spec, &levels, 0.001);
        let times: Vec<f64> = host.automation(param).iter().map(|e| e.time()).collect();
        assert_eq!(times, vec![0.0, 0.001, 0.002]);
    }

    #[test]
    fn amplitude_sustain_never_reaches_zero() {
        let levels = EnvelopeLevels::amplitude(&adsr(0.0, 0.0, 0.0, 0.0), FLOOR);
        assert_eq!(levels.sustain, FLOOR);
        assert_eq!(levels.release, FLOOR);
        assert_eq!(levels.peak, 1.0);
    }

    #[test]
    fn filter_levels_sweep_the_unit_source() {
        let levels = EnvelopeLevels::for_target(EnvelopeTarget::Filter, &adsr(0.1, 0.1, 0.5, 0.1), FLOOR);
        assert_eq!(levels.peak, 1.0);
        assert_eq!(levels.sustain, 0.5);
        assert_eq!(levels.release, 0.0, "no floor on the filter source");
    }

    #[test]
    fn filter_base_follows_the_key() {
        let mut params = SynthParameters::new();
        params.set(ParamId::FilterFrequency, 1000.0);
        let config = SynthConfig::default();

        assert_eq!(filter_base(&params, &config, Some(72), 48000.0), 1000.0, "key-follow is off by default");
        params.set(ParamId::FilterKeyFollow, 1.0);
        assert_eq!(filter_base(&params, &config, Some(72), 48000.0), 1500.0);
        assert_eq!(filter_base(&params, &config, None, 48000.0), 1000.0);
    }

    #[test]
    fn filter_base_is_clamped() {
        let mut params = SynthParameters::new();
        params.set(ParamId::FilterFrequency, 20000.0);
        params.set(ParamId::FilterKeyFollow, 1.0);
        let config = SynthConfig::default();
        assert_eq!(filter_base(&params, &config, Some(127), 44100.0), 22050.0);

        params.set(ParamId::FilterFrequency, 20.0);
        assert_eq!(filter_base(&params, &config, Some(0), 44100.0), 20.0);
    }
}
