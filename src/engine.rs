//! Synth engine — owns the voice, the parameters and the live graph.
//!
//! Every UI event lands here. Note events go through the [`MonoVoice`]
//! state machine and come out as pitch changes and envelope ramps;
//! parameter changes go through the [`ParamRouter`]. Nothing reaches the
//! host until the graph is built and the host is running.

use crate::config::SynthConfig;
use crate::dsp::oscillator::oscillator_frequency;
use crate::dsp::pitch::{midi_to_frequency, midi_to_name};
use crate::envelope::{Envelope, EnvelopeLevels, EnvelopeSpec, EnvelopeStage, EnvelopeTarget, filter_base};
use crate::error::{SynthError, SynthResult};
use crate::graph::host::{AudioHost, HostError, HostState};
use crate::graph::topology::{GraphParam, SynthGraph, Vco};
use crate::input::{DragState, KeyAction, KeyboardMap};
use crate::params::{ParamId, ParamValue, SynthParameters};
use crate::router::{ApplyMode, ParamRouter, RouteEffect};
use crate::voice::{KeyId, MonoVoice, Transition};

/// Result of a note event at the engine boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteOutcome {
    /// Handled by the voice (possibly as bookkeeping only).
    Played(Transition),
    /// Not a note event (auto-repeat, unmapped key, octave shift).
    Ignored,
    /// The engine is not running yet; the note is dropped, not queued.
    Rejected,
}

/// Graph handles and envelopes, present once the graph is built.
#[derive(Debug)]
struct Live {
    graph: SynthGraph,
    filter_env: Envelope,
    amp_env: Envelope,
}

pub struct SynthEngine<H: AudioHost> {
    host: H,
    config: SynthConfig,
    params: SynthParameters,
    voice: MonoVoice,
    router: ParamRouter,
    keyboard: KeyboardMap,
    drag: DragState,
    drag_target: Option<ParamId>,
    live: Option<Live>,
    /// Set when graph construction failed; there is no retry.
    failure: Option<HostError>,
    needs_resync: bool,
    /// Note whose key-follow shapes the resting cutoff.
    last_note: Option<u8>,
}

impl<H: AudioHost> SynthEngine<H> {
    pub fn new(host: H, config: SynthConfig) -> SynthResult<Self> {
        config.validate()?;
        Ok(SynthEngine {
            host,
            router: ParamRouter::new(config.smoothing_time_constant),
            keyboard: KeyboardMap::new(config.keyboard_base_note),
            config,
            params: SynthParameters::new(),
            voice: MonoVoice::new(),
            drag: DragState::new(),
            drag_target: None,
            live: None,
            failure: None,
            needs_resync: false,
            last_note: None,
        })
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    pub fn params(&self) -> &SynthParameters {
        &self.params
    }

    pub fn voice(&self) -> &MonoVoice {
        &self.voice
    }

    pub fn keyboard(&self) -> &KeyboardMap {
        &self.keyboard
    }

    pub fn graph(&self) -> Option<&SynthGraph> {
        self.live.as_ref().map(|live| &live.graph)
    }

    pub fn is_initialized(&self) -> bool {
        self.live.is_some()
    }

    /// Graph built and host rendering.
    pub fn is_ready(&self) -> bool {
        self.live.is_some() && self.host.state() == HostState::Running
    }

    pub fn envelope_stage(&self, target: EnvelopeTarget) -> Option<EnvelopeStage> {
        let now = self.host.current_time();
        self.live.as_ref().map(|live| match target {
            EnvelopeTarget::Filter => live.filter_env.stage_at(now),
            EnvelopeTarget::Amplitude => live.amp_env.stage_at(now),
        })
    }

    // ── Lifecycle ──────────────────────────────────────────────

    /// Build the graph. Runs once; a failure is remembered and returned
    /// again on every later call.
    pub fn initialize(&mut self) -> SynthResult {
        if self.live.is_some() {
            return Ok(());
        }
        if let Some(err) = &self.failure {
            return Err(SynthError::Init(err.clone()));
        }

        match SynthGraph::build(&mut self.host, &self.params, &self.config) {
            Ok(graph) => {
                let filter_env = Envelope::new(EnvelopeTarget::Filter, graph.param(GraphParam::FilterEnvelope));
                let amp_env = Envelope::new(EnvelopeTarget::Amplitude, graph.param(GraphParam::Gate));
                self.live = Some(Live {
                    graph,
                    filter_env,
                    amp_env,
                });
                self.sync()
            }
            Err(err) => {
                log::error!(target: "engine", "audio graph construction failed: {err}");
                self.failure = Some(err.clone());
                Err(SynthError::Init(err))
            }
        }
    }

    /// Build the graph if needed and start the host. Call from a user gesture.
    pub fn resume(&mut self) -> SynthResult {
        self.initialize()?;
        if self.host.state() != HostState::Running {
            self.host.resume()?;
            log::info!(target: "engine", "audio resumed at {:.3}s", self.host.current_time());
            self.needs_resync = true;
        }
        self.sync()
    }

    /// Push every parameter to the graph if changes were held back.
    fn sync(&mut self) -> SynthResult {
        if !self.needs_resync || !self.is_ready() {
            return Ok(());
        }
        let Some(live) = &self.live else {
            return Ok(());
        };
        let pending = self.router.resync(&mut self.host, &live.graph, &self.params)?;
        self.needs_resync = false;
        for (_, effect) in pending {
            self.follow_up(effect, ApplyMode::Immediate);
        }
        Ok(())
    }

    // ── Notes ──────────────────────────────────────────────────

    pub fn note_on(&mut self, key: KeyId, note: u8) -> NoteOutcome {
        if !self.is_ready() {
            log::warn!(target: "engine", "note {note} rejected: audio is not running yet");
            return NoteOutcome::Rejected;
        }
        if note > 127 {
            return NoteOutcome::Ignored;
        }
        let legato = self.params.flag(ParamId::VoiceLegato);
        let transition = self.voice.press(key, note, legato);
        self.perform(transition);
        NoteOutcome::Played(transition)
    }

    /// Key release. Always updates bookkeeping, even when not running.
    pub fn note_off(&mut self, key: &KeyId) -> NoteOutcome {
        let transition = self.voice.release(key);
        self.perform(transition);
        NoteOutcome::Played(transition)
    }

    pub fn key_down(&mut self, code: &str, repeat: bool) -> NoteOutcome {
        if repeat {
            return NoteOutcome::Ignored;
        }
        match self.keyboard.action(code) {
            Some(KeyAction::Note(note)) => self.note_on(KeyId::Code(code.to_string()), note),
            Some(KeyAction::OctaveDown) => {
                self.keyboard.shift_octave(-1);
                NoteOutcome::Ignored
            }
            Some(KeyAction::OctaveUp) => {
                self.keyboard.shift_octave(1);
                NoteOutcome::Ignored
            }
            None => NoteOutcome::Ignored,
        }
    }

    pub fn key_up(&mut self, code: &str) -> NoteOutcome {
        self.note_off(&KeyId::Code(code.to_string()))
    }

    pub fn pointer_down(&mut self, note: u8) -> NoteOutcome {
        self.note_on(KeyId::Pointer(note), note)
    }

    pub fn pointer_up(&mut self, note: u8) -> NoteOutcome {
        self.note_off(&KeyId::Pointer(note))
    }

    /// Focus lost: release everything and forget held keys.
    pub fn blur(&mut self) -> Transition {
        let transition = self.voice.reset();
        self.perform(transition);
        self.drag_target = None;
        log::debug!(target: "engine", "focus lost: {transition:?}");
        transition
    }

    fn perform(&mut self, transition: Transition) {
        match transition {
            Transition::None => {}
            Transition::Start { note } => {
                self.apply_pitch(note, false);
                self.trigger(note);
            }
            Transition::Change { from, to, retrigger } => {
                if from != to {
                    self.apply_pitch(to, true);
                }
                if retrigger {
                    self.trigger(to);
                }
            }
            Transition::Return { to, .. } => self.apply_pitch(to, true),
            Transition::Release { note } => self.release(note),
        }
    }

    /// Point both oscillators at `note`, gliding when asked and portamento
    /// is long enough.
    fn apply_pitch(&mut self, note: u8, glide: bool) {
        let Some(live) = &self.live else {
            return;
        };
        let base = midi_to_frequency(note, self.config.tuning_pitch) as f32;

        let sample_rate = self.host.sample_rate();
        let now = self.host.current_time();
        let portamento = self.params.number(ParamId::VoicePortamento) as f64;
        let glide_time_constant = (glide && portamento > self.config.portamento_threshold)
            .then(|| portamento * self.config.glide_ratio);

        for vco in Vco::ALL {
            let octave = self.params.index(ParamId::octave_of(vco));
            let frequency = oscillator_frequency(base, octave, sample_rate);
            let param = live.graph.oscillator_frequency(vco);
            self.host.cancel_and_hold(param, now);
            match glide_time_constant {
                Some(tau) => self.host.set_target_at_time(param, frequency, now, tau),
                None => self.host.set_value_at_time(param, frequency, now),
            }
        }
        log::debug!(
            target: "voice",
            "pitch -> {} ({base:.2} Hz), glide {glide_time_constant:?}",
            midi_to_name(note)
        );
    }

    /// Restart both envelopes for `note` and move the resting cutoff to its
    /// key-follow position.
    fn trigger(&mut self, note: u8) {
        let Some(live) = self.live.as_mut() else {
            return;
        };
        for env in [&mut live.filter_env, &mut live.amp_env] {
            let spec = EnvelopeSpec::from_params(env.target(), &self.params);
            let levels = EnvelopeLevels::for_target(env.target(), &spec, self.config.gain_floor);
            env.trigger(&mut self.host, &spec, &levels, self.config.min_ramp_time);
        }
        self.last_note = Some(note);
        self.settle_cutoff(ApplyMode::Smoothed);
    }

    fn release(&mut self, note: u8) {
        let Some(live) = self.live.as_mut() else {
            return;
        };
        for env in [&mut live.filter_env, &mut live.amp_env] {
            let spec = EnvelopeSpec::from_params(env.target(), &self.params);
            let levels = EnvelopeLevels::for_target(env.target(), &spec, self.config.gain_floor);
            env.release(&mut self.host, &spec, &levels, self.config.min_ramp_time);
        }
        log::debug!(target: "engine", "released {}", midi_to_name(note));
    }

    // ── Parameters ─────────────────────────────────────────────

    /// Store a parameter value and, when running, smooth it onto the graph.
    ///
    /// Returns the stored value, or `None` if the input was rejected.
    pub fn set_param(&mut self, id: ParamId, raw: f32) -> Option<ParamValue> {
        let value = self.params.set(id, raw)?;
        self.push(id);
        Some(value)
    }

    /// [`set_param`](Self::set_param) addressed by dotted path.
    pub fn set_param_path(&mut self, path: &str, raw: f32) -> SynthResult<ParamValue> {
        let id: ParamId = path.parse()?;
        Ok(self.set_param(id, raw).unwrap_or(self.params.get(id)))
    }

    pub fn param_value(&self, id: ParamId) -> ParamValue {
        self.params.get(id)
    }

    /// Move a parameter by a vertical pointer drag of `delta_px`.
    pub fn drag_param(&mut self, id: ParamId, delta_px: f32) -> Option<ParamValue> {
        if self.drag_target != Some(id) {
            self.drag.reset();
            self.drag_target = Some(id);
        }
        let raw = self
            .drag
            .apply(id.kind(), self.params.get(id), delta_px, self.config.drag_sensitivity);
        self.set_param(id, raw)
    }

    pub fn end_drag(&mut self) {
        self.drag.reset();
        self.drag_target = None;
    }

    /// Restore the default (double activation).
    pub fn reset_param(&mut self, id: ParamId) -> ParamValue {
        let value = self.params.reset(id);
        self.push(id);
        value
    }

    fn push(&mut self, id: ParamId) {
        if !self.is_ready() {
            self.needs_resync = true;
            return;
        }
        let Some(live) = &self.live else {
            return;
        };
        match self
            .router
            .route(&mut self.host, &live.graph, &self.params, id, ApplyMode::Smoothed)
        {
            Ok(effect) => self.follow_up(effect, ApplyMode::Smoothed),
            Err(err) => log::warn!(target: "engine", "could not apply {}: {err}", id.path()),
        }
    }

    fn follow_up(&mut self, effect: RouteEffect, mode: ApplyMode) {
        match effect {
            RouteEffect::Repitch => {
                if let Some(note) = self.voice.current_note() {
                    self.apply_pitch(note, false);
                }
            }
            RouteEffect::Cutoff => self.settle_cutoff(mode),
            RouteEffect::Applied | RouteEffect::Deferred => {}
        }
    }

    /// Write the resting cutoff: the knob plus key-follow for the last
    /// triggered note. The filter envelope rides on top through its depth
    /// stage, so this never disturbs a ramp in flight.
    fn settle_cutoff(&mut self, mode: ApplyMode) {
        let Some(live) = &self.live else {
            return;
        };
        let base = filter_base(&self.params, &self.config, self.last_note, self.host.sample_rate());
        self.router
            .write(&mut self.host, live.graph.param(GraphParam::FilterFrequency), base, mode);
    }
}
