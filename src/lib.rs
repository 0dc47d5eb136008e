pub mod config;
pub mod dsp;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod graph;
pub mod input;
pub mod params;
pub mod router;
pub mod voice;

use crate::config::SynthConfig;
use crate::dsp::random_lfo::{FREQUENCY_PARAM, RandomLfo};
use crate::engine::{NoteOutcome, SynthEngine};
use crate::error::{ConfigError, SynthError};
use crate::graph::CommandHost;
use crate::params::ParamId;
use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the monosynth-core version string.
#[wasm_bindgen(js_name = coreVersion)]
pub fn core_version() -> String {
    VERSION.to_string()
}

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&format!("{e}"))
}

/// WASM-exposed: the synth, driven by the page's event handlers.
///
/// Every event carries the audio clock's `currentTime` so scheduling lines
/// up with what the browser is rendering. Graph changes accumulate as
/// commands until `drainCommands` hands them over.
#[wasm_bindgen]
pub struct WebSynth {
    engine: SynthEngine<CommandHost>,
}

#[wasm_bindgen]
impl WebSynth {
    /// `sample_rate` of zero (or less) means no audio context could be
    /// created; `initialize` will then fail. `config` may be `undefined`.
    #[wasm_bindgen(constructor)]
    pub fn new(sample_rate: f32, config: JsValue) -> Result<WebSynth, JsValue> {
        let config: SynthConfig = if config.is_undefined() || config.is_null() {
            SynthConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)
                .map_err(|e| js_error(SynthError::Config(ConfigError::Parse(e.to_string()))))?
        };
        let host = if sample_rate.is_finite() && sample_rate > 0.0 {
            CommandHost::new(sample_rate)
        } else {
            CommandHost::unavailable(sample_rate)
        };
        let engine = SynthEngine::new(host, config).map_err(js_error)?;
        Ok(WebSynth { engine })
    }

    pub fn initialize(&mut self) -> Result<(), JsValue> {
        self.engine.initialize().map_err(js_error)
    }

    /// Call from a user gesture.
    pub fn resume(&mut self, time: f64) -> Result<(), JsValue> {
        self.engine.host_mut().advance_to(time);
        self.engine.resume().map_err(js_error)
    }

    #[wasm_bindgen(js_name = isReady)]
    pub fn is_ready(&self) -> bool {
        self.engine.is_ready()
    }

    /// Returns false when the note was rejected because audio is not running.
    #[wasm_bindgen(js_name = keyDown)]
    pub fn key_down(&mut self, code: &str, repeat: bool, time: f64) -> bool {
        self.engine.host_mut().advance_to(time);
        self.engine.key_down(code, repeat) != NoteOutcome::Rejected
    }

    #[wasm_bindgen(js_name = keyUp)]
    pub fn key_up(&mut self, code: &str, time: f64) {
        self.engine.host_mut().advance_to(time);
        self.engine.key_up(code);
    }

    #[wasm_bindgen(js_name = pointerDown)]
    pub fn pointer_down(&mut self, note: u8, time: f64) -> bool {
        self.engine.host_mut().advance_to(time);
        self.engine.pointer_down(note) != NoteOutcome::Rejected
    }

    #[wasm_bindgen(js_name = pointerUp)]
    pub fn pointer_up(&mut self, note: u8, time: f64) {
        self.engine.host_mut().advance_to(time);
        self.engine.pointer_up(note);
    }

    pub fn blur(&mut self, time: f64) {
        self.engine.host_mut().advance_to(time);
        self.engine.blur();
    }

    /// Set a parameter by path; returns the stored value.
    #[wasm_bindgen(js_name = setParam)]
    pub fn set_param(&mut self, path: &str, value: f32, time: f64) -> Result<f32, JsValue> {
        self.engine.host_mut().advance_to(time);
        self.engine
            .set_param_path(path, value)
            .map(|v| v.as_f32())
            .map_err(js_error)
    }

    #[wasm_bindgen(js_name = dragParam)]
    pub fn drag_param(&mut self, path: &str, delta_px: f32, time: f64) -> Result<f32, JsValue> {
        let id: ParamId = path.parse().map_err(js_error)?;
        self.engine.host_mut().advance_to(time);
        self.engine.drag_param(id, delta_px);
        Ok(self.engine.param_value(id).as_f32())
    }

    #[wasm_bindgen(js_name = endDrag)]
    pub fn end_drag(&mut self) {
        self.engine.end_drag();
    }

    /// Double activation: back to the default.
    #[wasm_bindgen(js_name = resetParam)]
    pub fn reset_param(&mut self, path: &str, time: f64) -> Result<f32, JsValue> {
        let id: ParamId = path.parse().map_err(js_error)?;
        self.engine.host_mut().advance_to(time);
        Ok(self.engine.reset_param(id).as_f32())
    }

    #[wasm_bindgen(js_name = paramValue)]
    pub fn param_value(&self, path: &str) -> Result<f32, JsValue> {
        let id: ParamId = path.parse().map_err(js_error)?;
        Ok(self.engine.param_value(id).as_f32())
    }

    /// Graph commands recorded since the last call, as an array of objects.
    #[wasm_bindgen(js_name = drainCommands)]
    pub fn drain_commands(&mut self) -> Result<JsValue, JsValue> {
        let commands = self.engine.host_mut().drain_commands();
        serde_wasm_bindgen::to_value(&commands).map_err(js_error)
    }

    /// Every parameter value keyed by path, as JSON.
    #[wasm_bindgen(js_name = parametersJson)]
    pub fn parameters_json(&self) -> Result<String, JsValue> {
        self.engine.params().to_json().map_err(js_error)
    }
}

/// WASM-exposed: the held random generator for the `random-lfo` worklet.
#[wasm_bindgen]
pub struct RandomLfoProcessor {
    lfo: RandomLfo,
}

#[wasm_bindgen]
impl RandomLfoProcessor {
    #[wasm_bindgen(constructor)]
    pub fn new(sample_rate: f32, seed: u32) -> RandomLfoProcessor {
        RandomLfoProcessor {
            lfo: RandomLfo::new(sample_rate, seed as u64),
        }
    }

    /// Render one block into `output`; the worklet copies it to the other
    /// channels.
    pub fn process(&mut self, frequency: &[f32], output: &mut [f32]) {
        self.lfo.process(frequency, &mut [output]);
    }

    pub fn value(&self) -> f32 {
        self.lfo.value()
    }
}

/// WASM-exposed: `parameterDescriptors` for the `random-lfo` processor.
#[wasm_bindgen(js_name = randomLfoDescriptor)]
pub fn random_lfo_descriptor() -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(&[FREQUENCY_PARAM]).map_err(js_error)
}
