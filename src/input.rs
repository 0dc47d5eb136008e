//! Input mapping — computer keyboard to notes, pointer drags to values.

use crate::config::KEYBOARD_BASE_RANGE;
use crate::params::{ParamKind, ParamValue};

/// Keys of the two-row piano layout, one semitone apart.
pub const NOTE_KEYS: [&str; 17] = [
    "KeyA", "KeyW", "KeyS", "KeyE", "KeyD", "KeyF", "KeyT", "KeyG", "KeyY", "KeyH", "KeyU", "KeyJ",
    "KeyK", "KeyO", "KeyL", "KeyP", "Semicolon",
];

pub const OCTAVE_DOWN_KEY: &str = "KeyZ";
pub const OCTAVE_UP_KEY: &str = "KeyX";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Note(u8),
    OctaveDown,
    OctaveUp,
}

#[derive(Debug, Clone)]
pub struct KeyboardMap {
    base_note: u8,
}

impl KeyboardMap {
    pub fn new(base_note: u8) -> Self {
        let (lo, hi) = KEYBOARD_BASE_RANGE;
        KeyboardMap {
            base_note: base_note.clamp(lo, hi),
        }
    }

    pub fn base_note(&self) -> u8 {
        self.base_note
    }

    /// What a key code does at the current octave, if anything.
    pub fn action(&self, code: &str) -> Option<KeyAction> {
        match code {
            OCTAVE_DOWN_KEY => Some(KeyAction::OctaveDown),
            OCTAVE_UP_KEY => Some(KeyAction::OctaveUp),
            _ => {
                let offset = NOTE_KEYS.iter().position(|k| *k == code)?;
                let note = self.base_note as usize + offset;
                u8::try_from(note).ok().filter(|n| *n <= 127).map(KeyAction::Note)
            }
        }
    }

    /// Shift the base note by whole octaves, staying inside the allowed range.
    pub fn shift_octave(&mut self, octaves: i8) -> u8 {
        let (lo, hi) = KEYBOARD_BASE_RANGE;
        let shifted = self.base_note as i32 + octaves as i32 * 12;
        if shifted >= lo as i32 && shifted <= hi as i32 {
            self.base_note = shifted as u8;
            log::debug!(target: "input", "keyboard base note now {}", self.base_note);
        }
        self.base_note
    }
}

/// Accumulates vertical drag on one parameter.
///
/// Stepped parameters move one index per `sensitivity / steps` pixels, so
/// small pointer deltas are carried over until they add up to a step.
#[derive(Debug, Clone, Default)]
pub struct DragState {
    residual: f32,
}

impl DragState {
    pub fn new() -> Self {
        Self::default()
    }

    /// New raw value after dragging by `delta_px` (positive is down).
    pub fn apply(&mut self, kind: ParamKind, current: ParamValue, delta_px: f32, sensitivity: f32) -> f32 {
        match kind {
            ParamKind::Continuous { min, max, .. } => {
                let value = current.as_f32() - delta_px * (max - min) / sensitivity;
                value.clamp(min, max)
            }
            ParamKind::Stepped { steps, .. } => self.step(current.as_f32(), steps, delta_px, sensitivity),
            ParamKind::Switch { .. } => self.step(current.as_f32(), 2, delta_px, sensitivity),
        }
    }

    fn step(&mut self, current: f32, steps: usize, delta_px: f32, sensitivity: f32) -> f32 {
        let per_step = sensitivity / steps as f32;
        self.residual -= delta_px;
        let moved = (self.residual / per_step).trunc();
        self.residual -= moved * per_step;
        (current + moved).clamp(0.0, (steps - 1) as f32)
    }

    pub fn reset(&mut self) {
        self.residual = 0.0;
    }
}
