//! Monophonic voice — note priority and retrigger decisions.
//!
//! A pure state machine: it never touches the audio graph. Each key event
//! returns a [`Transition`] that the engine turns into pitch changes and
//! envelope triggers.

/// What pressed a note.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyId {
    /// A computer-keyboard key, by `KeyboardEvent.code`.
    Code(String),
    /// An on-screen key, identified by its note.
    Pointer(u8),
}

/// Sound-level consequence of a key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Bookkeeping only.
    None,
    /// Silent to sounding: jump to the note and trigger both envelopes.
    Start { note: u8 },
    /// A new key while sounding. `from == to` when the same note was
    /// pressed on another key.
    Change { from: u8, to: u8, retrigger: bool },
    /// The sounding key was released while others are held; never retriggers.
    Return { from: u8, to: u8 },
    /// The last key was released (or focus was lost).
    Release { note: u8 },
}

#[derive(Debug, Clone, Default)]
pub struct MonoVoice {
    current_note: Option<u8>,
    /// Held keys in press order, with the note each one produced.
    held: Vec<(KeyId, u8)>,
}

impl MonoVoice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_note(&self) -> Option<u8> {
        self.current_note
    }

    pub fn held_keys(&self) -> &[(KeyId, u8)] {
        &self.held
    }

    pub fn is_held(&self, key: &KeyId) -> bool {
        self.held.iter().any(|(k, _)| k == key)
    }

    /// Key-down. A key that is already held is ignored.
    pub fn press(&mut self, key: KeyId, note: u8, legato: bool) -> Transition {
        if self.is_held(&key) {
            return Transition::None;
        }
        self.held.push((key, note));

        let transition = match self.current_note {
            None => Transition::Start { note },
            Some(prev) if prev == note => {
                if legato {
                    Transition::None
                } else {
                    Transition::Change {
                        from: prev,
                        to: note,
                        retrigger: true,
                    }
                }
            }
            Some(prev) => Transition::Change {
                from: prev,
                to: note,
                retrigger: !legato,
            },
        };
        self.current_note = Some(note);
        log::debug!(target: "voice", "press {note}: {transition:?}");
        transition
    }

    /// Key-up. Unknown keys are ignored.
    pub fn release(&mut self, key: &KeyId) -> Transition {
        let Some(pos) = self.held.iter().position(|(k, _)| k == key) else {
            return Transition::None;
        };
        let (_, note) = self.held.remove(pos);

        let transition = match self.current_note {
            Some(current) if current == note => match self.highest_held() {
                None => {
                    self.current_note = None;
                    Transition::Release { note: current }
                }
                Some(next) if next == current => Transition::None,
                Some(next) => {
                    self.current_note = Some(next);
                    Transition::Return {
                        from: current,
                        to: next,
                    }
                }
            },
            _ => Transition::None,
        };
        log::debug!(target: "voice", "release {note}: {transition:?}");
        transition
    }

    /// Drop every held key (focus loss).
    pub fn reset(&mut self) -> Transition {
        self.held.clear();
        match self.current_note.take() {
            Some(note) => Transition::Release { note },
            None => Transition::None,
        }
    }

    fn highest_held(&self) -> Option<u8> {
        self.held.iter().map(|(_, note)| *note).max()
    }
}
