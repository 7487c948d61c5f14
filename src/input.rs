// ==============================================================================
// input.rs — KEY CODES, KEY SIGNALS, PENDING INPUT QUEUE
// ------------------------------------------------------------------------------
// Key events arrive as (code, down, repeat). Repeats are dropped, the rest are
// queued as signals: a press is the bare code ("ArrowUp"), a release carries
// a '-' prefix ("-ArrowUp"). The game hands the whole queue to the input
// handlers once per tick and then flushes it.
// ==============================================================================

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::InputError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Space,
    ShiftLeft,
    ShiftRight,
    KeyR,
    Escape,
}

impl KeyCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyCode::ArrowUp => "ArrowUp",
            KeyCode::ArrowDown => "ArrowDown",
            KeyCode::ArrowLeft => "ArrowLeft",
            KeyCode::ArrowRight => "ArrowRight",
            KeyCode::Space => "Space",
            KeyCode::ShiftLeft => "ShiftLeft",
            KeyCode::ShiftRight => "ShiftRight",
            KeyCode::KeyR => "KeyR",
            KeyCode::Escape => "Escape",
        }
    }
}

impl FromStr for KeyCode {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "ArrowUp" => KeyCode::ArrowUp,
            "ArrowDown" => KeyCode::ArrowDown,
            "ArrowLeft" => KeyCode::ArrowLeft,
            "ArrowRight" => KeyCode::ArrowRight,
            "Space" => KeyCode::Space,
            "ShiftLeft" => KeyCode::ShiftLeft,
            "ShiftRight" => KeyCode::ShiftRight,
            "KeyR" => KeyCode::KeyR,
            "Escape" => KeyCode::Escape,
            other => return Err(InputError::UnknownKey(other.to_string())),
        })
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pressed or released key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeySignal {
    pub code: KeyCode,
    pub pressed: bool,
}

impl KeySignal {
    pub fn press(code: KeyCode) -> Self {
        Self { code, pressed: true }
    }

    pub fn release(code: KeyCode) -> Self {
        Self { code, pressed: false }
    }
}

impl fmt::Display for KeySignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.pressed {
            f.write_str("-")?;
        }
        f.write_str(self.code.as_str())
    }
}

impl FromStr for KeySignal {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_prefix('-') {
            Some(code) => Ok(Self::release(code.parse()?)),
            None => Ok(Self::press(s.parse()?)),
        }
    }
}

/// Raw key event as delivered by the front-end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub code: String,
    pub down: bool,
    #[serde(default)]
    pub repeat: bool,
}

#[derive(Debug, Default)]
pub struct InputQueue {
    pending: Vec<KeySignal>,
}

impl InputQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_key_down(&mut self, code: KeyCode, repeat: bool) {
        if repeat {
            return;
        }
        self.pending.push(KeySignal::press(code));
    }

    pub fn on_key_up(&mut self, code: KeyCode) {
        self.pending.push(KeySignal::release(code));
    }

    /// Queue a front-end event. Codes the game does not bind are rejected.
    pub fn push_event(&mut self, event: &KeyEvent) -> Result<(), InputError> {
        let code: KeyCode = event.code.parse()?;
        if event.down {
            self.on_key_down(code, event.repeat);
        } else {
            self.on_key_up(code);
        }
        Ok(())
    }

    pub fn pending(&self) -> &[KeySignal] {
        &self.pending
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn flush(&mut self) {
        self.pending.clear();
    }
}
