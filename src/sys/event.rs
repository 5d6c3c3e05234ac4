use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::geometry::Point;
use super::keysym::Keysym;

/// Opaque display-server handle of a top-level window.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WindowId(pub u32);

impl fmt::Debug for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "0x{:x}", self.0) }
}

bitflags! {
    /// Keyboard modifier and pointer button state, using the core protocol's
    /// bit assignments.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u16 {
        const SHIFT = 1 << 0;
        const LOCK = 1 << 1;
        const CONTROL = 1 << 2;
        const MOD1 = 1 << 3;
        const MOD2 = 1 << 4;
        const MOD3 = 1 << 5;
        const MOD4 = 1 << 6;
        const MOD5 = 1 << 7;
        const BUTTON1 = 1 << 8;
        const BUTTON2 = 1 << 9;
        const BUTTON3 = 1 << 10;
        const BUTTON4 = 1 << 11;
        const BUTTON5 = 1 << 12;
    }
}

impl Modifiers {
    const KEYBOARD: Modifiers = Modifiers::SHIFT
        .union(Modifiers::CONTROL)
        .union(Modifiers::MOD1)
        .union(Modifiers::MOD3)
        .union(Modifiers::MOD4)
        .union(Modifiers::MOD5);

    /// Strips pointer buttons as well as caps lock and num lock (`MOD2`) so
    /// that bindings fire regardless of lock state.
    pub fn keyboard(self) -> Modifiers { self & Self::KEYBOARD }

    pub fn from_key_name(name: &str) -> Option<Modifiers> {
        let modifier = match name.trim().to_ascii_lowercase().as_str() {
            "shift" => Modifiers::SHIFT,
            "lock" => Modifiers::LOCK,
            "control" | "ctrl" => Modifiers::CONTROL,
            "mod1" | "alt" => Modifiers::MOD1,
            "mod2" => Modifiers::MOD2,
            "mod3" => Modifiers::MOD3,
            "mod4" | "super" | "meta" | "logo" => Modifiers::MOD4,
            "mod5" => Modifiers::MOD5,
            _ => return None,
        };
        Some(modifier)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MouseButton {
    Primary,
    Middle,
    Secondary,
    Other(u8),
}

impl From<u8> for MouseButton {
    fn from(detail: u8) -> Self {
        match detail {
            1 => MouseButton::Primary,
            2 => MouseButton::Middle,
            3 => MouseButton::Secondary,
            other => MouseButton::Other(other),
        }
    }
}

/// A key combination such as `Mod4 + Shift + 1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct KeyBinding {
    pub modifiers: Modifiers,
    pub keysym: Keysym,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyBindingError {
    #[error("empty key binding")]
    Empty,
    #[error("unknown modifier `{0}`")]
    UnknownModifier(String),
    #[error(transparent)]
    UnknownKey(#[from] super::keysym::UnknownKey),
}

impl KeyBinding {
    pub fn matches(&self, keysym: Keysym, state: Modifiers) -> bool {
        self.keysym == keysym.normalized() && self.modifiers == state.keyboard()
    }
}

impl FromStr for KeyBinding {
    type Err = KeyBindingError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut parts: Vec<&str> =
            raw.split('+').map(str::trim).filter(|p| !p.is_empty()).collect();
        let key = parts.pop().ok_or(KeyBindingError::Empty)?;
        let mut modifiers = Modifiers::empty();
        for part in parts {
            modifiers |= Modifiers::from_key_name(part)
                .ok_or_else(|| KeyBindingError::UnknownModifier(part.to_string()))?;
        }
        Ok(KeyBinding { modifiers, keysym: key.parse()? })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientRequest {
    /// A pager asked for another desktop to become current.
    CurrentDesktop(i64),
    /// A pager or taskbar asked for the window to be closed.
    CloseWindow,
    /// A pager or taskbar asked for the window to be activated.
    ActivateWindow,
    Other,
}

/// One discrete event delivered by the display server.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    MapRequest(WindowId),
    Unmap(WindowId),
    Destroy(WindowId),
    PointerEnter(WindowId),
    ButtonPress {
        window: WindowId,
        button: MouseButton,
        root: Point,
        state: Modifiers,
    },
    ButtonRelease {
        window: WindowId,
        button: MouseButton,
        root: Point,
        state: Modifiers,
    },
    Motion {
        window: WindowId,
        root: Point,
        state: Modifiers,
    },
    KeyPress {
        keysym: Keysym,
        state: Modifiers,
    },
    ClientMessage {
        window: WindowId,
        request: ClientRequest,
    },
}
