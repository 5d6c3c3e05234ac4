//! Key symbols as understood by the X keyboard protocol.
//!
//! Only the subset that makes sense in a key binding is nameable here:
//! latin letters, digits, function keys, arrows and a handful of editing and
//! punctuation keys.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Keysym(pub u32);

const NAMED: &[(&str, u32)] = &[
    ("space", 0x0020),
    ("comma", 0x002c),
    ("minus", 0x002d),
    ("period", 0x002e),
    ("slash", 0x002f),
    ("semicolon", 0x003b),
    ("equal", 0x003d),
    ("bracketleft", 0x005b),
    ("backslash", 0x005c),
    ("bracketright", 0x005d),
    ("grave", 0x0060),
    ("BackSpace", 0xff08),
    ("Tab", 0xff09),
    ("Return", 0xff0d),
    ("Escape", 0xff1b),
    ("Home", 0xff50),
    ("Left", 0xff51),
    ("Up", 0xff52),
    ("Right", 0xff53),
    ("Down", 0xff54),
    ("Prior", 0xff55),
    ("Next", 0xff56),
    ("End", 0xff57),
    ("Print", 0xff61),
    ("Delete", 0xffff),
];

const F1: u32 = 0xffbe;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown key name `{0}`")]
pub struct UnknownKey(pub String);

impl Keysym {
    /// Folds upper-case latin letters onto their lower-case keysym, which is
    /// what the first column of the keyboard mapping reports.
    pub fn normalized(self) -> Keysym {
        match self.0 {
            0x41..=0x5a => Keysym(self.0 + 0x20),
            _ => self,
        }
    }

    pub fn name(self) -> Option<String> {
        let value = self.0;
        if let Some((name, _)) = NAMED.iter().find(|(_, sym)| *sym == value) {
            return Some((*name).to_string());
        }
        match value {
            0x30..=0x39 | 0x61..=0x7a => char::from_u32(value).map(String::from),
            v if (F1..F1 + 24).contains(&v) => Some(format!("F{}", v - F1 + 1)),
            _ => None,
        }
    }
}

impl FromStr for Keysym {
    type Err = UnknownKey;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let name = raw.trim();
        if let Some((_, sym)) = NAMED.iter().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
            return Ok(Keysym(*sym));
        }
        let mut chars = name.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if c.is_ascii_alphanumeric() {
                return Ok(Keysym(c.to_ascii_lowercase() as u32));
            }
        }
        if let Some(n) = name.strip_prefix(['F', 'f']).and_then(|n| n.parse::<u32>().ok()) {
            if (1..=24).contains(&n) {
                return Ok(Keysym(F1 + n - 1));
            }
        }
        Err(UnknownKey(name.to_string()))
    }
}

impl fmt::Display for Keysym {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(&name),
            None => write!(f, "0x{:04x}", self.0),
        }
    }
}
