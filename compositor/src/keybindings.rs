//! Compositor keybindings.
//!
//! Bindings are parsed from `Mod+Mod+Keysym` strings and matched against
//! the raw (unshifted) keysyms of a key press together with the exact set
//! of held modifiers.

use crate::config::KeybindingsConfig;
use smithay::input::keyboard::{xkb, Keysym, ModifiersState};
use thiserror::Error;

/// Actions the compositor handles itself instead of forwarding the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Stop the event loop.
    Quit,
    /// Give keyboard focus to the most recently mapped window.
    FocusLatest,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeybindingError {
    #[error("empty keybinding")]
    Empty,
    #[error("unknown modifier '{0}'")]
    UnknownModifier(String),
    #[error("unknown keysym '{0}'")]
    UnknownKeysym(String),
}

/// Modifiers that must be held, and no others.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModMask {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub logo: bool,
}

impl ModMask {
    pub fn matches(&self, state: &ModifiersState) -> bool {
        self.ctrl == state.ctrl
            && self.alt == state.alt
            && self.shift == state.shift
            && self.logo == state.logo
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keybinding {
    pub modifiers: ModMask,
    pub keysym: Keysym,
}

impl Keybinding {
    pub fn parse(s: &str) -> Result<Self, KeybindingError> {
        let mut parts: Vec<&str> = s.split('+').map(str::trim).collect();
        let key = parts.pop().filter(|k| !k.is_empty()).ok_or(KeybindingError::Empty)?;

        let mut modifiers = ModMask::default();
        for part in parts {
            match part.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => modifiers.ctrl = true,
                "alt" | "mod1" => modifiers.alt = true,
                "shift" => modifiers.shift = true,
                "super" | "logo" | "mod4" => modifiers.logo = true,
                _ => return Err(KeybindingError::UnknownModifier(part.to_string())),
            }
        }

        let mut keysym = xkb::keysym_from_name(key, xkb::KEYSYM_NO_FLAGS);
        if keysym == Keysym::NoSymbol {
            keysym = xkb::keysym_from_name(key, xkb::KEYSYM_CASE_INSENSITIVE);
        }
        if keysym == Keysym::NoSymbol {
            return Err(KeybindingError::UnknownKeysym(key.to_string()));
        }

        Ok(Self { modifiers, keysym })
    }
}

#[derive(Debug, Clone)]
pub struct Keybindings {
    bindings: Vec<(Keybinding, Action)>,
}

impl Keybindings {
    pub fn from_config(config: &KeybindingsConfig) -> Result<Self, KeybindingError> {
        Ok(Self {
            bindings: vec![
                (Keybinding::parse(&config.quit)?, Action::Quit),
                (Keybinding::parse(&config.focus_latest)?, Action::FocusLatest),
            ],
        })
    }

    /// The action bound to any of `syms` under `modifiers`, if one exists.
    pub fn action_for(&self, modifiers: &ModifiersState, syms: &[Keysym]) -> Option<Action> {
        self.bindings
            .iter()
            .find(|(binding, _)| {
                binding.modifiers.matches(modifiers) && syms.contains(&binding.keysym)
            })
            .map(|(_, action)| *action)
    }
}
