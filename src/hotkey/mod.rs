//! Global shortcut listening.
//!
//! Linux reads evdev devices directly; macOS goes through rdev. Both report
//! key codes in evdev numbering so `HotkeyConfig` is portable.

use std::collections::HashSet;

use crate::config::Shortcuts;
use crate::session::Command;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "macos")]
mod macos;

#[cfg(target_os = "linux")]
pub use linux::{capture_hotkey_combo, start_listener};
#[cfg(target_os = "macos")]
pub use macos::{capture_hotkey_combo, start_listener};

/// Something a shortcut can ask the app to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Capture,
    MultiCapture,
    TextInput,
    OpenSettings,
    ToggleWindow,
    Reset,
    Quit,
    MoveLeft,
    MoveRight,
    MoveUp,
    MoveDown,
    Center,
    ScrollUp,
    ScrollDown,
}

impl Action {
    pub const ALL: [Action; 14] = [
        Action::Capture,
        Action::MultiCapture,
        Action::TextInput,
        Action::OpenSettings,
        Action::ToggleWindow,
        Action::Reset,
        Action::Quit,
        Action::MoveLeft,
        Action::MoveRight,
        Action::MoveUp,
        Action::MoveDown,
        Action::Center,
        Action::ScrollUp,
        Action::ScrollDown,
    ];

    /// Title shown in the settings window.
    pub fn label(self) -> &'static str {
        match self {
            Action::Capture => "Screenshot / Finalize",
            Action::MultiCapture => "Multi-page Capture",
            Action::TextInput => "Add Text",
            Action::OpenSettings => "Open Settings",
            Action::ToggleWindow => "Show / Hide Window",
            Action::Reset => "Reset Session",
            Action::Quit => "Quit",
            Action::MoveLeft => "Move Left",
            Action::MoveRight => "Move Right",
            Action::MoveUp => "Move Up",
            Action::MoveDown => "Move Down",
            Action::Center => "Center Window",
            Action::ScrollUp => "Scroll Up",
            Action::ScrollDown => "Scroll Down",
        }
    }

    /// The session command behind this action, if it is not a window action.
    pub fn session_command(self) -> Option<Command> {
        match self {
            Action::Capture => Some(Command::Capture),
            Action::MultiCapture => Some(Command::MultiCapture),
            Action::TextInput => Some(Command::ShowTextInput),
            Action::Reset => Some(Command::Reset),
            _ => None,
        }
    }
}

/// Resolve a key-down of `pressed` against the configured bindings.
/// When several bindings match, the one requiring the most modifiers wins.
pub fn match_binding(shortcuts: &Shortcuts, held: &HashSet<u16>, pressed: u16) -> Option<Action> {
    Action::ALL
        .into_iter()
        .map(|action| (action, shortcuts.binding(action)))
        .filter(|(_, hk)| hk.trigger == pressed && hk.modifiers.iter().all(|m| held.contains(m)))
        .max_by_key(|(_, hk)| hk.modifiers.len())
        .map(|(action, _)| action)
}

fn is_modifier(code: u16) -> bool {
    matches!(
        code,
        29 | 97 | 42 | 54 | 56 | 100 | 125 | 126
        // LCTRL | RCTRL | LSHIFT | RSHIFT | LALT | RALT | LMETA | RMETA
    )
}

fn key_name(code: u16) -> &'static str {
    match code {
        29 | 97 => "Ctrl",
        42 | 54 => "Shift",
        56 | 100 => "Alt",
        125 | 126 if cfg!(target_os = "macos") => "Cmd",
        125 | 126 => "Super",
        _ => "",
    }
}

fn common_trigger_name(code: u16) -> Option<&'static str> {
    let name = match code {
        1 => "Esc",
        14 => "Backspace",
        15 => "Tab",
        28 => "Enter",
        57 => "Space",
        103 => "Up",
        105 => "Left",
        106 => "Right",
        108 => "Down",
        _ => return None,
    };
    Some(name)
}

/// "Ctrl+Shift+S"-style label. Modifiers are ordered Ctrl, Shift, Alt, Super.
fn build_display_name(modifiers: &[u16], trigger: &str) -> String {
    let mut names: Vec<&str> = modifiers.iter().map(|&m| key_name(m)).collect();
    names.sort_by_key(|n| ["Ctrl", "Shift", "Alt", "Super", "Cmd"].iter().position(|k| k == n));
    names.dedup();

    let mut parts: Vec<String> = names
        .into_iter()
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect();
    parts.push(trigger.to_string());
    parts.join("+")
}

/// Modifiers currently held, in a stable order, for a captured combination.
fn held_modifiers(held: &HashSet<u16>) -> Vec<u16> {
    let mut modifiers: Vec<u16> = held.iter().copied().filter(|k| is_modifier(*k)).collect();
    modifiers.sort_unstable();
    modifiers
}
