use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::hotkey::Action;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

const KEY_LEFTCTRL: u16 = 29;
const KEY_LEFTSHIFT: u16 = 42;

/// Key codes for one hotkey combination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotkeyConfig {
    /// evdev key codes for modifier keys (e.g. 29 = KEY_LEFTCTRL)
    pub modifiers: Vec<u16>,
    /// evdev key code for the trigger key (e.g. 31 = KEY_S)
    pub trigger: u16,
    /// Human-readable name like "Ctrl+Shift+S"
    pub display_name: String,
}

impl HotkeyConfig {
    fn ctrl(trigger: u16, display_name: &str) -> Self {
        Self {
            modifiers: vec![KEY_LEFTCTRL],
            trigger,
            display_name: display_name.into(),
        }
    }

    fn ctrl_shift(trigger: u16, display_name: &str) -> Self {
        Self {
            modifiers: vec![KEY_LEFTCTRL, KEY_LEFTSHIFT],
            trigger,
            display_name: display_name.into(),
        }
    }
}

/// Every global shortcut the app listens for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Shortcuts {
    pub capture: HotkeyConfig,
    pub multi_capture: HotkeyConfig,
    pub text_input: HotkeyConfig,
    pub open_settings: HotkeyConfig,
    pub toggle_window: HotkeyConfig,
    pub reset: HotkeyConfig,
    pub quit: HotkeyConfig,
    pub move_left: HotkeyConfig,
    pub move_right: HotkeyConfig,
    pub move_up: HotkeyConfig,
    pub move_down: HotkeyConfig,
    pub center: HotkeyConfig,
    pub scroll_up: HotkeyConfig,
    pub scroll_down: HotkeyConfig,
}

impl Default for Shortcuts {
    fn default() -> Self {
        Self {
            capture: HotkeyConfig::ctrl_shift(31, "Ctrl+Shift+S"),
            multi_capture: HotkeyConfig::ctrl_shift(30, "Ctrl+Shift+A"),
            text_input: HotkeyConfig::ctrl_shift(23, "Ctrl+Shift+I"),
            open_settings: HotkeyConfig::ctrl(25, "Ctrl+P"),
            toggle_window: HotkeyConfig::ctrl_shift(17, "Ctrl+Shift+W"),
            reset: HotkeyConfig::ctrl_shift(19, "Ctrl+Shift+R"),
            quit: HotkeyConfig::ctrl_shift(16, "Ctrl+Shift+Q"),
            move_left: HotkeyConfig::ctrl(105, "Ctrl+Left"),
            move_right: HotkeyConfig::ctrl(106, "Ctrl+Right"),
            move_up: HotkeyConfig::ctrl(103, "Ctrl+Up"),
            move_down: HotkeyConfig::ctrl(108, "Ctrl+Down"),
            center: HotkeyConfig::ctrl(46, "Ctrl+C"),
            scroll_up: HotkeyConfig::ctrl(22, "Ctrl+U"),
            scroll_down: HotkeyConfig::ctrl(32, "Ctrl+D"),
        }
    }
}

impl Shortcuts {
    pub fn binding(&self, action: Action) -> &HotkeyConfig {
        match action {
            Action::Capture => &self.capture,
            Action::MultiCapture => &self.multi_capture,
            Action::TextInput => &self.text_input,
            Action::OpenSettings => &self.open_settings,
            Action::ToggleWindow => &self.toggle_window,
            Action::Reset => &self.reset,
            Action::Quit => &self.quit,
            Action::MoveLeft => &self.move_left,
            Action::MoveRight => &self.move_right,
            Action::MoveUp => &self.move_up,
            Action::MoveDown => &self.move_down,
            Action::Center => &self.center,
            Action::ScrollUp => &self.scroll_up,
            Action::ScrollDown => &self.scroll_down,
        }
    }

    pub fn binding_mut(&mut self, action: Action) -> &mut HotkeyConfig {
        match action {
            Action::Capture => &mut self.capture,
            Action::MultiCapture => &mut self.multi_capture,
            Action::TextInput => &mut self.text_input,
            Action::OpenSettings => &mut self.open_settings,
            Action::ToggleWindow => &mut self.toggle_window,
            Action::Reset => &mut self.reset,
            Action::Quit => &mut self.quit,
            Action::MoveLeft => &mut self.move_left,
            Action::MoveRight => &mut self.move_right,
            Action::MoveUp => &mut self.move_up,
            Action::MoveDown => &mut self.move_down,
            Action::Center => &mut self.center,
            Action::ScrollUp => &mut self.scroll_up,
            Action::ScrollDown => &mut self.scroll_down,
        }
    }
}

/// Where and how to reach the vision model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub api_key: String,
    pub model: String,
    /// Override for OpenAI-compatible endpoints; `None` means api.openai.com
    pub base_url: Option<String>,
    /// Key taken from `OPENAI_API_KEY`; never written back to disk
    #[serde(skip)]
    pub env_api_key: String,
}

impl ApiConfig {
    /// The stored key, or the environment key when none is stored.
    pub fn effective_key(&self) -> &str {
        if self.api_key.trim().is_empty() {
            &self.env_api_key
        } else {
            &self.api_key
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.into(),
            base_url: None,
            env_api_key: String::new(),
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub shortcuts: Shortcuts,
}

impl Config {
    /// Directory: ~/.config/snap-answer/
    fn dir() -> PathBuf {
        let mut p = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        p.push("snap-answer");
        p
    }

    pub fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load from disk, returning defaults if the file doesn't exist or is invalid.
    /// `OPENAI_API_KEY` is kept aside as the fallback key.
    pub fn load() -> Self {
        let mut config = Self::load_from(&Self::path());
        config.fill_api_key(std::env::var("OPENAI_API_KEY").ok());
        config
    }

    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(data) => serde_json::from_str(&data).unwrap_or_else(|e| {
                log::warn!("Ignoring invalid config {}: {e}", path.display());
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Persist to disk.
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.save_to(&Self::path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data)?;
        Ok(())
    }

    fn fill_api_key(&mut self, from_env: Option<String>) {
        if let Some(key) = from_env.filter(|k| !k.trim().is_empty()) {
            if self.api.api_key.is_empty() {
                log::info!("Using API key from OPENAI_API_KEY");
            }
            self.api.env_api_key = key.trim().to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json"));
        assert_eq!(config, Config::default());
        assert_eq!(config.api.model, "gpt-4o-mini");
        assert_eq!(config.shortcuts.capture.display_name, "Ctrl+Shift+S");
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "api": { "api_key": "sk-test" } }"#).unwrap();

        let config = Config::load_from(&path);

        assert_eq!(config.api.api_key, "sk-test");
        assert_eq!(config.api.model, DEFAULT_MODEL);
        assert_eq!(config.shortcuts, Shortcuts::default());
    }

    #[test]
    fn test_invalid_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let mut config = Config::default();
        config.api.base_url = Some("http://localhost:11434/v1".into());
        config.shortcuts.capture.display_name = "Ctrl+Shift+X".into();
        config.shortcuts.capture.trigger = 45;

        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path), config);
    }

    #[test]
    fn test_env_key_is_only_a_fallback() {
        let mut config = Config::default();
        config.fill_api_key(Some("sk-env".into()));
        assert_eq!(config.api.api_key, "");
        assert_eq!(config.api.effective_key(), "sk-env");

        config.api.api_key = "sk-stored".into();
        assert_eq!(config.api.effective_key(), "sk-stored");

        let mut blank = Config::default();
        blank.fill_api_key(Some("   ".into()));
        assert!(blank.api.effective_key().is_empty());
    }

    #[test]
    fn test_save_does_not_write_env_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = Config::load_from(&path);
        config.fill_api_key(Some("sk-from-env-secret".into()));
        config.shortcuts.reset.trigger = 45;

        config.save_to(&path).unwrap();

        let on_disk = fs::read_to_string(&path).unwrap();
        assert!(!on_disk.contains("sk-from-env-secret"));
        let reloaded = Config::load_from(&path);
        assert_eq!(reloaded.api.api_key, "");
        assert_eq!(reloaded.shortcuts.reset.trigger, 45);
    }

    #[test]
    fn test_binding_mut_targets_action() {
        let mut shortcuts = Shortcuts::default();
        shortcuts.binding_mut(Action::Reset).trigger = 1;
        assert_eq!(shortcuts.binding(Action::Reset).trigger, 1);
        assert_eq!(shortcuts.reset.trigger, 1);
    }
}
