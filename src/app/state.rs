use std::cell::RefCell;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use crate::config::{ApiConfig, Config, Shortcuts};
use crate::session::Command;
use crate::ui::overlay::OverlayWidgets;
use crate::ui::settings::SettingsWidgets;

/// Central application state. Lives on the GTK main thread inside Rc<RefCell<>>.
pub struct AppState {
    pub config: Config,
    /// Read by the inference client on every request
    pub shared_api: Arc<Mutex<ApiConfig>>,
    /// Read by the hotkey thread and for banner texts
    pub shared_shortcuts: Arc<Mutex<Shortcuts>>,
    pub tokio_rt: tokio::runtime::Runtime,
    pub command_sender: async_channel::Sender<Command>,

    // UI handles
    pub overlay: Option<Rc<OverlayWidgets>>,
    pub settings: Option<SettingsWidgets>,
}

impl AppState {
    pub fn new(command_sender: async_channel::Sender<Command>) -> std::io::Result<Self> {
        let config = Config::load();
        let shared_api = Arc::new(Mutex::new(config.api.clone()));
        let shared_shortcuts = Arc::new(Mutex::new(config.shortcuts.clone()));
        let tokio_rt = tokio::runtime::Runtime::new()?;

        Ok(Self {
            config,
            shared_api,
            shared_shortcuts,
            tokio_rt,
            command_sender,
            overlay: None,
            settings: None,
        })
    }
}

/// Apply an edit to the API settings, publish it to the client and persist it.
pub fn update_api(state: &Rc<RefCell<AppState>>, edit: impl FnOnce(&mut ApiConfig)) {
    let mut s = state.borrow_mut();
    edit(&mut s.config.api);
    let api = s.config.api.clone();
    *s.shared_api.lock().unwrap_or_else(|e| e.into_inner()) = api;
    if let Err(e) = s.config.save() {
        log::warn!("Failed to save config: {e}");
    }
}

/// Apply an edit to the shortcut bindings, publish it to the listener and persist it.
pub fn update_shortcuts(state: &Rc<RefCell<AppState>>, edit: impl FnOnce(&mut Shortcuts)) {
    let mut s = state.borrow_mut();
    edit(&mut s.config.shortcuts);
    let shortcuts = s.config.shortcuts.clone();
    *s.shared_shortcuts.lock().unwrap_or_else(|e| e.into_inner()) = shortcuts;
    if let Err(e) = s.config.save() {
        log::warn!("Failed to save config: {e}");
    }
}
