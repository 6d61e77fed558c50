use std::cell::RefCell;
use std::rc::Rc;

use gtk4::prelude::*;

use super::settings::open_settings;
use super::state::AppState;
use crate::hotkey::Action;
use crate::ui::overlay::{OverlayWidgets, MOVE_STEP};

/// Pixels scrolled per scroll shortcut press.
const SCROLL_STEP: f64 = 100.0;

/// Dispatch one shortcut press. Session actions go to the controller's
/// queue; window actions are applied right away.
pub fn handle_action(state: &Rc<RefCell<AppState>>, app: &libadwaita::Application, action: Action) {
    let Some(overlay) = state.borrow().overlay.clone() else {
        return;
    };

    if !overlay.visibility.is_shown() && action != Action::ToggleWindow {
        log::debug!("Ignoring {action:?} while the overlay is hidden");
        return;
    }

    if let Some(command) = action.session_command() {
        let sender = state.borrow().command_sender.clone();
        if sender.try_send(command).is_err() {
            log::error!("Session controller is not running, dropping {action:?}");
        }
        return;
    }

    match action {
        Action::ToggleWindow => toggle_window(&overlay),
        Action::MoveLeft => overlay.move_by(-MOVE_STEP, 0),
        Action::MoveRight => overlay.move_by(MOVE_STEP, 0),
        Action::MoveUp => overlay.move_by(0, -MOVE_STEP),
        Action::MoveDown => overlay.move_by(0, MOVE_STEP),
        Action::Center => overlay.center(),
        Action::ScrollUp => overlay.scroll_by(-SCROLL_STEP),
        Action::ScrollDown => overlay.scroll_by(SCROLL_STEP),
        Action::OpenSettings => open_settings(state, app),
        Action::Quit => {
            log::info!("Quitting application");
            app.quit();
        }
        Action::Capture | Action::MultiCapture | Action::TextInput | Action::Reset => {}
    }
}

fn toggle_window(overlay: &OverlayWidgets) {
    let shown = overlay.toggle_visible();
    log::debug!("{} overlay window", if shown { "Showing" } else { "Hiding" });
}
