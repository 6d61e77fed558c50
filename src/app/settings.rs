use std::cell::RefCell;
use std::rc::Rc;

use gtk4::prelude::*;
use libadwaita::prelude::*;

use super::state::{update_api, update_shortcuts, AppState};
use crate::ui::hotkey_dialog::show_hotkey_dialog;
use crate::ui::settings::build_settings;

/// Open the settings window, or raise it if it is already open.
pub fn open_settings(state: &Rc<RefCell<AppState>>, app: &libadwaita::Application) {
    if let Some(ref settings) = state.borrow().settings {
        settings.window.present();
        return;
    }

    let widgets = {
        let s = state.borrow();
        let log_dir = crate::logging::log_dir().display().to_string();
        build_settings(app, &s.config, &log_dir)
    };

    // Wire up API fields
    {
        let state_clone = state.clone();
        widgets
            .api_key_row
            .connect_changed(move |row: &libadwaita::PasswordEntryRow| {
                let key = row.text().trim().to_string();
                update_api(&state_clone, |api| api.api_key = key);
            });
    }
    {
        let state_clone = state.clone();
        widgets
            .model_row
            .connect_changed(move |row: &libadwaita::EntryRow| {
                let model = row.text().trim().to_string();
                update_api(&state_clone, |api| api.model = model);
            });
    }
    {
        let state_clone = state.clone();
        widgets
            .base_url_row
            .connect_changed(move |row: &libadwaita::EntryRow| {
                let url = row.text().trim().to_string();
                update_api(&state_clone, |api| {
                    api.base_url = if url.is_empty() { None } else { Some(url) };
                });
            });
    }

    // Wire up each "Change" button
    for row in &widgets.shortcut_rows {
        let state_clone = state.clone();
        let window = widgets.window.clone();
        let label = row.binding_label.clone();
        let action = row.action;
        row.change_button.connect_clicked(move |_| {
            let state_inner = state_clone.clone();
            let label = label.clone();
            show_hotkey_dialog(&window, action.label(), move |result| {
                let Some(new_hotkey) = result else {
                    return;
                };
                log::info!("New binding for {action:?}: {}", new_hotkey.display_name);
                label.set_text(&new_hotkey.display_name);
                update_shortcuts(&state_inner, |shortcuts| {
                    *shortcuts.binding_mut(action) = new_hotkey.clone();
                });
            });
        });
    }

    {
        let state_clone = state.clone();
        widgets.window.connect_close_request(move |_| {
            state_clone.borrow_mut().settings = None;
            gtk4::glib::Propagation::Proceed
        });
    }

    widgets.window.present();
    state.borrow_mut().settings = Some(widgets);
}
