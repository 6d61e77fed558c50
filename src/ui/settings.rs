use gtk4::prelude::*;
use libadwaita::prelude::*;

use crate::config::Config;
use crate::hotkey::Action;

/// A shortcut row: its action, the label showing the current binding, and
/// the button that starts rebinding.
pub struct ShortcutRow {
    pub action: Action,
    pub binding_label: gtk4::Label,
    pub change_button: gtk4::Button,
}

/// Handles returned from building the settings window.
pub struct SettingsWidgets {
    pub window: libadwaita::ApplicationWindow,
    pub api_key_row: libadwaita::PasswordEntryRow,
    pub model_row: libadwaita::EntryRow,
    pub base_url_row: libadwaita::EntryRow,
    pub shortcut_rows: Vec<ShortcutRow>,
}

/// Build the settings window, pre-filled from `config`.
pub fn build_settings(
    app: &libadwaita::Application,
    config: &Config,
    log_dir: &str,
) -> SettingsWidgets {
    let window = libadwaita::ApplicationWindow::builder()
        .application(app)
        .title("Snap Answer Settings")
        .default_width(600)
        .default_height(640)
        .build();

    let toolbar_view = libadwaita::ToolbarView::new();
    toolbar_view.add_top_bar(&libadwaita::HeaderBar::new());

    let content = gtk4::Box::new(gtk4::Orientation::Vertical, 0);
    content.set_margin_start(16);
    content.set_margin_end(16);
    content.set_margin_top(12);
    content.set_margin_bottom(12);

    // --- API group ---
    let api_group = libadwaita::PreferencesGroup::new();
    api_group.set_title("Vision Model API");

    let api_key_row = libadwaita::PasswordEntryRow::builder()
        .title("API Key")
        .text(config.api.api_key.as_str())
        .build();
    api_group.add(&api_key_row);

    let model_row = libadwaita::EntryRow::builder()
        .title("Model")
        .text(config.api.model.as_str())
        .build();
    api_group.add(&model_row);

    let base_url_row = libadwaita::EntryRow::builder()
        .title("Base URL (empty for api.openai.com)")
        .text(config.api.base_url.as_deref().unwrap_or(""))
        .build();
    api_group.add(&base_url_row);

    content.append(&api_group);
    content.append(&gtk4::Separator::new(gtk4::Orientation::Horizontal));

    // --- Shortcuts group ---
    let shortcuts_group = libadwaita::PreferencesGroup::new();
    shortcuts_group.set_title("Shortcuts");
    shortcuts_group.set_margin_top(12);

    let mut shortcut_rows = Vec::with_capacity(Action::ALL.len());
    for action in Action::ALL {
        let row = libadwaita::ActionRow::builder().title(action.label()).build();

        let binding_label =
            gtk4::Label::new(Some(config.shortcuts.binding(action).display_name.as_str()));
        binding_label.add_css_class("dim-label");
        row.add_suffix(&binding_label);

        let change_button = gtk4::Button::builder()
            .label("Change")
            .valign(gtk4::Align::Center)
            .build();
        row.add_suffix(&change_button);
        shortcuts_group.add(&row);

        shortcut_rows.push(ShortcutRow {
            action,
            binding_label,
            change_button,
        });
    }

    content.append(&shortcuts_group);
    content.append(&gtk4::Separator::new(gtk4::Orientation::Horizontal));

    // --- Logs group ---
    let logs_group = libadwaita::PreferencesGroup::new();
    logs_group.set_title("Logs");
    logs_group.set_margin_top(12);

    let logs_row = libadwaita::ActionRow::builder()
        .title("Log Directory")
        .subtitle(log_dir)
        .subtitle_selectable(true)
        .build();
    logs_group.add(&logs_row);
    content.append(&logs_group);

    let scrolled = gtk4::ScrolledWindow::builder()
        .hscrollbar_policy(gtk4::PolicyType::Never)
        .child(&content)
        .build();
    toolbar_view.set_content(Some(&scrolled));
    window.set_content(Some(&toolbar_view));

    SettingsWidgets {
        window,
        api_key_row,
        model_row,
        base_url_row,
        shortcut_rows,
    }
}
