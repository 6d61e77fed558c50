use std::cell::Cell;
use std::rc::Rc;

use gtk4::prelude::*;
use gtk4::{cairo, gdk, Align};
#[cfg(target_os = "linux")]
use gtk4_layer_shell::LayerShell;

use super::markup::answer_markup;
use crate::session::Command;

const WINDOW_WIDTH: i32 = 900;
const WINDOW_HEIGHT: i32 = 600;
/// Pixels moved per move shortcut press.
pub const MOVE_STEP: i32 = 50;

/// Whether the user wants the overlay on screen. The short hide around a
/// screenshot leaves it untouched.
#[derive(Debug, Clone)]
pub struct Visibility(Rc<Cell<bool>>);

impl Visibility {
    pub fn new(shown: bool) -> Self {
        Self(Rc::new(Cell::new(shown)))
    }

    pub fn is_shown(&self) -> bool {
        self.0.get()
    }

    pub fn set_shown(&self, shown: bool) {
        self.0.set(shown);
    }

    /// Flip the wanted state and return the new one.
    pub fn toggle(&self) -> bool {
        let shown = !self.0.get();
        self.0.set(shown);
        shown
    }
}

/// Handles returned from building the overlay window.
pub struct OverlayWidgets {
    pub window: gtk4::Window,
    pub banner: gtk4::Label,
    pub spinner: gtk4::Spinner,
    pub answer_scroll: gtk4::ScrolledWindow,
    pub answer_label: gtk4::Label,
    pub error_label: gtk4::Label,
    pub text_entry: gtk4::Entry,
    pub visibility: Visibility,
    /// Top-left margin while anchored through layer-shell
    position: Cell<(i32, i32)>,
    layer_shell: bool,
}

impl OverlayWidgets {
    /// Hide or show the window; returns whether it is now shown.
    pub fn toggle_visible(&self) -> bool {
        let shown = self.visibility.toggle();
        self.window.set_visible(shown);
        shown
    }

    pub fn set_instruction(&self, text: &str) {
        self.banner.set_text(text);
    }

    pub fn set_busy(&self, busy: bool) {
        self.spinner.set_visible(busy);
        self.spinner.set_spinning(busy);
        if busy {
            self.banner.add_css_class("waiting");
        } else {
            self.banner.remove_css_class("waiting");
        }
    }

    pub fn show_answer(&self, text: &str) {
        self.answer_label.set_markup(&answer_markup(text));
        self.answer_scroll.vadjustment().set_value(0.0);
        self.answer_scroll.set_visible(true);
        self.error_label.set_visible(false);
    }

    pub fn show_error(&self, message: &str) {
        self.error_label.set_text(message);
        self.error_label.set_visible(true);
    }

    pub fn clear(&self) {
        self.answer_label.set_text("");
        self.answer_scroll.set_visible(false);
        self.error_label.set_visible(false);
        self.text_entry.set_text("");
        self.text_entry.set_visible(false);
        set_interactive(&self.window, self.layer_shell, false);
    }

    /// Reveal the note entry and take keyboard focus for it.
    pub fn show_text_prompt(&self) {
        if !self.visibility.is_shown() {
            return;
        }
        self.window.set_visible(true);
        self.text_entry.set_visible(true);
        set_interactive(&self.window, self.layer_shell, true);
        self.text_entry.grab_focus();
    }

    pub fn move_by(&self, dx: i32, dy: i32) {
        if !self.layer_shell {
            log::debug!("Window placement is managed by the window manager");
            return;
        }
        let (x, y) = self.position.get();
        self.place(x + dx, (y + dy).max(0));
    }

    pub fn center(&self) {
        if !self.layer_shell {
            log::debug!("Window placement is managed by the window manager");
            return;
        }
        let Some((screen_w, screen_h)) = monitor_size() else {
            return;
        };
        let (w, h) = (self.window.width(), self.window.height());
        self.place((screen_w - w) / 2, (screen_h - h) / 2);
    }

    pub fn scroll_by(&self, amount: f64) {
        let adj = self.answer_scroll.vadjustment();
        let max = (adj.upper() - adj.page_size()).max(adj.lower());
        adj.set_value((adj.value() + amount).clamp(adj.lower(), max));
    }

    #[cfg(target_os = "linux")]
    fn place(&self, x: i32, y: i32) {
        self.position.set((x, y));
        self.window.set_margin(gtk4_layer_shell::Edge::Left, x);
        self.window.set_margin(gtk4_layer_shell::Edge::Top, y);
    }

    #[cfg(not(target_os = "linux"))]
    fn place(&self, x: i32, y: i32) {
        self.position.set((x, y));
    }
}

fn monitor_size() -> Option<(i32, i32)> {
    let display = gdk::Display::default()?;
    let monitor = display
        .monitors()
        .item(0)
        .and_then(|obj| obj.downcast::<gdk::Monitor>().ok())?;
    let geometry = monitor.geometry();
    Some((geometry.width(), geometry.height()))
}

/// Top-middle placement, nudged left of centre.
fn initial_position() -> (i32, i32) {
    let screen_w = monitor_size().map(|(w, _)| w).unwrap_or(1920);
    let x = ((screen_w - 800) / 2) * 4 / 5;
    (x.max(0), 0)
}

/// Queue a typed note for the session. Returns false if it was dropped.
fn submit_note(sender: &async_channel::Sender<Command>, text: String) -> bool {
    match sender.try_send(Command::Annotate(text)) {
        Ok(()) => true,
        Err(e) => {
            log::error!("Session controller is not running, note dropped: {e}");
            false
        }
    }
}

/// Toggle between click-through and accepting input.
fn set_interactive(window: &gtk4::Window, layer_shell: bool, interactive: bool) {
    if let Some(surface) = window.surface() {
        let region = if interactive {
            cairo::Region::create_rectangle(&cairo::RectangleInt::new(
                0,
                0,
                surface.width(),
                surface.height(),
            ))
        } else {
            cairo::Region::create()
        };
        surface.set_input_region(&region);
    }

    #[cfg(target_os = "linux")]
    if layer_shell {
        window.set_keyboard_mode(if interactive {
            gtk4_layer_shell::KeyboardMode::OnDemand
        } else {
            gtk4_layer_shell::KeyboardMode::None
        });
    }
    #[cfg(not(target_os = "linux"))]
    let _ = layer_shell;
}

/// Build the transparent answer overlay.
pub fn build_overlay(
    app: &libadwaita::Application,
    command_sender: async_channel::Sender<Command>,
) -> OverlayWidgets {
    let window = gtk4::Window::builder()
        .application(app)
        .title("Snap Answer")
        .decorated(false)
        .resizable(false)
        .default_width(WINDOW_WIDTH)
        .default_height(WINDOW_HEIGHT)
        .build();

    window.add_css_class("answer-overlay");

    let css_provider = gtk4::CssProvider::new();
    css_provider.load_from_string(
        r#"
        window.answer-overlay {
            background-color: transparent;
        }
        .instruction-banner {
            background-color: rgba(30, 30, 30, 0.85);
            color: white;
            border-radius: 16px;
            padding: 6px 16px;
            font-size: 13px;
        }
        .instruction-banner.waiting {
            color: rgba(255, 255, 255, 0.5);
        }
        .answer-box {
            background-color: rgba(20, 20, 20, 0.85);
            border-radius: 12px;
            padding: 12px 16px;
        }
        .answer-text {
            color: white;
            font-size: 14px;
        }
        .answer-error {
            background-color: rgba(120, 20, 20, 0.90);
            color: white;
            border-radius: 12px;
            padding: 8px 16px;
        }
        "#,
    );
    if let Some(display) = gdk::Display::default() {
        gtk4::style_context_add_provider_for_display(
            &display,
            &css_provider,
            gtk4::STYLE_PROVIDER_PRIORITY_APPLICATION,
        );
    }

    let vbox = gtk4::Box::new(gtk4::Orientation::Vertical, 8);
    vbox.set_valign(Align::Start);

    let header = gtk4::Box::new(gtk4::Orientation::Horizontal, 8);
    header.set_halign(Align::Center);

    let banner = gtk4::Label::new(None);
    banner.add_css_class("instruction-banner");

    let spinner = gtk4::Spinner::new();
    spinner.set_visible(false);

    header.append(&banner);
    header.append(&spinner);

    let text_entry = gtk4::Entry::new();
    text_entry.set_placeholder_text(Some("Add a note for the model, then press Enter"));
    text_entry.set_visible(false);

    let answer_label = gtk4::Label::new(None);
    answer_label.add_css_class("answer-text");
    answer_label.set_wrap(true);
    answer_label.set_wrap_mode(gtk4::pango::WrapMode::WordChar);
    answer_label.set_xalign(0.0);
    answer_label.set_valign(Align::Start);

    let answer_scroll = gtk4::ScrolledWindow::builder()
        .hscrollbar_policy(gtk4::PolicyType::Never)
        .min_content_height(WINDOW_HEIGHT - 120)
        .child(&answer_label)
        .build();
    answer_scroll.add_css_class("answer-box");
    answer_scroll.set_visible(false);

    let error_label = gtk4::Label::new(None);
    error_label.add_css_class("answer-error");
    error_label.set_wrap(true);
    error_label.set_visible(false);

    vbox.append(&header);
    vbox.append(&text_entry);
    vbox.append(&error_label);
    vbox.append(&answer_scroll);

    window.set_child(Some(&vbox));

    let layer_shell = init_placement(&window);

    // Note entry: Enter submits the text as the session annotation
    {
        let window = window.clone();
        text_entry.connect_activate(move |entry| {
            let text = entry.text().to_string();
            submit_note(&command_sender, text);
            entry.set_text("");
            entry.set_visible(false);
            set_interactive(&window, layer_shell, false);
        });
    }

    // Click-through until the note entry is needed
    window.connect_realize(move |w| set_interactive(w, layer_shell, false));

    let visibility = Visibility::new(true);
    {
        let visibility = visibility.clone();
        window.connect_close_request(move |w| {
            visibility.set_shown(false);
            w.set_visible(false);
            gtk4::glib::Propagation::Stop
        });
    }

    let overlay = OverlayWidgets {
        window,
        banner,
        spinner,
        answer_scroll,
        answer_label,
        error_label,
        text_entry,
        visibility,
        position: Cell::new((0, 0)),
        layer_shell,
    };
    if layer_shell {
        let (x, y) = initial_position();
        overlay.place(x, y);
    }
    overlay
}

/// Put the window on the overlay layer where the compositor supports it.
/// Returns whether layer-shell placement is active.
fn init_placement(window: &gtk4::Window) -> bool {
    #[cfg(target_os = "linux")]
    {
        let is_wayland = std::env::var("XDG_SESSION_TYPE")
            .map(|s| s == "wayland")
            .unwrap_or(false);

        if is_wayland && gtk4_layer_shell::is_supported() {
            window.init_layer_shell();
            window.set_layer(gtk4_layer_shell::Layer::Overlay);
            window.set_anchor(gtk4_layer_shell::Edge::Top, true);
            window.set_anchor(gtk4_layer_shell::Edge::Left, true);
            window.set_keyboard_mode(gtk4_layer_shell::KeyboardMode::None);
            return true;
        }
        log::info!("Layer-shell unavailable; overlay placement is left to the window manager");
        false
    }

    #[cfg(not(target_os = "linux"))]
    {
        window.set_decorated(false);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_note_reaches_controller() {
        let (tx, rx) = async_channel::unbounded();
        assert!(submit_note(&tx, "use metric units".into()));
        assert_eq!(
            rx.try_recv().unwrap(),
            Command::Annotate("use metric units".into())
        );
    }

    #[test]
    fn test_submit_note_reports_closed_controller() {
        let (tx, rx) = async_channel::unbounded::<Command>();
        drop(rx);
        assert!(!submit_note(&tx, "lost".into()));
    }

    #[test]
    fn test_visibility_toggle() {
        let visibility = Visibility::new(true);
        assert!(!visibility.toggle());
        assert!(visibility.toggle());
        assert!(visibility.is_shown());
    }

    #[test]
    fn test_visibility_is_shared_between_clones() {
        let visibility = Visibility::new(true);
        let held_by_capture = visibility.clone();

        // Hidden by the user while a screenshot is being taken
        visibility.toggle();

        assert!(!held_by_capture.is_shown());
    }
}
