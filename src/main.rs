mod app;
mod config;
mod hotkey;
mod logging;
mod openai;
mod screenshot;
mod session;
mod ui;

use std::cell::RefCell;
use std::rc::Rc;

use gtk4::prelude::*;

use app::{AppState, OverlayCapture, OverlaySink};
use hotkey::Action;
use openai::OpenAiClient;
use screenshot::CommandCapture;
use session::{Command, SessionController};

fn main() {
    logging::init();
    log::info!("Snap Answer starting");

    let application = libadwaita::Application::builder()
        .application_id("com.github.tr4m0ryp.snap-answer")
        .build();

    application.connect_activate(on_activate);
    application.run();
}

fn on_activate(app: &libadwaita::Application) {
    // A second launch only raises the existing overlay
    if let Some(window) = app.windows().first() {
        window.present();
        return;
    }

    // Hotkey thread → UI, and UI → session controller
    let (action_tx, action_rx) = async_channel::unbounded::<Action>();
    let (command_tx, command_rx) = async_channel::unbounded::<Command>();

    let state = match AppState::new(command_tx.clone()) {
        Ok(state) => Rc::new(RefCell::new(state)),
        Err(e) => {
            log::error!("Failed to start async runtime: {e}");
            app.quit();
            return;
        }
    };

    let overlay = Rc::new(ui::overlay::build_overlay(app, command_tx));
    state.borrow_mut().overlay = Some(overlay.clone());

    if state.borrow().config.api.effective_key().is_empty() {
        log::warn!(
            "No OpenAI API key configured, press {} to open settings",
            state.borrow().config.shortcuts.open_settings.display_name
        );
    }

    // Session controller drives capture, inference and presentation
    let controller = {
        let s = state.borrow();
        let runtime = s.tokio_rt.handle().clone();
        let provider = match OpenAiClient::new(s.shared_api.clone(), runtime.clone()) {
            Ok(provider) => provider,
            Err(e) => {
                log::error!("Failed to build HTTP client: {e}");
                app.quit();
                return;
            }
        };
        SessionController::new(
            OverlayCapture::new(CommandCapture::new(runtime), overlay.clone()),
            provider,
            OverlaySink::new(overlay.clone()),
            s.shared_shortcuts.clone(),
        )
    };
    gtk4::glib::spawn_future_local(controller.run(command_rx));

    overlay.window.present();

    // Start hotkey listener
    {
        let shortcuts = state.borrow().shared_shortcuts.clone();
        if let Err(e) = hotkey::start_listener(action_tx, shortcuts) {
            log::error!("Failed to start hotkey listener: {e}");
        }
    }

    // Forward shortcut presses to the action handler
    {
        let state_clone = state.clone();
        let app = app.clone();
        gtk4::glib::spawn_future_local(async move {
            while let Ok(action) = action_rx.recv().await {
                app::handle_action(&state_clone, &app, action);
            }
        });
    }
}
