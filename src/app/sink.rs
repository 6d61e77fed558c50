use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use gtk4::glib;
use gtk4::prelude::*;

use crate::screenshot::CommandCapture;
use crate::session::{PresentationSink, ScreenCapture, Screenshot, SessionError, SessionEvent};
use crate::ui::overlay::OverlayWidgets;

/// How long the overlay stays hidden before the screen is grabbed.
const HIDE_DELAY: Duration = Duration::from_millis(200);

/// Renders session events on the overlay window.
pub struct OverlaySink {
    overlay: Rc<OverlayWidgets>,
}

impl OverlaySink {
    pub fn new(overlay: Rc<OverlayWidgets>) -> Self {
        Self { overlay }
    }
}

impl PresentationSink for OverlaySink {
    fn present(&self, event: SessionEvent) {
        match event {
            SessionEvent::Started => self.overlay.set_busy(true),
            SessionEvent::Finished => self.overlay.set_busy(false),
            SessionEvent::Result(text) => self.overlay.show_answer(&text),
            SessionEvent::Error(message) => self.overlay.show_error(&message),
            SessionEvent::Cleared => self.overlay.clear(),
            SessionEvent::ShowTextPrompt => self.overlay.show_text_prompt(),
            SessionEvent::InstructionUpdate(text) => self.overlay.set_instruction(&text),
        }
    }
}

/// Hides the overlay while the screen is captured so it never shows up in
/// its own screenshot.
pub struct OverlayCapture {
    inner: CommandCapture,
    overlay: Rc<OverlayWidgets>,
}

impl OverlayCapture {
    pub fn new(inner: CommandCapture, overlay: Rc<OverlayWidgets>) -> Self {
        Self { inner, overlay }
    }
}

#[async_trait(?Send)]
impl ScreenCapture for OverlayCapture {
    async fn capture(&self) -> Result<Screenshot, SessionError> {
        self.overlay.window.set_visible(false);
        glib::timeout_future(HIDE_DELAY).await;

        let result = self.inner.capture().await;

        // The user may have hidden the overlay meanwhile
        if self.overlay.visibility.is_shown() {
            self.overlay.window.set_visible(true);
        }
        result
    }
}
