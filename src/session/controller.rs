use std::sync::{Arc, Mutex};

use log::{debug, error, info};

use super::gate::RequestGate;
use super::state::CaptureSession;
use super::types::{InferenceProvider, PresentationSink, ScreenCapture, SessionError, SessionEvent};
use crate::config::Shortcuts;

/// Commands the controller accepts, one per user trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Single shot, or "done adding" when multi-page mode is armed
    Capture,
    /// First press arms multi-page mode, later presses add a page
    MultiCapture,
    Annotate(String),
    Reset,
    ShowTextInput,
}

/// Banner texts, built from whatever the shortcuts are bound to right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instructions {
    pub idle: String,
    pub multi_page: String,
}

impl From<&Shortcuts> for Instructions {
    fn from(s: &Shortcuts) -> Self {
        Self {
            idle: format!(
                "{}: Screenshot | {}: Multi-mode | {}: Hide Window | {}: Close",
                s.capture.display_name,
                s.multi_capture.display_name,
                s.toggle_window.display_name,
                s.quit.display_name,
            ),
            multi_page: format!(
                "Multi-mode: {} to add, {} to add text, {} to finalize",
                s.multi_capture.display_name, s.text_input.display_name, s.capture.display_name,
            ),
        }
    }
}

/// Drives the capture session from user commands and reports to a sink.
pub struct SessionController<C, P, S> {
    session: CaptureSession,
    gate: RequestGate,
    capture: C,
    provider: P,
    sink: S,
    shortcuts: Arc<Mutex<Shortcuts>>,
}

impl<C, P, S> SessionController<C, P, S>
where
    C: ScreenCapture,
    P: InferenceProvider,
    S: PresentationSink,
{
    pub fn new(capture: C, provider: P, sink: S, shortcuts: Arc<Mutex<Shortcuts>>) -> Self {
        Self {
            session: CaptureSession::new(),
            gate: RequestGate::new(),
            capture,
            provider,
            sink,
            shortcuts,
        }
    }

    #[cfg(test)]
    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    pub fn instructions(&self) -> Instructions {
        let shortcuts = self.shortcuts.lock().unwrap_or_else(|e| e.into_inner());
        Instructions::from(&*shortcuts)
    }

    /// Process commands until the sending side closes.
    ///
    /// Each command is handled to completion before the next one is taken,
    /// so presses that arrive during a capture or an inference call wait
    /// in the channel instead of overlapping it.
    pub async fn run(mut self, commands: async_channel::Receiver<Command>) {
        info!("session controller started");
        let idle = self.instructions().idle;
        self.sink.present(SessionEvent::InstructionUpdate(idle));

        while let Ok(command) = commands.recv().await {
            self.handle(command).await;
        }

        info!("session controller stopped");
    }

    pub async fn handle(&mut self, command: Command) {
        debug!(
            "handling {command:?} (stage={}, multi_page={})",
            self.session.stage(),
            self.session.is_multi_page()
        );

        match command {
            Command::Capture => {
                if self.session.is_multi_page() {
                    info!("finalizing multi-page capture");
                    self.finalize().await;
                } else {
                    info!("taking single screenshot");
                    self.capture_and_finalize().await;
                }
            }
            Command::MultiCapture => self.multi_capture().await,
            Command::Annotate(text) => {
                info!("received text input");
                self.session.annotate(text);
                self.show_multi_page_instruction();
            }
            Command::Reset => {
                self.session.reset();
                self.sink.present(SessionEvent::Cleared);
                let idle = self.instructions().idle;
                self.sink.present(SessionEvent::InstructionUpdate(idle));
            }
            Command::ShowTextInput => {
                if self.session.is_multi_page() {
                    self.sink.present(SessionEvent::ShowTextPrompt);
                } else {
                    debug!("text input ignored outside multi-page mode");
                }
            }
        }
    }

    async fn capture_and_finalize(&mut self) {
        match self.session.capture_once(&self.capture).await {
            Ok(()) => self.finalize().await,
            Err(e) => self.report(e),
        }
    }

    async fn multi_capture(&mut self) {
        if !self.session.is_multi_page() {
            self.session.enter_multi_page();
            self.show_multi_page_instruction();
            return;
        }

        match self.session.capture_additional(&self.capture).await {
            Ok(()) => self.show_multi_page_instruction(),
            Err(e) => self.report(e),
        }
    }

    async fn finalize(&mut self) {
        let outcome = self
            .session
            .finalize(&self.gate, &self.provider, &self.sink)
            .await;

        match outcome {
            Ok(answer) => self.sink.present(SessionEvent::Result(answer)),
            Err(e) => self.report(e),
        }
    }

    fn show_multi_page_instruction(&self) {
        let text = self.instructions().multi_page;
        self.sink.present(SessionEvent::InstructionUpdate(text));
    }

    fn report(&self, err: SessionError) {
        match err {
            SessionError::InvalidCommand(reason) => debug!("{reason}"),
            other => {
                error!("{other}");
                self.sink.present(SessionEvent::Error(other.to_string()));
            }
        }
    }
}
