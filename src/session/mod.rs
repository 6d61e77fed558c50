//! Capture session core: the stage machine, the request gate, and the
//! controller that maps user commands onto them.

mod controller;
mod gate;
mod state;
mod types;

pub use controller::{Command, SessionController};
pub use types::{
    InferenceProvider, PresentationSink, ScreenCapture, Screenshot, SessionError, SessionEvent,
};
