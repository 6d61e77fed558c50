mod actions;
mod settings;
mod sink;
mod state;

pub use actions::handle_action;
pub use sink::{OverlayCapture, OverlaySink};
pub use state::AppState;
