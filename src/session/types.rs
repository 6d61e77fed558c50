use async_trait::async_trait;
use base64::Engine;

/// Failures surfaced by a capture session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Screenshot failed: {0}")]
    CaptureFailed(String),
    #[error("{0}")]
    InferenceFailed(String),
    /// Command issued in a state that does not accept it. Never shown to the user.
    #[error("ignored command: {0}")]
    InvalidCommand(&'static str),
    #[error("A request is already in flight")]
    Busy,
}

/// Events delivered to whatever displays the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Started,
    Finished,
    Result(String),
    Error(String),
    Cleared,
    ShowTextPrompt,
    InstructionUpdate(String),
}

/// One captured screen, PNG-encoded.
#[derive(Clone, PartialEq, Eq)]
pub struct Screenshot {
    png: Vec<u8>,
}

impl Screenshot {
    pub fn from_png(png: Vec<u8>) -> Self {
        Self { png }
    }

    #[cfg(test)]
    pub fn as_bytes(&self) -> &[u8] {
        &self.png
    }

    /// `data:` URL suitable for an `image_url` content part.
    pub fn to_data_url(&self) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&self.png);
        format!("data:image/png;base64,{encoded}")
    }
}

impl std::fmt::Debug for Screenshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Screenshot({} bytes)", self.png.len())
    }
}

/// Produces one screenshot per call.
#[async_trait(?Send)]
pub trait ScreenCapture {
    async fn capture(&self) -> Result<Screenshot, SessionError>;
}

/// Turns screenshots plus the user's note into an answer.
#[async_trait(?Send)]
pub trait InferenceProvider {
    async fn infer(&self, images: &[Screenshot], annotation: &str) -> Result<String, SessionError>;
}

/// Receives session events. Called synchronously on the controller's thread.
pub trait PresentationSink {
    fn present(&self, event: SessionEvent);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_url_prefix_and_payload() {
        let shot = Screenshot::from_png(b"png".to_vec());
        assert_eq!(shot.to_data_url(), "data:image/png;base64,cG5n");
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            SessionError::CaptureFailed("grim exited".into()).to_string(),
            "Screenshot failed: grim exited"
        );
        assert_eq!(
            SessionError::InferenceFailed("401 Unauthorized".into()).to_string(),
            "401 Unauthorized"
        );
    }

    #[test]
    fn test_debug_hides_bytes() {
        let shot = Screenshot::from_png(vec![0; 42]);
        assert_eq!(format!("{shot:?}"), "Screenshot(42 bytes)");
    }
}
