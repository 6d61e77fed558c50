//! Capture session state machine
//!
//! Tracks one user-initiated capture sequence: which stage it is in, the
//! screenshots collected so far, and the free-text note that goes with them.

use log::info;

use super::gate::RequestGate;
use super::types::{InferenceProvider, PresentationSink, ScreenCapture, Screenshot, SessionError};

/// Phase of the current capture sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    /// Nothing captured yet (possibly armed for multi-page)
    #[default]
    Idle,
    /// One or more screenshots queued, waiting for more or for finalize
    Collecting,
    /// An answer has been delivered for the current batch
    Answered,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Idle => write!(f, "Idle"),
            Stage::Collecting => write!(f, "Collecting"),
            Stage::Answered => write!(f, "Answered"),
        }
    }
}

/// The single live capture session.
#[derive(Debug, Default)]
pub struct CaptureSession {
    stage: Stage,
    images: Vec<Screenshot>,
    annotation: String,
    multi_page: bool,
}

impl CaptureSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    #[cfg(test)]
    pub fn images(&self) -> &[Screenshot] {
        &self.images
    }

    #[cfg(test)]
    pub fn annotation(&self) -> &str {
        &self.annotation
    }

    pub fn is_multi_page(&self) -> bool {
        self.multi_page
    }

    /// Take one screenshot and queue it. The caller finalizes right after.
    pub async fn capture_once(&mut self, capture: &dyn ScreenCapture) -> Result<(), SessionError> {
        let shot = capture.capture().await?;
        self.push(shot);
        Ok(())
    }

    /// Arm multi-page mode. Captures nothing.
    pub fn enter_multi_page(&mut self) {
        info!("multi-page mode armed");
        self.multi_page = true;
    }

    /// Take one more screenshot in multi-page mode.
    pub async fn capture_additional(
        &mut self,
        capture: &dyn ScreenCapture,
    ) -> Result<(), SessionError> {
        if !self.multi_page {
            return Err(SessionError::InvalidCommand(
                "additional capture before multi-page mode was armed",
            ));
        }
        let shot = capture.capture().await?;
        self.push(shot);
        Ok(())
    }

    /// Replace the note sent along with the screenshots.
    pub fn annotate(&mut self, text: impl Into<String>) {
        self.annotation = text.into();
    }

    /// Submit everything collected so far. On failure nothing is discarded.
    pub async fn finalize(
        &mut self,
        gate: &RequestGate,
        provider: &dyn InferenceProvider,
        sink: &dyn PresentationSink,
    ) -> Result<String, SessionError> {
        let answer = gate
            .run(&self.images, &self.annotation, provider, sink)
            .await?;
        self.transition_to(Stage::Answered);
        Ok(answer)
    }

    /// Drop all screenshots and the note, disarm multi-page mode.
    pub fn reset(&mut self) {
        self.images.clear();
        self.annotation.clear();
        self.multi_page = false;
        self.transition_to(Stage::Idle);
    }

    fn push(&mut self, shot: Screenshot) {
        self.images.push(shot);
        info!("screenshot queued (total={})", self.images.len());
        self.transition_to(Stage::Collecting);
    }

    fn transition_to(&mut self, stage: Stage) {
        if stage != self.stage {
            info!("session transition {} -> {}", self.stage, stage);
            self.stage = stage;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::types::SessionEvent;
    use async_trait::async_trait;
    use std::cell::{Cell, RefCell};

    struct Camera {
        fail: bool,
        shots: Cell<u8>,
    }

    impl Camera {
        fn working() -> Self {
            Self { fail: false, shots: Cell::new(0) }
        }

        fn broken() -> Self {
            Self { fail: true, shots: Cell::new(0) }
        }
    }

    #[async_trait(?Send)]
    impl ScreenCapture for Camera {
        async fn capture(&self) -> Result<Screenshot, SessionError> {
            if self.fail {
                return Err(SessionError::CaptureFailed("no display".into()));
            }
            let n = self.shots.get() + 1;
            self.shots.set(n);
            Ok(Screenshot::from_png(vec![n]))
        }
    }

    struct Model {
        fail: bool,
        seen: RefCell<Vec<(Vec<Screenshot>, String)>>,
    }

    impl Model {
        fn new(fail: bool) -> Self {
            Self { fail, seen: RefCell::new(Vec::new()) }
        }
    }

    #[async_trait(?Send)]
    impl InferenceProvider for Model {
        async fn infer(&self, images: &[Screenshot], annotation: &str) -> Result<String, SessionError> {
            self.seen
                .borrow_mut()
                .push((images.to_vec(), annotation.to_string()));
            if self.fail {
                Err(SessionError::InferenceFailed("rate limited".into()))
            } else {
                Ok("answer".into())
            }
        }
    }

    struct Quiet;

    impl PresentationSink for Quiet {
        fn present(&self, _: SessionEvent) {}
    }

    #[test]
    fn test_initial_state() {
        let session = CaptureSession::new();
        assert_eq!(session.stage(), Stage::Idle);
        assert!(session.images().is_empty());
        assert_eq!(session.annotation(), "");
        assert!(!session.is_multi_page());
    }

    #[tokio::test]
    async fn test_capture_once_moves_to_collecting() {
        let mut session = CaptureSession::new();
        session.capture_once(&Camera::working()).await.unwrap();
        assert_eq!(session.stage(), Stage::Collecting);
        assert_eq!(session.images().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_capture_changes_nothing() {
        let mut session = CaptureSession::new();
        let err = session.capture_once(&Camera::broken()).await.unwrap_err();
        assert_eq!(err, SessionError::CaptureFailed("no display".into()));
        assert_eq!(session.stage(), Stage::Idle);
        assert!(session.images().is_empty());
    }

    #[tokio::test]
    async fn test_arming_does_not_capture() {
        let mut session = CaptureSession::new();
        session.enter_multi_page();
        assert!(session.is_multi_page());
        assert_eq!(session.stage(), Stage::Idle);
        assert!(session.images().is_empty());
    }

    #[tokio::test]
    async fn test_additional_capture_requires_arming() {
        let mut session = CaptureSession::new();
        let camera = Camera::working();

        let err = session.capture_additional(&camera).await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidCommand(_)));
        assert_eq!(camera.shots.get(), 0);

        session.enter_multi_page();
        session.capture_additional(&camera).await.unwrap();
        session.capture_additional(&camera).await.unwrap();
        assert_eq!(session.stage(), Stage::Collecting);
        let order: Vec<u8> = session.images().iter().map(|s| s.as_bytes()[0]).collect();
        assert_eq!(order, vec![1, 2]);
    }

    #[test]
    fn test_annotation_latest_write_wins() {
        let mut session = CaptureSession::new();
        session.annotate("first");
        session.annotate("second");
        assert_eq!(session.annotation(), "second");
    }

    #[tokio::test]
    async fn test_finalize_success_keeps_annotation() {
        let mut session = CaptureSession::new();
        let model = Model::new(false);
        session.annotate("explain");
        session.capture_once(&Camera::working()).await.unwrap();

        let answer = session
            .finalize(&RequestGate::new(), &model, &Quiet)
            .await
            .unwrap();

        assert_eq!(answer, "answer");
        assert_eq!(session.stage(), Stage::Answered);
        assert_eq!(session.annotation(), "explain");
        assert_eq!(session.images().len(), 1);
    }

    #[tokio::test]
    async fn test_finalize_failure_keeps_everything() {
        let mut session = CaptureSession::new();
        session.annotate("why");
        session.capture_once(&Camera::working()).await.unwrap();

        let result = session
            .finalize(&RequestGate::new(), &Model::new(true), &Quiet)
            .await;

        assert!(result.is_err());
        assert_eq!(session.stage(), Stage::Collecting);
        assert_eq!(session.images().len(), 1);
        assert_eq!(session.annotation(), "why");
    }

    #[tokio::test]
    async fn test_finalize_with_no_images_reaches_provider() {
        let mut session = CaptureSession::new();
        let model = Model::new(false);
        session.enter_multi_page();

        session
            .finalize(&RequestGate::new(), &model, &Quiet)
            .await
            .unwrap();

        assert_eq!(model.seen.borrow().len(), 1);
        assert!(model.seen.borrow()[0].0.is_empty());
    }

    #[tokio::test]
    async fn test_reset_clears_everything() {
        let mut session = CaptureSession::new();
        session.enter_multi_page();
        session.annotate("note");
        session.capture_additional(&Camera::working()).await.unwrap();

        session.reset();

        assert_eq!(session.stage(), Stage::Idle);
        assert!(session.images().is_empty());
        assert_eq!(session.annotation(), "");
        assert!(!session.is_multi_page());
    }
}
