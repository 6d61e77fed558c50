use std::cell::Cell;

use log::{info, warn};

use super::types::{InferenceProvider, PresentationSink, Screenshot, SessionError, SessionEvent};

/// Brackets every inference call with `Started`/`Finished` events and
/// tracks whether a call is outstanding.
#[derive(Debug, Default)]
pub struct RequestGate {
    in_flight: Cell<bool>,
}

impl RequestGate {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.get()
    }

    /// Dispatch one inference call.
    ///
    /// `Finished` is emitted exactly once for every `Started`, including when
    /// the provider fails or the returned future is dropped before completion.
    /// A dispatch while another call is outstanding is rejected with
    /// [`SessionError::Busy`] and emits nothing.
    pub async fn run(
        &self,
        images: &[Screenshot],
        annotation: &str,
        provider: &dyn InferenceProvider,
        sink: &dyn PresentationSink,
    ) -> Result<String, SessionError> {
        if self.in_flight.get() {
            warn!("Rejecting inference dispatch: a request is already in flight");
            return Err(SessionError::Busy);
        }

        let _guard = InFlight::begin(&self.in_flight, sink);
        info!("Processing screenshots (count={})", images.len());
        provider.infer(images, annotation).await
    }
}

struct InFlight<'a> {
    flag: &'a Cell<bool>,
    sink: &'a dyn PresentationSink,
}

impl<'a> InFlight<'a> {
    fn begin(flag: &'a Cell<bool>, sink: &'a dyn PresentationSink) -> Self {
        flag.set(true);
        sink.present(SessionEvent::Started);
        Self { flag, sink }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
        self.sink.present(SessionEvent::Finished);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::cell::RefCell;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        events: RefCell<Vec<SessionEvent>>,
    }

    impl PresentationSink for Recorder {
        fn present(&self, event: SessionEvent) {
            self.events.borrow_mut().push(event);
        }
    }

    struct Answer(Result<String, SessionError>);

    #[async_trait(?Send)]
    impl InferenceProvider for Answer {
        async fn infer(&self, _: &[Screenshot], _: &str) -> Result<String, SessionError> {
            tokio::task::yield_now().await;
            self.0.clone()
        }
    }

    struct Never;

    #[async_trait(?Send)]
    impl InferenceProvider for Never {
        async fn infer(&self, _: &[Screenshot], _: &str) -> Result<String, SessionError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_signals_pair_on_success() {
        let gate = RequestGate::new();
        let sink = Recorder::default();

        let result = gate.run(&[], "", &Answer(Ok("42".into())), &sink).await;

        assert_eq!(result, Ok("42".to_string()));
        assert_eq!(
            *sink.events.borrow(),
            vec![SessionEvent::Started, SessionEvent::Finished]
        );
        assert!(!gate.is_in_flight());
    }

    #[tokio::test]
    async fn test_signals_pair_on_failure() {
        let gate = RequestGate::new();
        let sink = Recorder::default();
        let provider = Answer(Err(SessionError::InferenceFailed("boom".into())));

        let result = gate.run(&[], "", &provider, &sink).await;

        assert_eq!(result, Err(SessionError::InferenceFailed("boom".into())));
        assert_eq!(
            *sink.events.borrow(),
            vec![SessionEvent::Started, SessionEvent::Finished]
        );
        assert!(!gate.is_in_flight());
    }

    #[tokio::test]
    async fn test_overlapping_dispatch_is_rejected() {
        let gate = RequestGate::new();
        let sink = Recorder::default();
        let provider = Answer(Ok("first".into()));

        let (first, second) = tokio::join!(
            gate.run(&[], "", &provider, &sink),
            gate.run(&[], "", &provider, &sink),
        );

        assert_eq!(first, Ok("first".to_string()));
        assert_eq!(second, Err(SessionError::Busy));
        assert_eq!(
            *sink.events.borrow(),
            vec![SessionEvent::Started, SessionEvent::Finished]
        );
    }

    #[tokio::test]
    async fn test_finished_emitted_when_call_is_dropped() {
        let gate = RequestGate::new();
        let sink = Recorder::default();

        let outcome =
            tokio::time::timeout(Duration::from_millis(10), gate.run(&[], "", &Never, &sink)).await;

        assert!(outcome.is_err());
        assert_eq!(
            *sink.events.borrow(),
            vec![SessionEvent::Started, SessionEvent::Finished]
        );
        assert!(!gate.is_in_flight());
    }
}
