//! A scripted in-memory transport for tests.
//!
//! [`MockTransport`] replays queued scripts in dispatch order and
//! records every [`DispatchRequest`] it receives, so tests can assert
//! both what was sent and how the stream behaved. Available under
//! `cfg(test)` and behind the `test-utils` feature.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::transport::{
    DispatchRequest, Transport, TransportError, TransportEvent, TransportStream,
};

/// A cloneable stand-in for [`TransportError`], which holds boxed
/// sources and cannot be cloned itself.
#[derive(Debug, Clone)]
pub enum MockTransportError {
    /// Mirrors [`TransportError::Api`].
    Api {
        /// HTTP status, when the failure maps to one.
        status: Option<http::StatusCode>,
        /// Provider error message.
        message: String,
        /// Raw response body, when one was received.
        body: Option<String>,
    },
    /// Mirrors [`TransportError::Other`] with a plain message.
    Other(String),
}

impl From<MockTransportError> for TransportError {
    fn from(err: MockTransportError) -> Self {
        match err {
            MockTransportError::Api {
                status,
                message,
                body,
            } => TransportError::Api {
                status,
                message,
                body,
            },
            MockTransportError::Other(message) => {
                TransportError::Other(Box::new(std::io::Error::other(message)))
            }
        }
    }
}

enum Script {
    /// Yield these events, then end the stream.
    Events(Vec<TransportEvent>),
    /// Fail the dispatch itself.
    Error(MockTransportError),
    /// Open a stream that never yields. For cancellation tests.
    Stalled,
}

/// A transport that replays scripted responses.
#[derive(Default)]
pub struct MockTransport {
    scripts: Mutex<VecDeque<Script>>,
    dispatches: Arc<Mutex<Vec<DispatchRequest>>>,
}

impl MockTransport {
    /// An empty mock with no scripts queued.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a stream that yields `events` and ends.
    pub fn script_events(&self, events: Vec<TransportEvent>) {
        self.scripts
            .lock()
            .expect("mock script queue poisoned")
            .push_back(Script::Events(events));
    }

    /// Queues a dispatch that fails with `error`.
    pub fn script_error(&self, error: MockTransportError) {
        self.scripts
            .lock()
            .expect("mock script queue poisoned")
            .push_back(Script::Error(error));
    }

    /// Queues a stream that never yields.
    pub fn script_stalled(&self) {
        self.scripts
            .lock()
            .expect("mock script queue poisoned")
            .push_back(Script::Stalled);
    }

    /// Every request dispatched so far, in order.
    pub fn recorded_dispatches(&self) -> Vec<DispatchRequest> {
        self.dispatches
            .lock()
            .expect("mock dispatch log poisoned")
            .clone()
    }
}

impl Transport for MockTransport {
    async fn dispatch(&self, request: DispatchRequest) -> Result<TransportStream, TransportError> {
        self.dispatches
            .lock()
            .expect("mock dispatch log poisoned")
            .push(request);

        let script = self
            .scripts
            .lock()
            .expect("mock script queue poisoned")
            .pop_front()
            .expect("MockTransport: no scripted dispatches remaining");

        match script {
            Script::Events(events) => {
                let stream = futures::stream::iter(events.into_iter().map(Ok));
                Ok(Box::pin(stream))
            }
            Script::Error(error) => Err(error.into()),
            Script::Stalled => Ok(Box::pin(futures::stream::pending())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::ModelRef;
    use crate::request::ProviderKind;
    use crate::transport::ResponseFormat;
    use futures::StreamExt;
    use tokio_util::sync::CancellationToken;

    fn request(model_id: &str) -> DispatchRequest {
        DispatchRequest {
            model: ModelRef::new(ProviderKind::OpenAi, model_id),
            messages: Vec::new(),
            prompt: None,
            tools: Vec::new(),
            temperature: None,
            max_tokens: None,
            provider_options: Default::default(),
            response_format: ResponseFormat::Text,
            cancel: CancellationToken::new(),
        }
    }

    #[tokio::test]
    async fn test_replays_scripts_in_order() {
        let mock = MockTransport::new();
        mock.script_events(vec![TransportEvent::TextDelta("first".into())]);
        mock.script_events(vec![TransportEvent::TextDelta("second".into())]);

        let mut stream = mock.dispatch(request("a")).await.unwrap();
        match stream.next().await.unwrap().unwrap() {
            TransportEvent::TextDelta(text) => assert_eq!(text, "first"),
            other => panic!("unexpected event: {other:?}"),
        }

        let mut stream = mock.dispatch(request("b")).await.unwrap();
        match stream.next().await.unwrap().unwrap() {
            TransportEvent::TextDelta(text) => assert_eq!(text, "second"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_records_dispatches() {
        let mock = MockTransport::new();
        mock.script_events(vec![]);
        mock.dispatch(request("gpt-4o-mini")).await.unwrap();

        let recorded = mock.recorded_dispatches();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].model.model_id, "gpt-4o-mini");
    }

    #[tokio::test]
    async fn test_scripted_error_fails_dispatch() {
        let mock = MockTransport::new();
        mock.script_error(MockTransportError::Api {
            status: Some(http::StatusCode::TOO_MANY_REQUESTS),
            message: "rate limited".into(),
            body: Some("{\"error\":\"slow down\"}".into()),
        });

        let err = mock.dispatch(request("a")).await.map(|_| ()).unwrap_err();
        match err {
            TransportError::Api { message, body, .. } => {
                assert_eq!(message, "rate limited");
                assert_eq!(body.as_deref(), Some("{\"error\":\"slow down\"}"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    #[should_panic(expected = "no scripted dispatches remaining")]
    async fn test_panics_when_queue_is_empty() {
        let mock = MockTransport::new();
        let _ = mock.dispatch(request("a")).await;
    }
}
