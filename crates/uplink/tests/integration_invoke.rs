//! End-to-end orchestrator tests over the scripted mock transport.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::json;
use tokio_util::sync::CancellationToken;

use futures::StreamExt;
use uplink::mock::{MockTransport, MockTransportError};
use uplink::test_helpers::{collect_chunks, sample_config, sample_credential, sample_messages, text_script};
use uplink::{
    AdapterRegistry, Credential, ErrorCode, FinishReason, InvocationConfig, InvokeError,
    InvokeRequest, Invoker, JsonSchema, Message, OutputMode, ProviderKind, ResponseFormat,
    ResultType, StreamChunk, ToolCallRecord, ToolSchema, TransportEvent, Usage,
};

fn registry() -> Arc<AdapterRegistry> {
    let registry = Arc::new(AdapterRegistry::new());
    registry.register(uplink_openai::OpenAiFactory);
    registry.register(uplink_anthropic::AnthropicFactory);
    registry.register(uplink_vertex::VertexFactory);
    registry
}

fn invoker() -> (Arc<MockTransport>, Invoker) {
    let mock = Arc::new(MockTransport::new());
    let invoker = Invoker::with_registry(mock.clone(), registry());
    (mock, invoker)
}

#[tokio::test]
async fn test_text_invocation_end_to_end() {
    let (mock, invoker) = invoker();
    mock.script_events(text_script(&["Hel", "lo wor", "ld!"]));

    let outcome = invoker
        .invoke(InvokeRequest::new(sample_credential(), sample_config(), sample_messages()))
        .await
        .unwrap();

    assert_eq!(outcome.result_type, ResultType::Text);
    assert_eq!(outcome.provider_name, "openai");

    let stream = outcome.stream;
    let chunks = collect_chunks(stream.chunks).await;
    assert_eq!(
        chunks,
        vec![
            StreamChunk::Text("Hello ".into()),
            StreamChunk::Text("world!".into()),
        ]
    );
    assert_eq!(stream.final_text.wait().await.unwrap(), "Hello world!");
    assert_eq!(
        stream.usage.wait().await.unwrap(),
        Usage { input_tokens: 12, output_tokens: 7 }
    );
    assert_eq!(stream.finish_reason.wait().await.unwrap(), FinishReason::Stop);
    assert_eq!(
        stream.provider_metadata.wait().await.unwrap(),
        json!({"model": "gpt-4o-mini"})
    );
    assert_eq!(stream.raw_response.wait().await.unwrap(), json!({"id": "resp_123"}));

    let recorded = mock.recorded_dispatches();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].model.model_id, "gpt-4o-mini");
    assert_eq!(
        recorded[0].model.headers.get("authorization").map(String::as_str),
        Some("Bearer sk-test-token")
    );
}

#[tokio::test]
async fn test_rule_violations_abort_before_dispatch() {
    let (mock, invoker) = invoker();

    let messages = vec![
        Message::tool_result("tc_1", "orphaned"),
        Message::user("hi"),
    ];
    let config = InvocationConfig {
        temperature: Some(f32::NAN),
        ..sample_config()
    };

    let err = invoker
        .invoke(InvokeRequest::new(sample_credential(), config, messages))
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::Run);
    assert_eq!(
        err.message(),
        "- temperature must be a finite number\n\
         - tool result at position 0 must directly follow the assistant message that invoked it"
    );
    assert!(mock.recorded_dispatches().is_empty());
}

#[tokio::test]
async fn test_invalid_tool_schema_aborts_before_dispatch() {
    let (mock, invoker) = invoker();

    let mut tools = BTreeMap::new();
    tools.insert("bad name".to_string(), ToolSchema::new("spaced", json!({"type": "object"})));
    let config = InvocationConfig {
        tools: Some(tools),
        ..sample_config()
    };

    let err = invoker
        .invoke(InvokeRequest::new(sample_credential(), config, sample_messages()))
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::Config);
    assert!(mock.recorded_dispatches().is_empty());
}

#[tokio::test]
async fn test_schema_with_object_mode_dispatches_object_format() {
    let (mock, invoker) = invoker();
    mock.script_events(vec![
        TransportEvent::ObjectDelta(json!({"answer": 42})),
        TransportEvent::Done { finish_reason: FinishReason::Stop, raw: json!({}) },
    ]);

    let schema = json!({"type": "object", "properties": {"answer": {"type": "integer"}}});
    let mut config = InvocationConfig {
        output_schema: Some(JsonSchema::new(schema.clone())),
        output_mode: OutputMode::Object,
        ..sample_config()
    };
    // A stray schema in the option bag must not reach the wire.
    config.provider_options.insert("schema".into(), json!({"stale": true}));

    let outcome = invoker
        .invoke(InvokeRequest::new(sample_credential(), config, sample_messages()))
        .await
        .unwrap();
    assert_eq!(outcome.result_type, ResultType::Object);

    let chunks = collect_chunks(outcome.stream.chunks).await;
    assert_eq!(chunks, vec![StreamChunk::Object(json!({"answer": 42}))]);

    let recorded = mock.recorded_dispatches();
    assert_eq!(recorded[0].response_format, ResponseFormat::Object { schema });
    assert!(!recorded[0].provider_options.contains_key("schema"));
}

#[tokio::test]
async fn test_schema_without_object_mode_stays_text() {
    let (mock, invoker) = invoker();
    mock.script_events(text_script(&["ok"]));

    let config = InvocationConfig {
        output_schema: Some(JsonSchema::new(json!({"type": "object"}))),
        output_mode: OutputMode::Unset,
        ..sample_config()
    };

    let outcome = invoker
        .invoke(InvokeRequest::new(sample_credential(), config, sample_messages()))
        .await
        .unwrap();
    assert_eq!(outcome.result_type, ResultType::Text);
    assert_eq!(mock.recorded_dispatches()[0].response_format, ResponseFormat::Text);
}

#[tokio::test]
async fn test_cancellation_settles_every_accessor() {
    let (mock, invoker) = invoker();
    mock.script_stalled();

    let cancel = CancellationToken::new();
    let mut request = InvokeRequest::new(sample_credential(), sample_config(), sample_messages());
    request.cancel = Some(cancel.clone());

    let outcome = invoker.invoke(request).await.unwrap();
    let mut stream = outcome.stream;

    cancel.cancel();

    assert!(stream.chunks.next().await.is_none());
    assert_eq!(stream.finish_reason.wait().await.unwrap(), FinishReason::Cancelled);
    assert_eq!(stream.final_text.wait().await.unwrap(), "");
    assert_eq!(stream.usage.wait().await.unwrap(), Usage::default());
    assert_eq!(stream.tool_calls.wait().await.unwrap(), vec![]);
}

#[tokio::test]
async fn test_api_error_with_body_translates_exactly() {
    let (mock, invoker) = invoker();
    mock.script_error(MockTransportError::Api {
        status: Some(http::StatusCode::TOO_MANY_REQUESTS),
        message: "rate limited".into(),
        body: Some("{\"error\":\"slow down\"}".into()),
    });

    let err = invoker
        .invoke(InvokeRequest::new(sample_credential(), sample_config(), sample_messages()))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        InvokeError::Run("Error: rate limited and response body: {\"error\":\"slow down\"}".into())
    );
}

#[tokio::test]
async fn test_opaque_error_translates_to_unknown_format() {
    let (mock, invoker) = invoker();
    mock.script_error(MockTransportError::Other("connection reset".into()));

    let err = invoker
        .invoke(InvokeRequest::new(sample_credential(), sample_config(), sample_messages()))
        .await
        .unwrap_err();

    assert_eq!(err, InvokeError::Run("Unknown error: connection reset".into()));
}

#[tokio::test]
async fn test_vertex_missing_region_is_config_error_without_dispatch() {
    let (mock, invoker) = invoker();

    let credential = Credential::new(ProviderKind::Vertex, "ya29.token");
    let mut config = InvocationConfig {
        model: "gemini-2.0-flash".into(),
        ..Default::default()
    };
    config
        .provider_options
        .insert("vertex.project".into(), json!("demo-project"));

    let err = invoker
        .invoke(InvokeRequest::new(credential, config, sample_messages()))
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::Config);
    assert!(err.message().contains("vertex.region"));
    assert!(mock.recorded_dispatches().is_empty());
}

#[tokio::test]
async fn test_anthropic_invocation_applies_rules_before_dispatch() {
    let (mock, invoker) = invoker();
    mock.script_events(text_script(&["done"]));

    let credential = Credential::new(ProviderKind::Anthropic, "sk-ant-test");
    let config = InvocationConfig {
        model: "claude-sonnet-4-20250514".into(),
        temperature: Some(1.8),
        ..Default::default()
    };
    let messages = vec![Message::user("hi"), Message::system("late system")];

    let outcome = invoker
        .invoke(InvokeRequest::new(credential, config, messages))
        .await
        .unwrap();
    assert_eq!(outcome.provider_name, "anthropic");

    let recorded = mock.recorded_dispatches();
    assert_eq!(recorded[0].temperature, Some(1.0));
    assert_eq!(recorded[0].messages[0].role, uplink::Role::System);
    assert_eq!(
        recorded[0].model.headers.get("anthropic-version").map(String::as_str),
        Some("2023-06-01")
    );
}

#[tokio::test]
async fn test_tool_call_loop_round_trip() {
    let (mock, invoker) = invoker();

    let call = ToolCallRecord {
        id: "tc_1".into(),
        name: "web_search".into(),
        arguments: json!({"query": "rust streams"}),
    };
    mock.script_events(vec![
        TransportEvent::ToolCall(call.clone()),
        TransportEvent::Done { finish_reason: FinishReason::ToolCalls, raw: json!({}) },
    ]);
    mock.script_events(text_script(&["Found it."]));

    let mut tools = BTreeMap::new();
    tools.insert(
        "web_search".to_string(),
        ToolSchema::new(
            "Search the web",
            json!({"type": "object", "properties": {"query": {"type": "string"}}}),
        ),
    );
    let config = InvocationConfig {
        tools: Some(tools),
        ..sample_config()
    };

    let mut messages = sample_messages();
    let outcome = invoker
        .invoke(InvokeRequest::new(sample_credential(), config.clone(), messages.clone()))
        .await
        .unwrap();
    assert_eq!(
        outcome.stream.finish_reason.wait().await.unwrap(),
        FinishReason::ToolCalls
    );
    assert_eq!(outcome.stream.tool_calls.wait().await.unwrap(), vec![call]);

    // Feed the tool result back and finish the turn.
    messages.push(Message::assistant("Searching."));
    messages.push(Message::tool_result("tc_1", "rust streams are lazy"));
    let outcome = invoker
        .invoke(InvokeRequest::new(sample_credential(), config, messages))
        .await
        .unwrap();
    assert_eq!(outcome.stream.final_text.wait().await.unwrap(), "Found it.");

    let recorded = mock.recorded_dispatches();
    assert_eq!(recorded.len(), 2);
    assert_eq!(recorded[1].tools.len(), 1);
    assert_eq!(recorded[1].tools[0].name, "web_search");
}

#[tokio::test]
async fn test_per_request_transport_override() {
    let (default_mock, invoker) = invoker();
    let override_mock = Arc::new(MockTransport::new());
    override_mock.script_events(text_script(&["routed"]));

    let mut request = InvokeRequest::new(sample_credential(), sample_config(), sample_messages());
    request.transport = Some(override_mock.clone());

    let outcome = invoker.invoke(request).await.unwrap();
    assert_eq!(outcome.stream.final_text.wait().await.unwrap(), "routed");
    assert!(default_mock.recorded_dispatches().is_empty());
    assert_eq!(override_mock.recorded_dispatches().len(), 1);
}

#[tokio::test]
async fn test_mid_stream_error_surfaces_on_chunks_and_accessors() {
    let (mock, invoker) = invoker();

    let failing = {
        let events: Vec<Result<TransportEvent, uplink::TransportError>> = vec![
            Ok(TransportEvent::TextDelta("partial ".into())),
            Err(uplink::TransportError::Api {
                status: None,
                message: "stream broke".into(),
                body: Some("half a payload".into()),
            }),
        ];
        events
    };
    // Script through a bespoke transport since the mock queues whole
    // event lists; a raw stream carries the mid-flight error.
    struct Failing(std::sync::Mutex<Option<Vec<Result<TransportEvent, uplink::TransportError>>>>);
    impl uplink::Transport for Failing {
        async fn dispatch(
            &self,
            _request: uplink::DispatchRequest,
        ) -> Result<uplink::TransportStream, uplink::TransportError> {
            let events = self.0.lock().unwrap().take().unwrap();
            Ok(Box::pin(futures::stream::iter(events)))
        }
    }

    let mut request = InvokeRequest::new(sample_credential(), sample_config(), sample_messages());
    request.transport = Some(Arc::new(Failing(std::sync::Mutex::new(Some(failing)))));

    let outcome = invoker.invoke(request).await.unwrap();
    let mut stream = outcome.stream;

    let first = stream.chunks.next().await.unwrap().unwrap();
    assert_eq!(first, StreamChunk::Text("partial ".into()));

    let err = stream.chunks.next().await.unwrap().unwrap_err();
    assert_eq!(
        err,
        InvokeError::Run("Error: stream broke and response body: half a payload".into())
    );
    assert!(stream.chunks.next().await.is_none());
    assert_eq!(stream.final_text.wait().await.unwrap_err(), err);
    assert_eq!(stream.finish_reason.wait().await.unwrap_err(), err);
    assert!(mock.recorded_dispatches().is_empty());
}

/// Collects formatted log output for assertions.
#[derive(Clone, Default)]
struct LogCapture(Arc<std::sync::Mutex<Vec<u8>>>);

impl LogCapture {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[tokio::test]
async fn test_diagnostics_emit_request_snapshot() {
    let capture = LogCapture::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(capture.clone())
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let (mock, invoker) = invoker();
    mock.script_events(text_script(&["quiet"]));

    let mut request = InvokeRequest::new(sample_credential(), sample_config(), sample_messages());
    request.diagnostics = true;

    let outcome = invoker.invoke(request).await.unwrap();
    // The channel observes; it never alters results.
    assert_eq!(outcome.stream.final_text.wait().await.unwrap(), "quiet");

    let logged = capture.contents();
    assert!(logged.contains("dispatching request"));
    assert!(logged.contains("gpt-4o-mini"));
    assert!(!logged.contains("sk-test-token"));
}

#[tokio::test]
async fn test_diagnostics_off_by_default_logs_nothing() {
    let capture = LogCapture::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(capture.clone())
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let (mock, invoker) = invoker();
    mock.script_events(text_script(&["quiet"]));

    let outcome = invoker
        .invoke(InvokeRequest::new(sample_credential(), sample_config(), sample_messages()))
        .await
        .unwrap();
    assert_eq!(outcome.stream.final_text.wait().await.unwrap(), "quiet");

    assert!(!capture.contents().contains("dispatching request"));
}
