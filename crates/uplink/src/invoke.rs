//! The invocation orchestrator.
//!
//! [`Invoker::invoke`] is the single entry point that turns a caller's
//! [`InvokeRequest`] into a live [`StreamHandle`]. One call walks the
//! whole pipeline:
//!
//! 1. resolve the transport (per-request override or the invoker's own)
//! 2. run the rule engine; violations abort before any dispatch
//! 3. resolve and build the provider adapter from the registry
//! 4. validate and lower the tool set
//! 5. decide the result type from schema and output mode
//! 6. emit request diagnostics when asked
//! 7. assemble the wire-level [`DispatchRequest`]
//! 8. dispatch and translate transport failures
//! 9. wrap the provider stream into a normalized [`StreamHandle`]
//!
//! Any panic escaping the pipeline is caught at the top and translated
//! into an unknown-kind run error, so callers always get a typed
//! [`InvokeError`] rather than an unwind.

use std::sync::Arc;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::adapter::AdapterRegistry;
use crate::chat::Message;
use crate::diag;
use crate::error::{self, InvokeError};
use crate::request::{Credential, InvocationConfig, ResultType};
use crate::rules::RuleEngine;
use crate::stream::{self, StreamHandle};
use crate::tool;
use crate::transport::{DispatchRequest, DynTransport, ResponseFormat};

/// One invocation: the credential, the config, and the conversation.
pub struct InvokeRequest {
    /// Provider credential; its kind selects the adapter.
    pub credential: Credential,
    /// Model, sampling, tool, and output settings.
    pub config: InvocationConfig,
    /// The conversation to send.
    pub messages: Vec<Message>,
    /// Optional bare prompt passed through to the transport.
    pub prompt: Option<String>,
    /// Caller-supplied abort signal. `None` gets a fresh token.
    pub cancel: Option<CancellationToken>,
    /// Per-request transport override, for routing or testing.
    pub transport: Option<Arc<dyn DynTransport>>,
    /// Emit request/response diagnostics for this call.
    pub diagnostics: bool,
}

impl InvokeRequest {
    /// A request with no prompt, no cancel token, no overrides.
    pub fn new(credential: Credential, config: InvocationConfig, messages: Vec<Message>) -> Self {
        Self {
            credential,
            config,
            messages,
            prompt: None,
            cancel: None,
            transport: None,
            diagnostics: false,
        }
    }
}

impl std::fmt::Debug for InvokeRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvokeRequest")
            .field("credential", &self.credential)
            .field("config", &self.config)
            .field("messages", &self.messages.len())
            .field("prompt", &self.prompt.is_some())
            .field("diagnostics", &self.diagnostics)
            .finish()
    }
}

/// A successfully started invocation.
#[derive(Debug)]
pub struct InvokeOutcome {
    /// Whether the stream carries text or schema-shaped objects.
    pub result_type: ResultType,
    /// The provider that served the request, e.g. `"openai"`.
    pub provider_name: String,
    /// The live normalized stream.
    pub stream: StreamHandle,
}

/// The orchestrator: owns a transport, a registry, and the rule set.
pub struct Invoker {
    transport: Arc<dyn DynTransport>,
    registry: Arc<AdapterRegistry>,
    rules: RuleEngine,
}

impl std::fmt::Debug for Invoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invoker")
            .field("registry", &self.registry)
            .field("rules", &self.rules)
            .finish()
    }
}

impl Invoker {
    /// An invoker over the given transport and the global registry.
    pub fn new(transport: Arc<dyn DynTransport>) -> Self {
        Self::with_registry(transport, AdapterRegistry::global())
    }

    /// An invoker over an explicit registry, for isolated setups.
    pub fn with_registry(transport: Arc<dyn DynTransport>, registry: Arc<AdapterRegistry>) -> Self {
        Self {
            transport,
            registry,
            rules: RuleEngine::standard(),
        }
    }

    /// Runs one invocation end to end and returns the live stream.
    ///
    /// Every failure mode, panics included, comes back as a typed
    /// [`InvokeError`]. Rule violations, adapter failures, and tool
    /// rejections all abort before anything reaches the wire.
    pub async fn invoke(&self, request: InvokeRequest) -> Result<InvokeOutcome, InvokeError> {
        match std::panic::AssertUnwindSafe(self.invoke_inner(request))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(payload) => Err(error::translate_panic(payload)),
        }
    }

    async fn invoke_inner(&self, request: InvokeRequest) -> Result<InvokeOutcome, InvokeError> {
        let InvokeRequest {
            credential,
            config,
            messages,
            prompt,
            cancel,
            transport,
            diagnostics,
        } = request;

        let transport = transport.unwrap_or_else(|| Arc::clone(&self.transport));
        let cancel = cancel.unwrap_or_default();

        let pass = self.rules.validate(credential.kind, &messages, &config);
        if !pass.violations.is_empty() {
            let joined = pass
                .violations
                .iter()
                .map(|v| format!("- {}", v.message))
                .collect::<Vec<_>>()
                .join("\n");
            return Err(InvokeError::Run(joined));
        }
        let messages = pass.messages;
        let mut config = pass.config;

        let adapter = self.registry.build(&credential, &config)?;
        let model = adapter.model().clone();

        let tools = match &config.tools {
            Some(map) => tool::build_tools(map)?,
            None => Vec::new(),
        };

        let result_type = ResultType::decide(config.output_schema.as_ref(), config.output_mode);

        if diagnostics {
            diag::log_request(&messages, &config);
        }

        // Structured output travels in response_format, never in the
        // provider option bag.
        config.provider_options.remove("schema");
        let response_format = match (&result_type, &config.output_schema) {
            (ResultType::Object, Some(schema)) => ResponseFormat::Object {
                schema: schema.as_value().clone(),
            },
            _ => ResponseFormat::Text,
        };

        let dispatch = DispatchRequest {
            model,
            messages,
            prompt,
            tools,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            provider_options: config.provider_options,
            response_format,
            cancel: cancel.clone(),
        };

        let stream = transport
            .dispatch_boxed(dispatch)
            .await
            .map_err(error::translate)?;

        let tap = diagnostics.then(diag::spawn_observer);
        let stream = stream::wrap_stream(stream, cancel, tap);

        Ok(InvokeOutcome {
            result_type,
            provider_name: adapter.provider_name().to_string(),
            stream,
        })
    }
}
