//! The streaming transport seam.
//!
//! The core never talks to a provider's network API itself. Dispatch
//! goes through [`Transport`], an injected collaborator that accepts a
//! provider-agnostic [`DispatchRequest`] and returns a raw
//! [`TransportStream`] of [`TransportEvent`]s. The orchestrator wraps
//! that raw stream into the normalized
//! [`StreamHandle`](crate::stream::StreamHandle).
//!
//! # Two traits
//!
//! [`Transport`] uses native async-fn-in-traits and is not object-safe.
//! [`DynTransport`] is its boxed-future mirror; a blanket
//! `impl<T: Transport> DynTransport for T` bridges the two, so any
//! concrete transport can be stored as `Arc<dyn DynTransport>` with no
//! boilerplate. This is what lets tests substitute a
//! [`MockTransport`](crate::mock::MockTransport) without changing call
//! sites.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::adapter::ModelRef;
use crate::chat::Message;
use crate::stream::{FinishReason, ToolCallRecord, Usage};
use crate::tool::ToolDescriptor;

/// A pinned, boxed, `Send` stream of raw transport events.
pub type TransportStream = Pin<Box<dyn Stream<Item = Result<TransportEvent, TransportError>> + Send>>;

/// A failure reported by the transport, before or during streaming.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The provider's API rejected or aborted the call.
    #[error("API error (status={status:?}): {message}")]
    Api {
        /// HTTP status code, if one was received.
        status: Option<http::StatusCode>,
        /// Human-readable description from the provider.
        message: String,
        /// Raw response body, when the provider sent one.
        body: Option<String>,
    },

    /// Any other failure (connection reset, codec error, ...).
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// An incremental event emitted by the transport during streaming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum TransportEvent {
    /// A fragment of free-text output.
    TextDelta(String),
    /// A partial structured-object value.
    ObjectDelta(Value),
    /// A completed tool call.
    ToolCall(ToolCallRecord),
    /// Token usage for the request so far.
    Usage(Usage),
    /// Provider-specific response metadata.
    Metadata(Value),
    /// The stream has ended.
    Done {
        /// Why generation stopped.
        finish_reason: FinishReason,
        /// The raw response envelope, for diagnostics.
        raw: Value,
    },
}

/// How the transport should shape the model's output.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseFormat {
    /// Free text.
    Text,
    /// Generation constrained to the given JSON Schema.
    Object {
        /// The schema the output must conform to.
        schema: Value,
    },
}

/// The provider-agnostic request handed to the transport.
///
/// Built by the orchestrator from the rule-transformed messages, the
/// resolved model reference, and the validated tool set. The
/// `provider_options` bag has the `"schema"` key stripped; structured
/// output travels in [`response_format`](Self::response_format).
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    /// The resolved target model.
    pub model: ModelRef,
    /// Rule-transformed conversation.
    pub messages: Vec<Message>,
    /// Optional bare prompt, for providers that accept one alongside
    /// (or instead of) the message list.
    pub prompt: Option<String>,
    /// Validated, invocable tool descriptors.
    pub tools: Vec<ToolDescriptor>,
    /// Sampling temperature, already clamped by the rule engine.
    pub temperature: Option<f32>,
    /// Upper bound on generated tokens.
    pub max_tokens: Option<u32>,
    /// Provider-specific options, schema key excluded.
    pub provider_options: HashMap<String, Value>,
    /// Free text or schema-constrained output.
    pub response_format: ResponseFormat,
    /// Abort signal; once triggered, no further events are consumed.
    pub cancel: CancellationToken,
}

/// The streaming transport every backend implements.
///
/// `dispatch` performs whatever I/O the backend needs and resolves to a
/// raw event stream. Construction-time validation belongs in the
/// adapter factories, not here.
pub trait Transport: Send + Sync {
    /// Starts a streaming call and resolves to the raw event stream.
    fn dispatch(
        &self,
        request: DispatchRequest,
    ) -> impl Future<Output = Result<TransportStream, TransportError>> + Send;
}

/// Object-safe counterpart of [`Transport`] for dynamic dispatch.
///
/// You rarely implement this directly; the blanket
/// `impl<T: Transport> DynTransport for T` does it for you.
pub trait DynTransport: Send + Sync {
    /// Boxed-future version of [`Transport::dispatch`].
    fn dispatch_boxed(
        &self,
        request: DispatchRequest,
    ) -> Pin<Box<dyn Future<Output = Result<TransportStream, TransportError>> + Send + '_>>;
}

impl<T: Transport> DynTransport for T {
    fn dispatch_boxed(
        &self,
        request: DispatchRequest,
    ) -> Pin<Box<dyn Future<Output = Result<TransportStream, TransportError>> + Send + '_>> {
        Box::pin(self.dispatch(request))
    }
}
