//! A unified invocation layer over streaming LLM providers.
//!
//! `uplink` gives callers one entry point, [`Invoker::invoke`], that
//! validates a request against provider-aware rules, resolves the
//! right provider adapter, lowers tool declarations to the wire shape,
//! dispatches over a pluggable [`Transport`], and hands back a
//! normalized [`StreamHandle`] with deferred accessors for the final
//! text, usage, tool calls, and finish reason.
//!
//! | Module | What lives there |
//! |---|---|
//! | [`chat`] | Roles, content parts, messages |
//! | [`request`] | Credentials, configs, output modes, JSON schemas |
//! | [`rules`] | The pre-dispatch validation and rewrite engine |
//! | [`tool`] | Tool declarations and the descriptor builder |
//! | [`adapter`] | Provider factories, model refs, the registry |
//! | [`transport`] | The streaming backend trait and wire request |
//! | [`stream`] | The normalized stream handle and its accessors |
//! | [`error`] | The typed error taxonomy and translators |
//! | [`invoke`] | The orchestrator tying it all together |
//!
//! # Quick start
//!
//! ```ignore
//! use std::sync::Arc;
//! use uplink::{Credential, InvocationConfig, Invoker, InvokeRequest, Message, ProviderKind};
//!
//! uplink_openai::register_global();
//!
//! let invoker = Invoker::new(transport);
//! let outcome = invoker
//!     .invoke(InvokeRequest::new(
//!         Credential::new(ProviderKind::OpenAi, api_key),
//!         InvocationConfig { model: "gpt-4o-mini".into(), ..Default::default() },
//!         vec![Message::user("Why is the sky blue?")],
//!     ))
//!     .await?;
//!
//! let text = outcome.stream.final_text.wait().await?;
//! ```
//!
//! Cancellation is cooperative: pass a
//! [`CancellationToken`](tokio_util::sync::CancellationToken) in
//! [`InvokeRequest::cancel`] and trigger it at any time. The stream
//! stops promptly and every deferred accessor still settles.

#![warn(missing_docs)]

pub mod adapter;
pub mod chat;
mod diag;
pub mod error;
pub mod invoke;
pub mod request;
pub mod rules;
pub mod stream;
pub mod tool;
pub mod transport;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_helpers;

pub use adapter::{AdapterFactory, AdapterHandle, AdapterRegistry, ModelRef};
pub use chat::{ContentPart, ImageSource, Message, Role};
pub use error::{ErrorCode, InvokeError};
pub use invoke::{InvokeOutcome, InvokeRequest, Invoker};
pub use request::{Credential, InvocationConfig, JsonSchema, OutputMode, ProviderKind, ResultType};
pub use stream::{ChunkStream, Deferred, FinishReason, StreamChunk, StreamHandle, ToolCallRecord, Usage};
pub use tool::{ToolDescriptor, ToolSchema, build_tools};
pub use transport::{
    DispatchRequest, DynTransport, ResponseFormat, Transport, TransportError, TransportEvent,
    TransportStream,
};
