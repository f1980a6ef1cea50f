//! The typed error taxonomy and the transport error translator.
//!
//! Every public operation returns `Result<_, InvokeError>`. The three
//! variants map to the three stable [`ErrorCode`]s callers can branch
//! on:
//!
//! - [`Config`](InvokeError::Config): credential or configuration
//!   malformed for the selected provider, detected before dispatch.
//!   "Fix your settings."
//! - [`Run`](InvokeError::Run): the call itself failed, whether a validation
//!   rule rejected the request, or the transport reported an error
//!   during or after dispatch. "The call failed."
//! - [`Unknown`](InvokeError::Unknown): anything not classified
//!   above, downgraded to a generic message.
//!
//! [`translate`] and [`translate_panic`] convert transport failures and
//! escaped panics into run-errors; they never produce the config kind,
//! since that path only covers in-flight failures.

use std::any::Any;

use serde::{Deserialize, Serialize};

use crate::transport::TransportError;

/// Stable error classification carried by every [`InvokeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Credential or configuration problem, detected before dispatch.
    Config,
    /// Failure during or after dispatch, including validation rejections.
    Run,
    /// Unclassified failure.
    Unknown,
}

/// The unified error type returned by all invocation operations.
///
/// All variants carry only a message, so the type is `Clone` and can be
/// fanned out to every deferred accessor of a failed stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum InvokeError {
    /// Credential or configuration malformed/incomplete for the
    /// selected provider.
    #[error("{0}")]
    Config(String),

    /// Failure during or after dispatch, including aggregated rule
    /// violations and translated transport errors.
    #[error("{0}")]
    Run(String),

    /// A failure not classified above.
    #[error("{0}")]
    Unknown(String),
}

impl InvokeError {
    /// The stable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Config(_) => ErrorCode::Config,
            Self::Run(_) => ErrorCode::Run,
            Self::Unknown(_) => ErrorCode::Unknown,
        }
    }

    /// The human-readable message.
    pub fn message(&self) -> &str {
        match self {
            Self::Config(m) | Self::Run(m) | Self::Unknown(m) => m,
        }
    }
}

/// Translates a transport failure into a run-error.
///
/// - An API error carrying a response body becomes
///   `"Error: {message} and response body: {body}"`.
/// - Anything else with a message becomes `"Unknown error: {message}"`.
pub fn translate(err: TransportError) -> InvokeError {
    match err {
        TransportError::Api {
            message,
            body: Some(body),
            ..
        } => InvokeError::Run(format!("Error: {message} and response body: {body}")),
        TransportError::Api {
            message,
            body: None,
            ..
        } => InvokeError::Run(format!("Unknown error: {message}")),
        TransportError::Other(source) => InvokeError::Run(format!("Unknown error: {source}")),
    }
}

/// Translates an escaped panic payload into a run-error.
///
/// String payloads surface verbatim; anything else gets a generic
/// placeholder so internal state never leaks into the message.
pub fn translate_panic(payload: Box<dyn Any + Send>) -> InvokeError {
    let text = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "opaque panic payload".to_string()
    };
    InvokeError::Run(format!("Unknown error: {text}"))
}
