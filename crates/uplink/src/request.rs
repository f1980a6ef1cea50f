//! Per-invocation request types: credentials and configuration.
//!
//! [`Credential`] and [`InvocationConfig`] are created by the caller
//! for each invocation and discarded after the call returns. Both are
//! immutable inputs: the rule engine returns derived copies and the
//! orchestrator never mutates them in place, so concurrent invocations
//! sharing the same values are safe without locks.
//!
//! ```rust
//! use uplink::request::{Credential, InvocationConfig, OutputMode, ProviderKind};
//!
//! let credential = Credential::new(ProviderKind::OpenAi, "sk-...");
//! let config = InvocationConfig {
//!     model: "gpt-4o-mini".into(),
//!     temperature: Some(0.7),
//!     ..Default::default()
//! };
//! assert_eq!(config.output_mode, OutputMode::Unset);
//! # let _ = credential;
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tool::ToolSchema;

/// An external model-serving backend, selected by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum ProviderKind {
    /// OpenAI chat completions.
    OpenAi,
    /// Anthropic messages.
    Anthropic,
    /// Google Vertex AI (cloud-hosted, region/project scoped).
    Vertex,
}

impl ProviderKind {
    /// Lowercase identifier used for registry lookup and logging.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Vertex => "vertex",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authentication material for one invocation.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    /// Which provider this credential belongs to.
    pub kind: ProviderKind,
    /// The authentication token or API key.
    pub token: String,
    /// Optional custom endpoint, overriding the provider default.
    pub base_url: Option<String>,
}

impl Credential {
    /// Creates a credential for the given provider.
    pub fn new(kind: ProviderKind, token: impl Into<String>) -> Self {
        Self {
            kind,
            token: token.into(),
            base_url: None,
        }
    }

    /// Sets a custom endpoint URL.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("kind", &self.kind)
            .field("token", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Structured-output flag supplied alongside an output schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputMode {
    /// Generation constrained to one object conforming to the schema.
    Object,
    /// Generation constrained to an array of schema-conforming objects.
    Array,
    /// Schema explicitly disabled; free text even if a schema is present.
    NoSchema,
    /// No flag supplied.
    #[default]
    Unset,
}

/// Which shape the invocation result takes, decided once before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultType {
    /// Free-text stream.
    Text,
    /// Schema-validated structured-object stream.
    Object,
}

impl ResultType {
    /// Pure decision function: `Object` iff a schema is present **and**
    /// the output mode is `Object` or `Array`. Independent of provider.
    pub fn decide(schema: Option<&JsonSchema>, mode: OutputMode) -> Self {
        match (schema, mode) {
            (Some(_), OutputMode::Object | OutputMode::Array) => Self::Object,
            _ => Self::Text,
        }
    }
}

/// Model configuration for one invocation.
///
/// Most fields are optional; at minimum you need [`model`](Self::model).
/// Provider-specific settings that have no dedicated field go in
/// [`provider_options`](Self::provider_options); each adapter crate
/// documents the keys it recognizes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InvocationConfig {
    /// Model identifier (e.g. `"gpt-4o-mini"`, `"claude-sonnet-4-20250514"`).
    pub model: String,
    /// Sampling temperature. Clamped into the provider's supported
    /// range by the rule engine.
    pub temperature: Option<f32>,
    /// Upper bound on generated tokens.
    pub max_tokens: Option<u32>,
    /// Declarative tool schemas, keyed by tool name.
    pub tools: Option<BTreeMap<String, ToolSchema>>,
    /// JSON Schema for structured output.
    pub output_schema: Option<JsonSchema>,
    /// Structured-output flag; only meaningful together with
    /// [`output_schema`](Self::output_schema).
    pub output_mode: OutputMode,
    /// Arbitrary key-value pairs forwarded to the provider.
    pub provider_options: HashMap<String, Value>,
}

impl InvocationConfig {
    /// Gets a string value from the provider option bag.
    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.provider_options.get(key).and_then(|v| v.as_str())
    }

    /// Gets a bool value from the provider option bag.
    pub fn option_bool(&self, key: &str) -> Option<bool> {
        self.provider_options.get(key).and_then(Value::as_bool)
    }

    /// Gets an integer value from the provider option bag.
    pub fn option_i64(&self, key: &str) -> Option<i64> {
        self.provider_options.get(key).and_then(Value::as_i64)
    }
}

/// A JSON Schema document used for structured output or tool parameters.
///
/// Wraps a [`serde_json::Value`]. The inner value is private; use
/// [`as_value`](Self::as_value) for read access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonSchema(Value);

impl JsonSchema {
    /// Creates a schema from a raw JSON value.
    pub fn new(schema: Value) -> Self {
        Self(schema)
    }

    /// Returns a reference to the underlying JSON value.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Derives a JSON Schema from a Rust type that implements
    /// [`schemars::JsonSchema`].
    ///
    /// Requires the `schema` feature (enabled by default).
    #[cfg(feature = "schema")]
    pub fn from_type<T: schemars::JsonSchema>() -> Result<Self, serde_json::Error> {
        let schema = schemars::schema_for!(T);
        let value = serde_json::to_value(schema)?;
        Ok(Self(value))
    }

    /// Validates `value` against this schema.
    ///
    /// Requires the `schema` feature (enabled by default).
    ///
    /// Returns [`InvokeError::Config`](crate::error::InvokeError::Config)
    /// if the schema itself is malformed, or
    /// [`InvokeError::Run`](crate::error::InvokeError::Run) listing the
    /// violations when `value` does not conform.
    #[cfg(feature = "schema")]
    pub fn validate(&self, value: &Value) -> Result<(), crate::error::InvokeError> {
        use crate::error::InvokeError;

        let validator = jsonschema::validator_for(&self.0)
            .map_err(|e| InvokeError::Config(format!("invalid JSON schema: {e}")))?;
        let errors: Vec<String> = validator.iter_errors(value).map(|e| e.to_string()).collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(InvokeError::Run(format!(
                "output failed schema validation: {}",
                errors.join("; ")
            )))
        }
    }
}
