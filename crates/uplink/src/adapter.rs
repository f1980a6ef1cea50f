//! Provider adapters: factories, handles, and the global registry.
//!
//! An [`AdapterFactory`] knows how to turn a [`Credential`] plus an
//! [`InvocationConfig`] into a dispatch-ready [`AdapterHandle`] for one
//! provider family. Factories live in an [`AdapterRegistry`], keyed by
//! [`ProviderKind`], so the orchestrator can resolve the right adapter
//! without knowing any provider by name.
//!
//! Provider crates register themselves against the process-wide
//! registry from [`AdapterRegistry::global`]:
//!
//! ```ignore
//! uplink_openai::register_global();
//! uplink_anthropic::register_global();
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, RwLock};

use crate::error::InvokeError;
use crate::request::{Credential, InvocationConfig, ProviderKind};

/// A fully resolved model target: who to call and how to reach them.
///
/// Header values typically carry credentials, so `Debug` redacts them.
#[derive(Clone, PartialEq, Eq)]
pub struct ModelRef {
    /// Which provider family serves this model.
    pub kind: ProviderKind,
    /// Provider-native model identifier, e.g. `gpt-4o-mini`.
    pub model_id: String,
    /// Endpoint override. `None` means the provider default.
    pub base_url: Option<String>,
    /// Request headers the transport must send, credentials included.
    pub headers: HashMap<String, String>,
}

impl ModelRef {
    /// A model reference with no endpoint override and no headers.
    pub fn new(kind: ProviderKind, model_id: impl Into<String>) -> Self {
        Self {
            kind,
            model_id: model_id.into(),
            base_url: None,
            headers: HashMap::new(),
        }
    }

    /// Sets the endpoint override.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Adds a request header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

impl fmt::Debug for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: HashMap<&str, &str> = self
            .headers
            .keys()
            .map(|k| (k.as_str(), "[REDACTED]"))
            .collect();
        f.debug_struct("ModelRef")
            .field("kind", &self.kind)
            .field("model_id", &self.model_id)
            .field("base_url", &self.base_url)
            .field("headers", &headers)
            .finish()
    }
}

/// The output of a successful factory build.
#[derive(Debug, Clone)]
pub struct AdapterHandle {
    provider_name: std::borrow::Cow<'static, str>,
    model: ModelRef,
}

impl AdapterHandle {
    /// Creates a handle for the named provider and resolved model.
    pub fn new(provider_name: impl Into<std::borrow::Cow<'static, str>>, model: ModelRef) -> Self {
        Self {
            provider_name: provider_name.into(),
            model,
        }
    }

    /// Stable provider name, e.g. `"openai"`.
    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    /// The resolved model target.
    pub fn model(&self) -> &ModelRef {
        &self.model
    }
}

/// Builds dispatch-ready adapters for one provider family.
///
/// `build` must validate everything it needs up front: a handle that
/// comes back `Ok` is dispatchable without further checks.
pub trait AdapterFactory: Send + Sync {
    /// The provider family this factory serves.
    fn kind(&self) -> ProviderKind;

    /// Resolves a credential and config into a dispatchable handle.
    fn build(
        &self,
        credential: &Credential,
        config: &InvocationConfig,
    ) -> Result<AdapterHandle, InvokeError>;
}

/// A thread-safe map from [`ProviderKind`] to its registered factory.
#[derive(Default)]
pub struct AdapterRegistry {
    factories: RwLock<HashMap<ProviderKind, Arc<dyn AdapterFactory>>>,
}

impl fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

impl AdapterRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry provider crates register against.
    pub fn global() -> Arc<Self> {
        static GLOBAL: OnceLock<Arc<AdapterRegistry>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(Self::new())).clone()
    }

    /// Registers a factory, replacing any existing one for its kind.
    pub fn register<F>(&self, factory: F)
    where
        F: AdapterFactory + 'static,
    {
        self.register_shared(Arc::new(factory));
    }

    /// Registers an already-shared factory.
    pub fn register_shared(&self, factory: Arc<dyn AdapterFactory>) {
        self.factories
            .write()
            .expect("adapter registry lock poisoned")
            .insert(factory.kind(), factory);
    }

    /// Removes the factory for `kind`, returning it if present.
    pub fn unregister(&self, kind: ProviderKind) -> Option<Arc<dyn AdapterFactory>> {
        self.factories
            .write()
            .expect("adapter registry lock poisoned")
            .remove(&kind)
    }

    /// Whether a factory is registered for `kind`.
    pub fn contains(&self, kind: ProviderKind) -> bool {
        self.factories
            .read()
            .expect("adapter registry lock poisoned")
            .contains_key(&kind)
    }

    /// Every registered provider kind, in unspecified order.
    pub fn kinds(&self) -> Vec<ProviderKind> {
        self.factories
            .read()
            .expect("adapter registry lock poisoned")
            .keys()
            .copied()
            .collect()
    }

    /// Builds an adapter for the credential's provider kind.
    ///
    /// Unknown kinds are a config-kind error; factory failures are
    /// propagated verbatim.
    pub fn build(
        &self,
        credential: &Credential,
        config: &InvocationConfig,
    ) -> Result<AdapterHandle, InvokeError> {
        let factory = self
            .factories
            .read()
            .expect("adapter registry lock poisoned")
            .get(&credential.kind)
            .cloned()
            .ok_or_else(|| {
                InvokeError::Config(format!(
                    "no adapter registered for provider '{}'",
                    credential.kind
                ))
            })?;
        factory.build(credential, config)
    }
}
