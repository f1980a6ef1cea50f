//! OpenAI adapter for `uplink`.
//!
//! Registers a factory for [`ProviderKind::OpenAi`] that resolves
//! credentials and configs into dispatch-ready model references for
//! the OpenAI Chat Completions API.
//!
//! [`ProviderKind::OpenAi`]: uplink::ProviderKind::OpenAi

#![warn(missing_docs)]

mod config;
mod factory;

pub use config::{DEFAULT_BASE_URL, OPTION_ORGANIZATION};
pub use factory::OpenAiFactory;

use uplink::AdapterRegistry;

/// Registers the OpenAI factory against the process-wide registry.
pub fn register_global() {
    AdapterRegistry::global().register(OpenAiFactory);
}
