//! Anthropic adapter for `uplink`.
//!
//! Registers a factory for [`ProviderKind::Anthropic`] that resolves
//! credentials and configs into dispatch-ready model references for
//! the Anthropic Messages API.
//!
//! [`ProviderKind::Anthropic`]: uplink::ProviderKind::Anthropic

#![warn(missing_docs)]

mod config;
mod factory;

pub use config::{DEFAULT_API_VERSION, DEFAULT_BASE_URL, OPTION_API_VERSION};
pub use factory::AnthropicFactory;

use uplink::AdapterRegistry;

/// Registers the Anthropic factory against the process-wide registry.
pub fn register_global() {
    AdapterRegistry::global().register(AnthropicFactory);
}
