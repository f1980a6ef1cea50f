//! Google Vertex AI adapter for `uplink`.
//!
//! Registers a factory for [`ProviderKind::Vertex`] that resolves
//! credentials and configs into dispatch-ready model references for
//! the Vertex AI generateContent API. Vertex endpoints are regional
//! and project-scoped, so both must be supplied as provider options.
//!
//! [`ProviderKind::Vertex`]: uplink::ProviderKind::Vertex

#![warn(missing_docs)]

mod config;
mod factory;

pub use config::{OPTION_PROJECT, OPTION_REGION};
pub use factory::VertexFactory;

use uplink::AdapterRegistry;

/// Registers the Vertex factory against the process-wide registry.
pub fn register_global() {
    AdapterRegistry::global().register(VertexFactory);
}
