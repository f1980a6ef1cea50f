use uplink::{
    AdapterFactory, AdapterHandle, Credential, InvocationConfig, InvokeError, ModelRef,
    ProviderKind,
};

use crate::config::{OPTION_PROJECT, OPTION_REGION, endpoint};

/// Builds adapters for the Vertex AI generateContent API.
#[derive(Debug, Default, Clone, Copy)]
pub struct VertexFactory;

fn required_option<'a>(config: &'a InvocationConfig, key: &str) -> Result<&'a str, InvokeError> {
    match config.option_str(key) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(InvokeError::Config(format!(
            "vertex: provider option '{key}' is required and must be non-empty"
        ))),
    }
}

impl AdapterFactory for VertexFactory {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Vertex
    }

    fn build(
        &self,
        credential: &Credential,
        config: &InvocationConfig,
    ) -> Result<AdapterHandle, InvokeError> {
        if credential.token.is_empty() {
            return Err(InvokeError::Config(
                "vertex: credential token must not be empty".into(),
            ));
        }
        if config.model.is_empty() {
            return Err(InvokeError::Config(
                "vertex: config.model must not be empty".into(),
            ));
        }
        let region = required_option(config, OPTION_REGION)?;
        let project = required_option(config, OPTION_PROJECT)?;

        let base_url = credential
            .base_url
            .clone()
            .unwrap_or_else(|| endpoint(region, project));

        let model = ModelRef::new(ProviderKind::Vertex, config.model.clone())
            .base_url(base_url)
            .header("authorization", format!("Bearer {}", credential.token));

        Ok(AdapterHandle::new("vertex", model))
    }
}
