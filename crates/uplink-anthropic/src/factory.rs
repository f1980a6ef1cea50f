use uplink::{
    AdapterFactory, AdapterHandle, Credential, InvocationConfig, InvokeError, ModelRef,
    ProviderKind,
};

use crate::config::{DEFAULT_API_VERSION, DEFAULT_BASE_URL, OPTION_API_VERSION};

/// Builds adapters for the Anthropic Messages API.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnthropicFactory;

impl AdapterFactory for AnthropicFactory {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn build(
        &self,
        credential: &Credential,
        config: &InvocationConfig,
    ) -> Result<AdapterHandle, InvokeError> {
        if credential.token.is_empty() {
            return Err(InvokeError::Config(
                "anthropic: credential token must not be empty".into(),
            ));
        }
        if config.model.is_empty() {
            return Err(InvokeError::Config(
                "anthropic: config.model must not be empty".into(),
            ));
        }

        let base_url = credential
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let api_version = config
            .option_str(OPTION_API_VERSION)
            .unwrap_or(DEFAULT_API_VERSION);

        let model = ModelRef::new(ProviderKind::Anthropic, config.model.clone())
            .base_url(base_url)
            .header("x-api-key", credential.token.clone())
            .header("anthropic-version", api_version);

        Ok(AdapterHandle::new("anthropic", model))
    }
}
