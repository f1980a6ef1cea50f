use uplink::{
    AdapterFactory, AdapterHandle, Credential, InvocationConfig, InvokeError, ModelRef,
    ProviderKind,
};

use crate::config::{DEFAULT_BASE_URL, OPTION_ORGANIZATION};

/// Builds adapters for the OpenAI Chat Completions API.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenAiFactory;

impl AdapterFactory for OpenAiFactory {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    fn build(
        &self,
        credential: &Credential,
        config: &InvocationConfig,
    ) -> Result<AdapterHandle, InvokeError> {
        if credential.token.is_empty() {
            return Err(InvokeError::Config(
                "openai: credential token must not be empty".into(),
            ));
        }
        if config.model.is_empty() {
            return Err(InvokeError::Config(
                "openai: config.model must not be empty".into(),
            ));
        }

        let base_url = credential
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let mut model = ModelRef::new(ProviderKind::OpenAi, config.model.clone())
            .base_url(base_url)
            .header("authorization", format!("Bearer {}", credential.token));
        if let Some(org) = config.option_str(OPTION_ORGANIZATION) {
            model = model.header("openai-organization", org);
        }

        Ok(AdapterHandle::new("openai", model))
    }
}
