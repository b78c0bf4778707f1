//! LLM provider factory.
//!
//! Resolves a provider name from configuration into a concrete client.

use crate::client::LlmClient;
use crate::providers::{OllamaClient, OpenAiCompatibleClient};
use crate::types::ProviderType;
use docrag_core::config::{AppConfig, ProviderConfig};
use docrag_core::{AppError, AppResult};
use std::sync::Arc;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("ollama", "openai", "openrouter")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - API key, required for OpenAI-compatible providers
///
/// # Errors
/// Returns error if the provider is unknown or a required key is missing.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
) -> Result<Arc<dyn LlmClient>, String> {
    let provider_type =
        ProviderType::parse(provider).ok_or_else(|| format!("Unknown provider: {}", provider))?;
    let base_url = endpoint.unwrap_or(provider_type.default_endpoint());

    match provider_type {
        ProviderType::Ollama => Ok(Arc::new(OllamaClient::with_base_url(base_url))),
        ProviderType::OpenAI => {
            let api_key = api_key
                .filter(|key| !key.is_empty())
                .ok_or_else(|| "OpenAI-compatible provider requires API key".to_string())?;
            Ok(Arc::new(OpenAiCompatibleClient::new(base_url, api_key)))
        }
    }
}

/// Create the client for the active provider of an [`AppConfig`].
///
/// Endpoint, API key and (for Ollama) the request timeout come from the
/// provider's section in `config.yaml` when present.
pub fn create_client_from_config(config: &AppConfig) -> AppResult<Arc<dyn LlmClient>> {
    if let Some(ProviderConfig::Ollama {
        endpoint,
        timeout: Some(secs),
        ..
    }) = config.get_provider_config(&config.provider)
    {
        if ProviderType::parse(&config.provider) == Some(ProviderType::Ollama) {
            return Ok(Arc::new(OllamaClient::with_base_url(endpoint).with_timeout(*secs)));
        }
    }

    let endpoint = config.provider_endpoint();
    let api_key = config.resolve_api_key(&config.provider);
    create_client(&config.provider, endpoint.as_deref(), api_key.as_deref()).map_err(AppError::Llm)
}
