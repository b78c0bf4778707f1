//! LLM integration crate for docrag.
//!
//! Provider-agnostic access to text-completion backends through the
//! [`LlmClient`] trait. Everything that needs a model (keyword extraction,
//! answering, PDF restructuring, doc generation) takes an
//! `Arc<dyn LlmClient>` so tests can substitute a fake.
//!
//! # Providers
//! - **Ollama**: local runtime (default)
//! - **OpenAI-compatible**: OpenAI, OpenRouter or any `/chat/completions` API
//!
//! # Example
//! ```no_run
//! use docrag_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("Hello, world!", "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::{create_client, create_client_from_config};
pub use providers::{OllamaClient, OpenAiCompatibleClient};
pub use types::ProviderType;

#[cfg(test)]
mod tests {
    use docrag_core::AppConfig;

    #[test]
    fn test_factory_is_reachable_from_crate_root() {
        let client = crate::create_client_from_config(&AppConfig::default()).unwrap();
        assert_eq!(client.provider_name(), "ollama");
    }
}
