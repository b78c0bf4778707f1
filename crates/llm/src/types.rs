//! Provider identification.

/// Supported provider families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    /// Any OpenAI-compatible chat completions API
    OpenAI,
    Ollama,
}

impl ProviderType {
    /// Parse provider type from string. OpenRouter is an OpenAI-compatible endpoint.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "openai" | "openrouter" => Some(Self::OpenAI),
            "ollama" => Some(Self::Ollama),
            _ => None,
        }
    }

    /// Get the canonical provider name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Ollama => "ollama",
        }
    }

    /// Endpoint used when none is configured.
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Self::OpenAI => docrag_core::config::DEFAULT_OPENAI_ENDPOINT,
            Self::Ollama => docrag_core::config::DEFAULT_OLLAMA_ENDPOINT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_type_parsing() {
        assert_eq!(ProviderType::parse("openai"), Some(ProviderType::OpenAI));
        assert_eq!(ProviderType::parse("OpenRouter"), Some(ProviderType::OpenAI));
        assert_eq!(ProviderType::parse("ollama"), Some(ProviderType::Ollama));
        assert_eq!(ProviderType::parse("claude"), None);
    }

    #[test]
    fn test_default_endpoints() {
        assert_eq!(
            ProviderType::Ollama.default_endpoint(),
            "http://localhost:11434"
        );
        assert!(ProviderType::OpenAI.default_endpoint().starts_with("https://"));
    }
}
