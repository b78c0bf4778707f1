//! Prompt types for docrag.

use serde::{Deserialize, Serialize};

/// A prompt definition loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt identifier (e.g. "rag.answer")
    pub id: String,

    /// Human-readable title
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Sampling settings forwarded to the LLM request
    #[serde(default)]
    pub sampling: SamplingSettings,

    #[serde(default)]
    pub context: PromptContextConfig,

    #[serde(default)]
    pub input: PromptInputSpec,

    /// Optional system message, rendered with the same variables
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Template string with Handlebars syntax
    pub template: String,

    /// Shape of the reply the template asks for
    #[serde(default)]
    pub output: OutputFormat,
}

/// Per-prompt sampling overrides. Unset values leave the provider default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SamplingSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(rename = "maxTokens", default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// Context injection configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptContextConfig {
    /// Inject retrieved chunks as `{{knowledgeContext}}`
    #[serde(rename = "includeKnowledgeBase", default)]
    pub include_knowledge_base: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptInputSpec {
    /// Variables that must be supplied when building the prompt
    #[serde(default)]
    pub variables: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Markdown,
    Json,
}

/// A rendered prompt ready for an LLM call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// Id of the definition it was rendered from
    #[serde(rename = "promptId")]
    pub prompt_id: String,

    pub system: Option<String>,

    pub user: String,

    pub sampling: SamplingSettings,

    /// Whether retrieved context was injected into the template
    #[serde(rename = "knowledgeContextUsed")]
    pub knowledge_context_used: bool,
}

impl BuiltPrompt {
    /// System and user message as one text, as written to the prompt log.
    pub fn full_text(&self) -> String {
        match self.system {
            Some(ref system) => format!("{}\n\n{}", system, self.user),
            None => self.user.clone(),
        }
    }
}
