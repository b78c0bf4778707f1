//! Prompt system for docrag.
//!
//! - YAML prompt definitions, built in and overridable per workspace
//! - Handlebars template rendering
//! - Knowledge base context injection

pub mod builder;
pub mod defaults;
pub mod loader;
pub mod types;

pub use builder::{build_prompt, render_template};
pub use defaults::load_builtin;
pub use loader::{list_prompts, load_prompt};
pub use types::{
    BuiltPrompt, OutputFormat, PromptContextConfig, PromptDefinition, PromptInputSpec,
    SamplingSettings,
};
