//! Prompt builder for rendering templates and injecting context.

use crate::types::{BuiltPrompt, PromptDefinition};
use docrag_core::{AppError, AppResult};
use handlebars::Handlebars;
use std::collections::HashMap;

/// Build a prompt from a definition and input variables.
///
/// Every variable listed in `input.variables` must be present. When the
/// definition asks for knowledge base context, `knowledge_context` is exposed
/// to the template as `{{knowledgeContext}}`.
///
/// # Example
/// ```no_run
/// use docrag_prompt::{build_prompt, load_builtin};
/// use std::collections::HashMap;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let def = load_builtin("rag.keywords")?;
/// let mut vars = HashMap::new();
/// vars.insert("question".to_string(), "What is the login endpoint?".to_string());
///
/// let built = build_prompt(&def, vars, None)?;
/// println!("{}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    mut variables: HashMap<String, String>,
    knowledge_context: Option<String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    if let Some(missing) = definition
        .input
        .variables
        .iter()
        .find(|name| !variables.contains_key(name.as_str()))
    {
        return Err(AppError::Prompt(format!(
            "Prompt {} requires variable '{}'",
            definition.id, missing
        )));
    }

    let knowledge_context_used = match knowledge_context {
        Some(ctx) if definition.context.include_knowledge_base => {
            variables.insert("knowledgeContext".to_string(), ctx);
            true
        }
        None if definition.context.include_knowledge_base => {
            tracing::warn!("Knowledge base context requested but not provided");
            false
        }
        _ => false,
    };

    let user = render_template(&definition.template, &variables)?;
    let system = definition
        .system
        .as_deref()
        .map(|s| render_template(s, &variables))
        .transpose()?;

    Ok(BuiltPrompt {
        prompt_id: definition.id.clone(),
        system,
        user,
        sampling: definition.sampling,
        knowledge_context_used,
    })
}

/// Render a Handlebars template with variables. Output is plain text, so
/// HTML escaping is disabled.
pub fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("prompt", &variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}
