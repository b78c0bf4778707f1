//! Built-in prompt definitions.
//!
//! Each can be overridden per workspace by a file with the same id under
//! `.docrag/prompts/`.

use crate::loader::parse_prompt;
use crate::types::PromptDefinition;
use docrag_core::{AppError, AppResult};

pub const KEYWORDS: &str = "rag.keywords";
pub const ANSWER: &str = "rag.answer";
pub const PDF_RESTRUCTURE: &str = "pdf.restructure";
pub const DOCGEN_DOCUMENT: &str = "docgen.document";
pub const DOCGEN_SUMMARY: &str = "docgen.summary";

const BUILTINS: &[(&str, &str)] = &[
    (KEYWORDS, include_str!("../prompts/rag.keywords.yml")),
    (ANSWER, include_str!("../prompts/rag.answer.yml")),
    (PDF_RESTRUCTURE, include_str!("../prompts/pdf.restructure.yml")),
    (DOCGEN_DOCUMENT, include_str!("../prompts/docgen.document.yml")),
    (DOCGEN_SUMMARY, include_str!("../prompts/docgen.summary.yml")),
];

/// Ids of all built-in prompts.
pub fn builtin_ids() -> impl Iterator<Item = &'static str> {
    BUILTINS.iter().map(|(id, _)| *id)
}

/// Load a built-in prompt by id.
pub fn load_builtin(prompt_id: &str) -> AppResult<PromptDefinition> {
    let (_, source) = BUILTINS
        .iter()
        .find(|(id, _)| *id == prompt_id)
        .ok_or_else(|| AppError::Prompt(format!("No built-in prompt: {}", prompt_id)))?;

    parse_prompt(source, prompt_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_builtins_parse() {
        for id in builtin_ids() {
            let def = load_builtin(id).unwrap();
            assert_eq!(def.id, id);
        }
    }

    #[test]
    fn test_answer_prompt_includes_question() {
        let def = load_builtin(ANSWER).unwrap();
        assert!(def.context.include_knowledge_base);
        assert!(def.template.contains("{{question}}"));
        assert!(def.template.contains("{{knowledgeContext}}"));
    }

    #[test]
    fn test_unknown_builtin() {
        assert!(load_builtin("nope").is_err());
    }
}
