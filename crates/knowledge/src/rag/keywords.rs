//! Keyword extraction for retrieval queries.
//!
//! The LLM is asked for a JSON object `{"keywords": [...]}`. Anything that
//! does not parse into a non-empty list falls back to a regex heuristic, so
//! extraction of a non-blank question always yields at least one keyword.

use docrag_core::{AppError, AppResult};
use docrag_llm::LlmClient;
use docrag_prompt::{build_prompt, PromptDefinition};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

/// Maximum number of keywords taken by the fallback heuristic.
const FALLBACK_LIMIT: usize = 3;

/// Where a keyword set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordSource {
    Llm,
    Fallback,
}

/// Ordered, non-empty search terms for one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordSet {
    pub keywords: Vec<String>,
    pub source: KeywordSource,
}

#[derive(Debug, Deserialize)]
struct KeywordsPayload {
    keywords: Vec<String>,
}

/// Parse an LLM reply into keywords.
///
/// Takes the text between the first `{` and the last `}` and expects an
/// object with a `keywords` string array. Entries are trimmed and blanks
/// dropped; an empty result is an error.
pub fn parse_keywords(response: &str) -> AppResult<Vec<String>> {
    let start = response
        .find('{')
        .ok_or_else(|| AppError::Other("No JSON object in keyword response".to_string()))?;
    let end = response
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| AppError::Other("Unterminated JSON object in keyword response".to_string()))?;

    let payload: KeywordsPayload = serde_json::from_str(&response[start..=end])?;

    let keywords: Vec<String> = payload
        .keywords
        .into_iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect();

    if keywords.is_empty() {
        return Err(AppError::Other("Keyword list is empty".to_string()));
    }

    Ok(keywords)
}

static LONG_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w{4,}\b").expect("valid regex"));
static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").expect("valid regex"));

/// Heuristic keywords: the first three words of four or more characters,
/// else the first three words, else the whole trimmed question.
///
/// A blank question has no keywords and is an error.
pub fn fallback_keywords(question: &str) -> AppResult<Vec<String>> {
    let lower = question.trim().to_lowercase();
    if lower.is_empty() {
        return Err(AppError::Other(
            "Cannot extract keywords from an empty question".to_string(),
        ));
    }

    for re in [&*LONG_WORD, &*WORD] {
        let words: Vec<String> = re
            .find_iter(&lower)
            .take(FALLBACK_LIMIT)
            .map(|m| m.as_str().to_string())
            .collect();
        if !words.is_empty() {
            return Ok(words);
        }
    }

    Ok(vec![lower])
}

/// Extracts keywords with an LLM, falling back to [`fallback_keywords`].
pub struct KeywordExtractor {
    llm: Arc<dyn LlmClient>,
    prompt: PromptDefinition,
    model: String,
}

impl KeywordExtractor {
    pub fn new(llm: Arc<dyn LlmClient>, prompt: PromptDefinition, model: impl Into<String>) -> Self {
        Self {
            llm,
            prompt,
            model: model.into(),
        }
    }

    /// Extract keywords for `question`.
    ///
    /// Fails only for a blank question; LLM errors fall back to the heuristic.
    pub async fn extract(&self, question: &str) -> AppResult<KeywordSet> {
        if question.trim().is_empty() {
            return Err(AppError::Other(
                "Cannot extract keywords from an empty question".to_string(),
            ));
        }

        let set = match self.extract_with_llm(question).await {
            Ok(keywords) => {
                tracing::debug!("LLM keywords: {:?}", keywords);
                KeywordSet {
                    keywords,
                    source: KeywordSource::Llm,
                }
            }
            Err(e) => {
                let keywords = fallback_keywords(question)?;
                tracing::warn!(
                    "Keyword extraction failed ({}), using fallback keywords {:?}",
                    e,
                    keywords
                );
                KeywordSet {
                    keywords,
                    source: KeywordSource::Fallback,
                }
            }
        };

        Ok(set)
    }

    async fn extract_with_llm(&self, question: &str) -> AppResult<Vec<String>> {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), question.to_string());
        let built = build_prompt(&self.prompt, vars, None)?;

        let request = crate::llm_request(built, self.model.clone());

        let response = self.llm.complete(&request).await?;
        parse_keywords(&response.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docrag_llm::{LlmRequest, LlmResponse, LlmUsage};
    use docrag_prompt::load_builtin;

    struct ScriptedLlm {
        reply: Option<String>,
    }

    #[async_trait::async_trait]
    impl LlmClient for ScriptedLlm {
        fn provider_name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
            match &self.reply {
                Some(reply) => Ok(LlmResponse {
                    content: reply.clone(),
                    model: request.model.clone(),
                    usage: LlmUsage::default(),
                }),
                None => Err(AppError::Llm("connection refused".to_string())),
            }
        }
    }

    fn extractor(reply: Option<&str>) -> KeywordExtractor {
        KeywordExtractor::new(
            Arc::new(ScriptedLlm {
                reply: reply.map(str::to_string),
            }),
            load_builtin("rag.keywords").unwrap(),
            "llama3.2",
        )
    }

    #[test]
    fn test_parse_keywords_with_surrounding_text() {
        let reply = "Sure! Here you go:\n{\"keywords\": [\" login \", \"\", \"endpoint\"]}\nDone.";
        assert_eq!(parse_keywords(reply).unwrap(), vec!["login", "endpoint"]);
    }

    #[test]
    fn test_parse_keywords_rejects_bad_payloads() {
        assert!(parse_keywords("no json here").is_err());
        assert!(parse_keywords("{\"keywords\": []}").is_err());
        assert!(parse_keywords("{\"terms\": [\"a\"]}").is_err());
        assert!(parse_keywords("{\"keywords\": [\"a\"").is_err());
        assert!(parse_keywords("} {").is_err());
    }

    #[test]
    fn test_fallback_prefers_long_words() {
        assert_eq!(
            fallback_keywords("what is the login endpoint").unwrap(),
            vec!["what", "login", "endpoint"]
        );
        assert_eq!(
            fallback_keywords("How do I RESET my password via the API?").unwrap(),
            vec!["reset", "password"]
        );
    }

    #[test]
    fn test_fallback_short_words_and_symbols() {
        assert_eq!(
            fallback_keywords("is it ok to go").unwrap(),
            vec!["is", "it", "ok"]
        );
        assert_eq!(fallback_keywords("  ?!  ").unwrap(), vec!["?!"]);
    }

    #[test]
    fn test_fallback_rejects_blank_question() {
        assert!(fallback_keywords("").is_err());
        assert!(fallback_keywords("   \n\t").is_err());
    }

    #[tokio::test]
    async fn test_extract_rejects_blank_question() {
        assert!(extractor(None).extract("   ").await.is_err());
        assert!(extractor(Some("{\"keywords\": [\"x\"]}"))
            .extract("")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_extract_uses_llm_reply() {
        let set = extractor(Some("{\"keywords\": [\"POST /login\", \"auth\"]}"))
            .extract("how do I log in?")
            .await
            .unwrap();
        assert_eq!(set.source, KeywordSource::Llm);
        assert_eq!(set.keywords, vec!["POST /login", "auth"]);
    }

    #[tokio::test]
    async fn test_extract_falls_back_when_llm_unavailable() {
        let set = extractor(None)
            .extract("what is the login endpoint")
            .await
            .unwrap();
        assert_eq!(set.source, KeywordSource::Fallback);
        assert_eq!(set.keywords, vec!["what", "login", "endpoint"]);
    }

    #[tokio::test]
    async fn test_extract_falls_back_on_malformed_json() {
        let set = extractor(Some("keywords: login, endpoint"))
            .extract("what is the login endpoint")
            .await
            .unwrap();
        assert_eq!(set.source, KeywordSource::Fallback);
        assert!(!set.keywords.is_empty());
    }
}
