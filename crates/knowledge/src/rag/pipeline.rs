//! The ask pipeline: cache, keywords, retrieval, prompt, LLM.

use crate::embeddings::create_provider;
use crate::rag::audit::PromptAuditLog;
use crate::rag::cache::AnswerCache;
use crate::rag::keywords::{KeywordExtractor, KeywordSet};
use crate::rag::retrieval::{Retriever, SqliteVectorSearch, VectorSearch};
use docrag_core::{AppConfig, AppError, AppResult};
use docrag_llm::{create_client_from_config, LlmClient};
use docrag_prompt::{build_prompt, defaults, load_prompt, PromptDefinition};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Stages of one ask, in order. A cache hit ends the run after
/// [`AskStage::CacheCheck`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AskStage {
    Start,
    CacheCheck,
    ExtractKeywords,
    Retrieve,
    BuildPrompt,
    InvokeLlm,
    StoreAndReturn,
}

impl AskStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::CacheCheck => "cache_check",
            Self::ExtractKeywords => "extract_keywords",
            Self::Retrieve => "retrieve",
            Self::BuildPrompt => "build_prompt",
            Self::InvokeLlm => "invoke_llm",
            Self::StoreAndReturn => "store_and_return",
        }
    }

    fn fail(self, err: impl fmt::Display) -> AppError {
        AppError::pipeline(self.as_str(), err)
    }
}

impl fmt::Display for AskStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a successful ask.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskAnswer {
    pub answer: String,
    pub cached: bool,
    /// Prompt sent to the LLM; `None` on a cache hit
    pub used_prompt: Option<String>,
    /// Keywords used for retrieval; empty on a cache hit
    pub keywords: Vec<String>,
}

/// Answers questions from the knowledge base, caching every answer.
pub struct AskPipeline {
    cache: Arc<AnswerCache>,
    llm: Arc<dyn LlmClient>,
    keywords: KeywordExtractor,
    retriever: Retriever,
    answer_prompt: PromptDefinition,
    model: String,
    audit: Option<PromptAuditLog>,
}

impl AskPipeline {
    pub fn new(
        cache: Arc<AnswerCache>,
        llm: Arc<dyn LlmClient>,
        search: Arc<dyn VectorSearch>,
        keyword_prompt: PromptDefinition,
        answer_prompt: PromptDefinition,
        model: impl Into<String>,
        keyword_model: impl Into<String>,
    ) -> Self {
        Self {
            keywords: KeywordExtractor::new(llm.clone(), keyword_prompt, keyword_model),
            retriever: Retriever::new(search, 3),
            cache,
            llm,
            answer_prompt,
            model: model.into(),
            audit: None,
        }
    }

    /// Wire the production pipeline from application configuration.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        config.validate()?;

        let workspace = &config.workspace;
        let base_name = &config.rag.knowledge_base;

        let llm = create_client_from_config(config)?;
        let cache = Arc::new(AnswerCache::open(&config.cache_path())?);

        let kb_config = crate::config::load_config(workspace, base_name)?;
        let embedder = create_provider(&kb_config.embedding)?;
        let search = Arc::new(SqliteVectorSearch::open(workspace, base_name, embedder)?);

        let keyword_prompt = load_prompt(workspace, defaults::KEYWORDS)?;
        let answer_prompt = load_prompt(workspace, defaults::ANSWER)?;

        tracing::info!(
            "Ask pipeline ready (provider: {}, model: {}, base: {}, top_k: {})",
            llm.provider_name(),
            config.model,
            base_name,
            config.rag.top_k
        );

        Ok(Self::new(
            cache,
            llm,
            search,
            keyword_prompt,
            answer_prompt,
            config.model.clone(),
            config.keyword_model(),
        )
        .with_top_k(config.rag.top_k)
        .with_audit_log(PromptAuditLog::new(config.prompt_log_path())))
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.retriever = self.retriever.with_top_k(top_k);
        self
    }

    pub fn with_audit_log(mut self, audit: PromptAuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn cache(&self) -> &Arc<AnswerCache> {
        &self.cache
    }

    /// Answer `question`, serving it from the cache when possible.
    pub async fn ask(&self, question: &str) -> AppResult<AskAnswer> {
        if question.trim().is_empty() {
            return Err(AskStage::Start.fail("question is empty"));
        }

        let cached = self
            .cache
            .lookup(question)
            .map_err(|e| AskStage::CacheCheck.fail(e))?;
        if let Some(answer) = cached {
            tracing::info!("Cache hit");
            return Ok(AskAnswer {
                answer,
                cached: true,
                used_prompt: None,
                keywords: Vec::new(),
            });
        }
        tracing::debug!("Cache miss");

        let KeywordSet { keywords, source } = self
            .keywords
            .extract(question)
            .await
            .map_err(|e| AskStage::ExtractKeywords.fail(e))?;
        tracing::info!("Keywords ({:?}): {:?}", source, keywords);

        let retrieved = self
            .retriever
            .retrieve(&keywords)
            .await
            .map_err(|e| AskStage::Retrieve.fail(e))?;

        let mut vars = HashMap::new();
        vars.insert("question".to_string(), question.to_string());
        vars.insert("keywords".to_string(), keywords.join(", "));
        let built = build_prompt(&self.answer_prompt, vars, Some(retrieved.context))
            .map_err(|e| AskStage::BuildPrompt.fail(e))?;
        let used_prompt = built.full_text();

        if let Some(audit) = &self.audit {
            audit.record(&used_prompt);
        }

        let request = crate::llm_request(built, self.model.clone());

        let response = self
            .llm
            .complete(&request)
            .await
            .map_err(|e| AskStage::InvokeLlm.fail(e))?;
        let answer = response.content.trim().to_string();

        if let Err(e) = self.cache.store(question, &answer) {
            tracing::warn!("Failed to cache answer: {}", e);
        }

        Ok(AskAnswer {
            answer,
            cached: false,
            used_prompt: Some(used_prompt),
            keywords,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::retrieval::ScoredChunk;
    use crate::types::KnowledgeChunk;
    use docrag_llm::{LlmRequest, LlmResponse, LlmUsage};
    use docrag_prompt::load_builtin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Answers keyword prompts with JSON and everything else with a fixed answer.
    struct FakeLlm {
        calls: AtomicUsize,
        fail: bool,
    }

    impl FakeLlm {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl LlmClient for FakeLlm {
        fn provider_name(&self) -> &str {
            "fake"
        }

        async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AppError::Llm("model unavailable".to_string()));
            }

            let content = if request.prompt.contains("key technical terms") {
                r#"{"keywords": ["login", "endpoint"]}"#.to_string()
            } else {
                "  Use POST /login.  ".to_string()
            };

            Ok(LlmResponse {
                content,
                model: request.model.clone(),
                usage: LlmUsage::default(),
            })
        }
    }

    struct FakeSearch {
        fail: bool,
    }

    #[async_trait::async_trait]
    impl VectorSearch for FakeSearch {
        async fn search(&self, _query: &str, k: usize) -> AppResult<Vec<ScoredChunk>> {
            if self.fail {
                return Err(AppError::Knowledge("index missing".to_string()));
            }

            Ok(["POST /login takes email and password.", "GET /chat/:email"]
                .iter()
                .take(k)
                .enumerate()
                .map(|(i, text)| ScoredChunk {
                    chunk: KnowledgeChunk {
                        id: i.to_string(),
                        source_id: "api".to_string(),
                        position: i as u32,
                        text: text.to_string(),
                        embedding: None,
                        metadata: serde_json::Value::Null,
                    },
                    score: 0.5,
                })
                .collect())
        }
    }

    fn pipeline(llm: Arc<FakeLlm>, search_fails: bool) -> AskPipeline {
        AskPipeline::new(
            Arc::new(AnswerCache::in_memory()),
            llm,
            Arc::new(FakeSearch { fail: search_fails }),
            load_builtin(defaults::KEYWORDS).unwrap(),
            load_builtin(defaults::ANSWER).unwrap(),
            "answer-model",
            "keyword-model",
        )
    }

    #[tokio::test]
    async fn test_cache_miss_then_hit() {
        let llm = FakeLlm::new(false);
        let pipeline = pipeline(llm.clone(), false);

        let first = pipeline.ask("What is the login endpoint?").await.unwrap();
        assert!(!first.cached);
        assert_eq!(first.answer, "Use POST /login.");
        assert_eq!(first.keywords, vec!["login", "endpoint"]);
        let prompt = first.used_prompt.unwrap();
        assert!(prompt.contains("POST /login takes email and password.\n\nGET /chat/:email"));
        assert!(prompt.contains("login, endpoint"));
        assert!(prompt.contains("What is the login endpoint?"));
        assert_eq!(llm.calls(), 2);

        let second = pipeline.ask("  what is the LOGIN endpoint?  ").await.unwrap();
        assert!(second.cached);
        assert_eq!(second.answer, "Use POST /login.");
        assert!(second.used_prompt.is_none());
        assert_eq!(llm.calls(), 2);
    }

    #[tokio::test]
    async fn test_cached_question_skips_llm() {
        let llm = FakeLlm::new(true);
        let pipeline = pipeline(llm.clone(), true);
        pipeline.cache().store("how do I register?", "POST /register").unwrap();

        let answer = pipeline.ask("How do I register?").await.unwrap();
        assert!(answer.cached);
        assert_eq!(answer.answer, "POST /register");
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_top_k_limits_context() {
        let pipeline = pipeline(FakeLlm::new(false), false).with_top_k(1);
        let answer = pipeline.ask("login?").await.unwrap();
        let prompt = answer.used_prompt.unwrap();
        assert!(prompt.contains("POST /login takes email"));
        assert!(!prompt.contains("GET /chat/:email"));
    }

    #[tokio::test]
    async fn test_blank_question_rejected() {
        let llm = FakeLlm::new(false);
        let pipeline = pipeline(llm.clone(), false);

        let err = pipeline.ask("   ").await.unwrap_err();
        assert!(matches!(err, AppError::Pipeline { ref stage, .. } if stage == "start"));
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_llm_failure_surfaces_and_is_not_cached() {
        let llm = FakeLlm::new(true);
        let pipeline = pipeline(llm.clone(), false);

        let err = pipeline.ask("what is the login endpoint").await.unwrap_err();
        assert!(matches!(err, AppError::Pipeline { ref stage, .. } if stage == "invoke_llm"));
        // Keyword call failed over to the fallback, then the answer call failed
        assert_eq!(llm.calls(), 2);
        assert!(pipeline.cache().is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_retrieval_failure_names_stage() {
        let pipeline = pipeline(FakeLlm::new(false), true);
        let err = pipeline.ask("anything").await.unwrap_err();
        assert!(matches!(err, AppError::Pipeline { ref stage, .. } if stage == "retrieve"));
        assert!(err.to_string().contains("index missing"));
    }

    #[tokio::test]
    async fn test_prompt_is_audited() {
        let dir = TempDir::new().unwrap();
        let log_path = dir.path().join("prompts.log");
        let pipeline =
            pipeline(FakeLlm::new(false), false).with_audit_log(PromptAuditLog::new(&log_path));

        pipeline.ask("What is the login endpoint?").await.unwrap();

        let log = std::fs::read_to_string(&log_path).unwrap();
        assert!(log.contains("PROMPT TIME: "));
        assert!(log.contains("What is the login endpoint?"));
    }
}
