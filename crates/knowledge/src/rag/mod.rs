//! Retrieval-augmented answering.
//!
//! [`AskPipeline`] ties together the [`AnswerCache`], keyword extraction,
//! vector retrieval and the answer prompt.

pub mod audit;
pub mod cache;
pub mod keywords;
pub mod pipeline;
pub mod retrieval;

pub use audit::PromptAuditLog;
pub use cache::{normalize_question, AnswerCache};
pub use keywords::{fallback_keywords, parse_keywords, KeywordExtractor, KeywordSet, KeywordSource};
pub use pipeline::{AskAnswer, AskPipeline, AskStage};
pub use retrieval::{RetrievedContext, Retriever, ScoredChunk, SqliteVectorSearch, VectorSearch};
