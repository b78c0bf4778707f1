//! Retrieval of context chunks for a keyword set.

use crate::embeddings::EmbeddingProvider;
use crate::index;
use crate::types::KnowledgeChunk;
use docrag_core::{AppError, AppResult};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// A chunk with its similarity to the query.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: KnowledgeChunk,
    pub score: f32,
}

/// Similarity search over stored chunks.
#[async_trait::async_trait]
pub trait VectorSearch: Send + Sync {
    /// Up to `k` chunks most similar to `query`, best first.
    async fn search(&self, query: &str, k: usize) -> AppResult<Vec<ScoredChunk>>;
}

/// Context assembled for the answer prompt.
#[derive(Debug, Clone, Default)]
pub struct RetrievedContext {
    /// Chunk texts joined by blank lines
    pub context: String,
    pub chunks: Vec<ScoredChunk>,
}

/// Turns keywords into context via a [`VectorSearch`].
pub struct Retriever {
    search: Arc<dyn VectorSearch>,
    top_k: usize,
}

impl Retriever {
    pub fn new(search: Arc<dyn VectorSearch>, top_k: usize) -> Self {
        Self {
            search,
            top_k: top_k.max(1),
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Search with the keywords joined by single spaces as one query.
    ///
    /// Always returns the top `k` results; there is no score threshold.
    pub async fn retrieve(&self, keywords: &[String]) -> AppResult<RetrievedContext> {
        let query = keywords.join(" ");
        tracing::debug!("Retrieval query: {:?} (k={})", query, self.top_k);

        let mut chunks = self.search.search(&query, self.top_k).await?;
        chunks.truncate(self.top_k);

        let context = chunks
            .iter()
            .map(|c| c.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        tracing::info!("Retrieved {} chunks", chunks.len());
        Ok(RetrievedContext { context, chunks })
    }
}

/// [`VectorSearch`] over a knowledge base SQLite index.
pub struct SqliteVectorSearch {
    conn: Mutex<Connection>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl SqliteVectorSearch {
    /// Open the index of `base_name` in `workspace`, creating it if missing.
    pub fn open(
        workspace: &Path,
        base_name: &str,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> AppResult<Self> {
        let index_path = crate::config::get_index_path(workspace, base_name);
        let conn = index::init_index(&index_path)?;
        Ok(Self::with_connection(conn, embedder))
    }

    pub fn with_connection(conn: Connection, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            conn: Mutex::new(conn),
            embedder,
        }
    }
}

#[async_trait::async_trait]
impl VectorSearch for SqliteVectorSearch {
    async fn search(&self, query: &str, k: usize) -> AppResult<Vec<ScoredChunk>> {
        let query_embedding = self.embedder.embed(query).await?;

        let conn = self
            .conn
            .lock()
            .map_err(|_| AppError::Knowledge("Vector store lock poisoned".to_string()))?;
        let results = index::query_chunks(&conn, &query_embedding, k)?;

        Ok(results
            .into_iter()
            .map(|(chunk, score)| ScoredChunk { chunk, score })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::mock::MockProvider;
    use crate::types::KnowledgeSource;
    use chrono::Utc;
    use std::path::PathBuf;
    use std::sync::Mutex as StdMutex;

    struct RecordingSearch {
        queries: StdMutex<Vec<String>>,
        texts: Vec<&'static str>,
    }

    #[async_trait::async_trait]
    impl VectorSearch for RecordingSearch {
        async fn search(&self, query: &str, k: usize) -> AppResult<Vec<ScoredChunk>> {
            self.queries.lock().unwrap().push(query.to_string());
            Ok(self
                .texts
                .iter()
                .take(k)
                .enumerate()
                .map(|(i, text)| ScoredChunk {
                    chunk: KnowledgeChunk {
                        id: i.to_string(),
                        source_id: "s".to_string(),
                        position: i as u32,
                        text: text.to_string(),
                        embedding: None,
                        metadata: serde_json::Value::Null,
                    },
                    score: -0.5,
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn test_retrieve_joins_keywords_and_chunks() {
        let search = Arc::new(RecordingSearch {
            queries: StdMutex::new(Vec::new()),
            texts: vec!["first", "second", "third", "fourth"],
        });
        let retriever = Retriever::new(search.clone(), 3);

        let keywords = vec!["login".to_string(), "endpoint".to_string()];
        let retrieved = retriever.retrieve(&keywords).await.unwrap();

        assert_eq!(search.queries.lock().unwrap().as_slice(), ["login endpoint"]);
        assert_eq!(retrieved.chunks.len(), 3);
        // Low scores are kept
        assert_eq!(retrieved.context, "first\n\nsecond\n\nthird");
    }

    #[tokio::test]
    async fn test_sqlite_search_ranks_chunks() {
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(MockProvider::new(128));
        let conn = index::init_memory_index().unwrap();

        index::insert_source(
            &conn,
            &KnowledgeSource {
                id: "s1".to_string(),
                path: PathBuf::from("api.md"),
                content_type: "markdown".to_string(),
                content_hash: "h".to_string(),
                learned_at: Utc::now(),
                size_bytes: 10,
            },
        )
        .unwrap();

        for (i, text) in ["POST /login authenticates a user", "GET /invoices lists billing"]
            .iter()
            .enumerate()
        {
            let embedding = embedder.embed(text).await.unwrap();
            index::insert_chunk(
                &conn,
                &KnowledgeChunk {
                    id: format!("c{}", i),
                    source_id: "s1".to_string(),
                    position: i as u32,
                    text: text.to_string(),
                    embedding: Some(embedding),
                    metadata: serde_json::Value::Null,
                },
            )
            .unwrap();
        }

        let search = SqliteVectorSearch::with_connection(conn, embedder);
        let results = search.search("login user", 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.id, "c0");
    }
}
