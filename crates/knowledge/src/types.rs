//! Knowledge system type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::embeddings::EmbeddingConfig;

/// Configuration for a knowledge base (`.docrag/knowledge/<base>/config.yaml`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBaseConfig {
    /// Name of the knowledge base
    pub name: String,

    /// Chunk size in bytes
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,

    /// Overlap between consecutive chunks in bytes
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: u32,

    /// Embedding settings
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

fn default_chunk_size() -> u32 {
    1000
}

fn default_chunk_overlap() -> u32 {
    200
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            embedding: EmbeddingConfig::default(),
        }
    }
}

/// A source document stored in the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeSource {
    /// Unique source identifier
    pub id: String,

    /// File path
    pub path: PathBuf,

    /// Loader that produced the text ("pdf", "xml", "excel", ...)
    pub content_type: String,

    /// sha256 of the extracted text, hex encoded
    pub content_hash: String,

    /// When this source was ingested
    pub learned_at: DateTime<Utc>,

    /// Size of the extracted text in bytes
    pub size_bytes: u64,
}

/// A text chunk with embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    /// Unique chunk identifier
    pub id: String,

    /// Source document ID
    pub source_id: String,

    /// Position within source
    pub position: u32,

    /// Text content
    pub text: String,

    /// Embedding vector
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,

    /// Byte offsets of the chunk in the source text
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Internal chunk candidate before embedding.
#[derive(Debug, Clone)]
pub struct ChunkCandidate {
    pub source_id: String,
    pub position: u32,
    pub text: String,
    pub metadata: serde_json::Value,
}

/// Options for an ingest run.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Knowledge base name
    pub base_name: String,

    /// Files or directories to ingest
    pub paths: Vec<PathBuf>,

    /// Empty the base before ingesting
    pub reset: bool,
}

/// Statistics from an ingest run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestStats {
    /// Sources added to the index
    pub sources_count: u32,

    /// Unchanged sources that were already indexed
    pub skipped_count: u32,

    /// Files that failed to load or embed
    pub failed_count: u32,

    /// Chunks created
    pub chunks_count: u32,

    /// Total bytes of extracted text
    pub bytes_processed: u64,

    /// Duration in seconds
    pub duration_secs: f64,
}

/// Statistics for a knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseStats {
    pub base_name: String,
    pub sources_count: u32,
    pub chunks_count: u32,
    pub db_size_bytes: u64,
    pub last_learn_at: Option<DateTime<Utc>>,
}
