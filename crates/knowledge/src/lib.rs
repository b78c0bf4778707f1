//! Knowledge base management and retrieval-augmented answering.
//!
//! Documents are loaded with [`parser`], split by [`chunker`], embedded by an
//! [`EmbeddingProvider`] and stored in a per-base SQLite [`index`]. The
//! [`rag`] module answers questions on top of that store.

pub mod chunker;
pub mod config;
pub mod docgen;
pub mod embeddings;
pub mod index;
pub mod parser;
pub mod pdf_batch;
pub mod rag;
pub mod types;

pub use embeddings::{create_provider, EmbeddingConfig, EmbeddingProvider};
pub use types::{
    BaseStats, IngestOptions, IngestStats, KnowledgeBaseConfig, KnowledgeChunk, KnowledgeSource,
};

use chrono::Utc;
use docrag_core::{AppError, AppResult};
use docrag_llm::LlmRequest;
use docrag_prompt::BuiltPrompt;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

/// Completion request for a rendered prompt, carrying its sampling settings.
pub(crate) fn llm_request(built: BuiltPrompt, model: impl Into<String>) -> LlmRequest {
    let mut request = LlmRequest::new(built.user, model);
    if let Some(system) = built.system {
        request = request.with_system(system);
    }
    if let Some(temperature) = built.sampling.temperature {
        request = request.with_temperature(temperature);
    }
    if let Some(max_tokens) = built.sampling.max_tokens {
        request = request.with_max_tokens(max_tokens);
    }
    request
}

/// Ingest files and directories into a knowledge base.
///
/// Directories are walked recursively; hidden entries and unsupported file
/// types are ignored. A file whose path and content hash are already indexed
/// is skipped; a changed file replaces its previous chunks. Files that fail
/// to load or embed are logged and counted in [`IngestStats::failed_count`].
pub async fn ingest(
    workspace: &Path,
    options: IngestOptions,
    embedder: &dyn EmbeddingProvider,
) -> AppResult<IngestStats> {
    let start = Instant::now();

    tracing::info!(
        "Starting ingest for base '{}' ({} paths)",
        options.base_name,
        options.paths.len()
    );

    let mut kb_config = config::load_config(workspace, &options.base_name)?;
    let index_path = config::get_index_path(workspace, &options.base_name);
    let conn = index::init_index(&index_path)?;

    if options.reset {
        tracing::info!("Resetting knowledge base '{}'", options.base_name);
        index::reset_index(&conn)?;
    }

    let files = collect_files(&options.paths);
    tracing::debug!("Found {} candidate files", files.len());

    let mut stats = IngestStats::default();

    for path in files {
        let prepared = match prepare_file(&conn, &path, &kb_config) {
            Ok(Some(prepared)) => prepared,
            Ok(None) => {
                tracing::debug!("Skipping unchanged file {:?}", path);
                stats.skipped_count += 1;
                continue;
            }
            Err(e) => {
                tracing::warn!("Failed to load {:?}: {}", path, e);
                stats.failed_count += 1;
                continue;
            }
        };

        let embeddings = match embed_chunks(
            embedder,
            &prepared.chunks,
            kb_config.embedding.batch_size,
        )
        .await
        {
            Ok(embeddings) => embeddings,
            Err(e) => {
                tracing::warn!("Failed to embed {:?}: {}", path, e);
                stats.failed_count += 1;
                continue;
            }
        };

        let chunks_count = prepared.chunks.len() as u32;
        let bytes = prepared.source.size_bytes;
        if let Err(e) = store_file(&conn, prepared, embeddings) {
            tracing::warn!("Failed to store {:?}: {}", path, e);
            stats.failed_count += 1;
            continue;
        }

        stats.sources_count += 1;
        stats.chunks_count += chunks_count;
        stats.bytes_processed += bytes;
    }

    kb_config.embedding.provider = embedder.provider_name().to_string();
    kb_config.embedding.model = embedder.model_name().to_string();
    kb_config.embedding.dimensions = embedder.dimensions();
    config::save_config(workspace, &kb_config)?;

    stats.duration_secs = start.elapsed().as_secs_f64();

    tracing::info!(
        "Ingest completed: {} sources, {} skipped, {} failed, {} chunks, {} bytes in {:.2}s",
        stats.sources_count,
        stats.skipped_count,
        stats.failed_count,
        stats.chunks_count,
        stats.bytes_processed,
        stats.duration_secs
    );

    Ok(stats)
}

struct PreparedFile {
    source: KnowledgeSource,
    replaces: Option<String>,
    chunks: Vec<types::ChunkCandidate>,
}

/// Load and chunk one file. `None` means it is already indexed unchanged.
fn prepare_file(
    conn: &rusqlite::Connection,
    path: &Path,
    kb_config: &KnowledgeBaseConfig,
) -> AppResult<Option<PreparedFile>> {
    let text = parser::parse_file(path)?;
    let content_hash = content_hash(&text);

    let existing = index::find_source_by_path(conn, path)?;
    if let Some((_, hash)) = &existing {
        if *hash == content_hash {
            return Ok(None);
        }
    }

    let source = KnowledgeSource {
        id: uuid::Uuid::new_v4().to_string(),
        path: path.to_path_buf(),
        content_type: parser::ContentType::from_path(path).as_str().to_string(),
        content_hash,
        learned_at: Utc::now(),
        size_bytes: text.len() as u64,
    };

    let chunks = chunker::chunk_text(
        &source.id,
        &text,
        kb_config.chunk_size as usize,
        kb_config.chunk_overlap as usize,
    );

    Ok(Some(PreparedFile {
        source,
        replaces: existing.map(|(id, _)| id),
        chunks,
    }))
}

async fn embed_chunks(
    embedder: &dyn EmbeddingProvider,
    chunks: &[types::ChunkCandidate],
    batch_size: usize,
) -> AppResult<Vec<Vec<f32>>> {
    let mut embeddings = Vec::with_capacity(chunks.len());

    for batch in chunks.chunks(batch_size.max(1)) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let vectors = embedder.embed_batch(&texts).await?;
        if vectors.len() != texts.len() {
            return Err(AppError::Knowledge(format!(
                "Embedding count mismatch: sent {}, received {}",
                texts.len(),
                vectors.len()
            )));
        }
        embeddings.extend(vectors);
    }

    Ok(embeddings)
}

/// Write one file's source and chunks in a single transaction, so a failure
/// leaves any previous version of the file in place.
fn store_file(
    conn: &rusqlite::Connection,
    prepared: PreparedFile,
    embeddings: Vec<Vec<f32>>,
) -> AppResult<()> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| AppError::Knowledge(format!("Failed to begin transaction: {}", e)))?;

    if let Some(old_id) = &prepared.replaces {
        tracing::debug!("Replacing changed source {:?}", prepared.source.path);
        index::delete_source(&tx, old_id)?;
    }

    index::insert_source(&tx, &prepared.source)?;

    for (candidate, embedding) in prepared.chunks.into_iter().zip(embeddings) {
        let chunk = KnowledgeChunk {
            id: uuid::Uuid::new_v4().to_string(),
            source_id: candidate.source_id,
            position: candidate.position,
            text: candidate.text,
            embedding: Some(embedding),
            metadata: candidate.metadata,
        };
        index::insert_chunk(&tx, &chunk)?;
    }

    tx.commit()
        .map_err(|e| AppError::Knowledge(format!("Failed to commit transaction: {}", e)))
}

/// Expand the given paths into the supported, non-hidden files below them.
fn collect_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_file() {
            if parser::ContentType::from_path(path).is_supported() {
                files.push(path.clone());
            } else {
                tracing::debug!("Ignoring unsupported file {:?}", path);
            }
            continue;
        }

        if !path.is_dir() {
            tracing::warn!("Path does not exist: {:?}", path);
            continue;
        }

        let walker = WalkDir::new(path)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

        for entry in walker.filter_map(|e| e.ok()) {
            let entry_path = entry.path();
            if entry.file_type().is_file()
                && parser::ContentType::from_path(entry_path).is_supported()
            {
                files.push(entry_path.to_path_buf());
            }
        }
    }

    files
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

fn content_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Return the `top_k` chunks closest to `query`, best first.
pub async fn search(
    workspace: &Path,
    base_name: &str,
    query: &str,
    top_k: usize,
    embedder: &dyn EmbeddingProvider,
) -> AppResult<Vec<(KnowledgeChunk, f32)>> {
    tracing::info!("Searching knowledge base '{}'", base_name);

    let index_path = existing_index(workspace, base_name)?;
    let query_embedding = embedder.embed(query).await?;

    let conn = index::init_index(&index_path)?;
    index::query_chunks(&conn, &query_embedding, top_k)
}

/// Clean (reset) a knowledge base.
pub fn clean(workspace: &Path, base_name: &str) -> AppResult<()> {
    tracing::info!("Cleaning knowledge base '{}'", base_name);

    let index_path = existing_index(workspace, base_name)?;
    let conn = index::init_index(&index_path)?;
    index::reset_index(&conn)?;

    tracing::info!("Knowledge base '{}' cleaned", base_name);
    Ok(())
}

/// Get statistics for a knowledge base.
pub fn stats(workspace: &Path, base_name: &str) -> AppResult<BaseStats> {
    let index_path = existing_index(workspace, base_name)?;
    let conn = index::init_index(&index_path)?;
    let (sources_count, chunks_count) = index::get_stats(&conn)?;

    let db_size_bytes = std::fs::metadata(&index_path)
        .map(|m| m.len())
        .unwrap_or(0);

    Ok(BaseStats {
        base_name: base_name.to_string(),
        sources_count,
        chunks_count,
        db_size_bytes,
        last_learn_at: index::last_learned_at(&conn)?,
    })
}

fn existing_index(workspace: &Path, base_name: &str) -> AppResult<PathBuf> {
    let index_path = config::get_index_path(workspace, base_name);
    if !index_path.exists() {
        return Err(AppError::Knowledge(format!(
            "Knowledge base '{}' does not exist. Run 'docrag knowledge ingest' first.",
            base_name
        )));
    }
    Ok(index_path)
}
