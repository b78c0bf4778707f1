//! SQLite-backed vector store for knowledge chunks.
//!
//! Embeddings are stored as little-endian `f32` blobs and searched with a
//! full scan ranked by cosine similarity.

use crate::types::{KnowledgeChunk, KnowledgeSource};
use chrono::{DateTime, Utc};
use docrag_core::{AppError, AppResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Open (creating if needed) the SQLite index database.
pub fn init_index(db_path: &Path) -> AppResult<Connection> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| AppError::Knowledge(format!("Failed to create index directory: {}", e)))?;
    }

    let conn = Connection::open(db_path)
        .map_err(|e| AppError::Knowledge(format!("Failed to open SQLite index: {}", e)))?;

    create_schema(&conn)?;
    tracing::debug!("Initialized SQLite index at {:?}", db_path);
    Ok(conn)
}

/// In-memory index, for tests.
pub fn init_memory_index() -> AppResult<Connection> {
    let conn = Connection::open_in_memory()
        .map_err(|e| AppError::Knowledge(format!("Failed to open SQLite index: {}", e)))?;
    create_schema(&conn)?;
    Ok(conn)
}

fn create_schema(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS sources (
            id TEXT PRIMARY KEY,
            path TEXT NOT NULL,
            content_type TEXT NOT NULL,
            content_hash TEXT NOT NULL,
            learned_at TEXT NOT NULL,
            size_bytes INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS chunks (
            id TEXT PRIMARY KEY,
            source_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            text TEXT NOT NULL,
            embedding BLOB NOT NULL,
            metadata TEXT,
            FOREIGN KEY (source_id) REFERENCES sources(id)
        );

        CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source_id);
        CREATE INDEX IF NOT EXISTS idx_sources_path ON sources(path);
        "#,
    )
    .map_err(|e| AppError::Knowledge(format!("Failed to create tables: {}", e)))
}

/// Insert a source into the index.
pub fn insert_source(conn: &Connection, source: &KnowledgeSource) -> AppResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO sources (id, path, content_type, content_hash, learned_at, size_bytes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            source.id,
            source.path.to_string_lossy(),
            source.content_type,
            source.content_hash,
            source.learned_at.to_rfc3339(),
            source.size_bytes as i64,
        ],
    )
    .map_err(|e| AppError::Knowledge(format!("Failed to insert source: {}", e)))?;

    Ok(())
}

/// Look up the indexed source for a path: `(source_id, content_hash)`.
pub fn find_source_by_path(conn: &Connection, path: &Path) -> AppResult<Option<(String, String)>> {
    conn.query_row(
        "SELECT id, content_hash FROM sources WHERE path = ?1",
        params![path.to_string_lossy()],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .optional()
    .map_err(|e| AppError::Knowledge(format!("Failed to look up source: {}", e)))
}

/// Delete a source and all of its chunks.
pub fn delete_source(conn: &Connection, source_id: &str) -> AppResult<()> {
    conn.execute("DELETE FROM chunks WHERE source_id = ?1", params![source_id])
        .map_err(|e| AppError::Knowledge(format!("Failed to delete chunks: {}", e)))?;
    conn.execute("DELETE FROM sources WHERE id = ?1", params![source_id])
        .map_err(|e| AppError::Knowledge(format!("Failed to delete source: {}", e)))?;
    Ok(())
}

/// Insert a chunk with embedding into the index.
pub fn insert_chunk(conn: &Connection, chunk: &KnowledgeChunk) -> AppResult<()> {
    let embedding = chunk
        .embedding
        .as_ref()
        .ok_or_else(|| AppError::Knowledge("Chunk missing embedding".to_string()))?;

    let metadata_json = serde_json::to_string(&chunk.metadata)?;

    conn.execute(
        "INSERT OR REPLACE INTO chunks (id, source_id, position, text, embedding, metadata)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            chunk.id,
            chunk.source_id,
            chunk.position as i64,
            chunk.text,
            embedding_to_bytes(embedding),
            metadata_json,
        ],
    )
    .map_err(|e| AppError::Knowledge(format!("Failed to insert chunk: {}", e)))?;

    Ok(())
}

/// Return the `top_k` chunks most similar to `query_embedding`, best first.
///
/// No score threshold is applied.
pub fn query_chunks(
    conn: &Connection,
    query_embedding: &[f32],
    top_k: usize,
) -> AppResult<Vec<(KnowledgeChunk, f32)>> {
    let mut stmt = conn
        .prepare("SELECT id, source_id, position, text, embedding, metadata FROM chunks")
        .map_err(|e| AppError::Knowledge(format!("Failed to prepare query: {}", e)))?;

    let rows = stmt
        .query_map([], |row| {
            let embedding_bytes: Vec<u8> = row.get(4)?;
            let metadata_json: Option<String> = row.get(5)?;
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                embedding_bytes,
                metadata_json,
            ))
        })
        .map_err(|e| AppError::Knowledge(format!("Failed to query chunks: {}", e)))?;

    let mut results = Vec::new();
    for row in rows {
        let (id, source_id, position, text, embedding_bytes, metadata_json) =
            row.map_err(|e| AppError::Knowledge(format!("Failed to read chunk: {}", e)))?;

        let embedding = bytes_to_embedding(&embedding_bytes)?;
        let score = cosine_similarity(query_embedding, &embedding);
        let metadata = match metadata_json {
            Some(json) => serde_json::from_str(&json)?,
            None => serde_json::Value::Null,
        };

        results.push((
            KnowledgeChunk {
                id,
                source_id,
                position: position as u32,
                text,
                embedding: Some(embedding),
                metadata,
            },
            score,
        ));
    }

    results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    results.truncate(top_k);

    tracing::debug!(
        "Retrieved {} chunks (requested top-{})",
        results.len(),
        top_k
    );

    Ok(results)
}

/// Count sources and chunks.
pub fn get_stats(conn: &Connection) -> AppResult<(u32, u32)> {
    let count = |sql: &str| -> AppResult<u32> {
        conn.query_row(sql, [], |row| row.get::<_, i64>(0).map(|v| v as u32))
            .map_err(|e| AppError::Knowledge(format!("Failed to count rows: {}", e)))
    };

    Ok((
        count("SELECT COUNT(*) FROM sources")?,
        count("SELECT COUNT(*) FROM chunks")?,
    ))
}

/// Most recent `learned_at` over all sources.
pub fn last_learned_at(conn: &Connection) -> AppResult<Option<DateTime<Utc>>> {
    let latest: Option<String> = conn
        .query_row("SELECT MAX(learned_at) FROM sources", [], |row| row.get(0))
        .map_err(|e| AppError::Knowledge(format!("Failed to read sources: {}", e)))?;

    Ok(latest
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc)))
}

/// Delete all data.
pub fn reset_index(conn: &Connection) -> AppResult<()> {
    conn.execute_batch("DELETE FROM chunks; DELETE FROM sources;")
        .map_err(|e| AppError::Knowledge(format!("Failed to reset index: {}", e)))?;

    tracing::info!("Reset knowledge base index");
    Ok(())
}

fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Knowledge(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Cosine similarity; 0.0 for mismatched lengths or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    fn source(id: &str, path: &str, hash: &str) -> KnowledgeSource {
        KnowledgeSource {
            id: id.to_string(),
            path: PathBuf::from(path),
            content_type: "text".to_string(),
            content_hash: hash.to_string(),
            learned_at: Utc::now(),
            size_bytes: 100,
        }
    }

    fn chunk(id: &str, source_id: &str, text: &str, embedding: Vec<f32>) -> KnowledgeChunk {
        KnowledgeChunk {
            id: id.to_string(),
            source_id: source_id.to_string(),
            position: 0,
            text: text.to_string(),
            embedding: Some(embedding),
            metadata: serde_json::json!({"start": 0, "end": text.len()}),
        }
    }

    #[test]
    fn test_init_index_on_disk() {
        let temp_file = NamedTempFile::new().unwrap();
        let conn = init_index(temp_file.path()).unwrap();

        let table_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table'",
                [],
                |row| row.get(0),
            )
            .unwrap();

        assert!(table_count >= 2);
    }

    #[test]
    fn test_query_ranks_by_similarity_without_threshold() {
        let conn = init_memory_index().unwrap();
        insert_source(&conn, &source("s1", "/docs/a.txt", "h")).unwrap();
        insert_chunk(&conn, &chunk("c1", "s1", "close", vec![1.0, 0.1, 0.0])).unwrap();
        insert_chunk(&conn, &chunk("c2", "s1", "far", vec![0.0, 0.0, 1.0])).unwrap();
        insert_chunk(&conn, &chunk("c3", "s1", "exact", vec![1.0, 0.0, 0.0])).unwrap();

        let results = query_chunks(&conn, &[1.0, 0.0, 0.0], 5).unwrap();
        let ids: Vec<&str> = results.iter().map(|(c, _)| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c3", "c1", "c2"]);
        assert!(results[2].1.abs() < 0.001);

        let top_two = query_chunks(&conn, &[1.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(top_two.len(), 2);
    }

    #[test]
    fn test_find_and_delete_source() {
        let conn = init_memory_index().unwrap();
        insert_source(&conn, &source("s1", "/docs/a.txt", "abc")).unwrap();
        insert_chunk(&conn, &chunk("c1", "s1", "text", vec![1.0])).unwrap();

        let found = find_source_by_path(&conn, Path::new("/docs/a.txt")).unwrap();
        assert_eq!(found, Some(("s1".to_string(), "abc".to_string())));
        assert!(find_source_by_path(&conn, Path::new("/docs/b.txt"))
            .unwrap()
            .is_none());

        delete_source(&conn, "s1").unwrap();
        assert_eq!(get_stats(&conn).unwrap(), (0, 0));
    }

    #[test]
    fn test_reset_and_last_learned() {
        let conn = init_memory_index().unwrap();
        assert!(last_learned_at(&conn).unwrap().is_none());

        insert_source(&conn, &source("s1", "/a", "h")).unwrap();
        assert!(last_learned_at(&conn).unwrap().is_some());

        reset_index(&conn).unwrap();
        assert_eq!(get_stats(&conn).unwrap(), (0, 0));
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 0.001);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 0.001);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
