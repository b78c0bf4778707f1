//! Answer cache keyed by normalized question.
//!
//! Entries live in memory and, for a persistent cache, in a SQLite table
//! `qa_cache`. Writes go to SQLite first and then to memory, both under the
//! same lock.

use chrono::Utc;
use docrag_core::{AppError, AppResult};
use rusqlite::{params, Connection};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Cache key for a question: trimmed and lower-cased.
pub fn normalize_question(question: &str) -> String {
    question.trim().to_lowercase()
}

struct CacheInner {
    entries: HashMap<String, String>,
    conn: Option<Connection>,
}

/// Question to answer cache.
pub struct AnswerCache {
    inner: Mutex<CacheInner>,
}

impl AnswerCache {
    /// Open a persistent cache, loading every stored entry.
    pub fn open(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path).map_err(cache_error)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS qa_cache (
                question TEXT PRIMARY KEY,
                answer TEXT NOT NULL,
                created_at TEXT NOT NULL
            );",
        )
        .map_err(cache_error)?;

        let entries = load_entries(&conn)?;
        tracing::debug!("Loaded {} cached answers from {:?}", entries.len(), path);

        Ok(Self {
            inner: Mutex::new(CacheInner {
                entries,
                conn: Some(conn),
            }),
        })
    }

    /// A cache that is never persisted.
    pub fn in_memory() -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                conn: None,
            }),
        }
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, CacheInner>> {
        self.inner
            .lock()
            .map_err(|_| AppError::Cache("Cache lock poisoned".to_string()))
    }

    pub fn lookup(&self, question: &str) -> AppResult<Option<String>> {
        let key = normalize_question(question);
        Ok(self.lock()?.entries.get(&key).cloned())
    }

    /// Insert or replace the answer for `question`.
    pub fn store(&self, question: &str, answer: &str) -> AppResult<()> {
        let key = normalize_question(question);
        let mut inner = self.lock()?;

        if let Some(conn) = &inner.conn {
            conn.execute(
                "INSERT OR REPLACE INTO qa_cache (question, answer, created_at) VALUES (?1, ?2, ?3)",
                params![key, answer, Utc::now().to_rfc3339()],
            )
            .map_err(cache_error)?;
        }

        inner.entries.insert(key, answer.to_string());
        Ok(())
    }

    /// Remove every entry, persisted ones included.
    pub fn clear(&self) -> AppResult<()> {
        let mut inner = self.lock()?;

        if let Some(conn) = &inner.conn {
            conn.execute("DELETE FROM qa_cache", [])
                .map_err(cache_error)?;
        }

        inner.entries.clear();
        tracing::info!("Answer cache cleared");
        Ok(())
    }

    /// Snapshot of all entries, sorted by question.
    pub fn entries(&self) -> AppResult<BTreeMap<String, String>> {
        Ok(self
            .lock()?
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    pub fn len(&self) -> AppResult<usize> {
        Ok(self.lock()?.entries.len())
    }

    pub fn is_empty(&self) -> AppResult<bool> {
        Ok(self.len()? == 0)
    }
}

fn load_entries(conn: &Connection) -> AppResult<HashMap<String, String>> {
    let mut stmt = conn
        .prepare("SELECT question, answer FROM qa_cache")
        .map_err(cache_error)?;

    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
        .map_err(cache_error)?;

    let mut entries = HashMap::new();
    for row in rows {
        let (question, answer) = row.map_err(cache_error)?;
        entries.insert(normalize_question(&question), answer);
    }

    Ok(entries)
}

fn cache_error(e: rusqlite::Error) -> AppError {
    AppError::Cache(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_lookup_is_case_and_whitespace_insensitive() {
        let cache = AnswerCache::in_memory();
        cache.store("  What is the Login endpoint? ", "POST /login").unwrap();

        assert_eq!(
            cache.lookup("what is the login endpoint?").unwrap().as_deref(),
            Some("POST /login")
        );
        assert!(cache.lookup("something else").unwrap().is_none());
    }

    #[test]
    fn test_store_replaces_existing_answer() {
        let cache = AnswerCache::in_memory();
        cache.store("q", "old").unwrap();
        cache.store("Q", "new").unwrap();

        assert_eq!(cache.len().unwrap(), 1);
        assert_eq!(cache.lookup("q").unwrap().as_deref(), Some("new"));
    }

    #[test]
    fn test_entries_persist_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.sqlite");

        {
            let cache = AnswerCache::open(&path).unwrap();
            cache.store("What is X?", "X is a thing").unwrap();
        }

        let reopened = AnswerCache::open(&path).unwrap();
        assert_eq!(
            reopened.lookup("what is x?").unwrap().as_deref(),
            Some("X is a thing")
        );
        assert_eq!(reopened.entries().unwrap().len(), 1);
    }

    #[test]
    fn test_clear_empties_memory_and_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.sqlite");

        let cache = AnswerCache::open(&path).unwrap();
        cache.store("a", "1").unwrap();
        cache.store("b", "2").unwrap();
        cache.clear().unwrap();

        assert!(cache.lookup("a").unwrap().is_none());
        assert!(cache.is_empty().unwrap());
        drop(cache);

        let reopened = AnswerCache::open(&path).unwrap();
        assert!(reopened.lookup("a").unwrap().is_none());
        assert!(reopened.is_empty().unwrap());
    }

    #[test]
    fn test_keys_are_normalized_on_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.sqlite");

        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE qa_cache (question TEXT PRIMARY KEY, answer TEXT NOT NULL, created_at TEXT NOT NULL);
                 INSERT INTO qa_cache VALUES ('Mixed Case Question', 'answer', '2024-01-01T00:00:00Z');",
            )
            .unwrap();
        }

        let cache = AnswerCache::open(&path).unwrap();
        assert_eq!(
            cache.lookup("mixed case question").unwrap().as_deref(),
            Some("answer")
        );
    }
}
