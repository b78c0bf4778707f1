//! Append-only log of prompts sent to the LLM.

use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

const SEPARATOR_WIDTH: usize = 40;

/// Writes each answer prompt to a text file, separated by a rule and a
/// timestamp. Write failures are logged and otherwise ignored.
#[derive(Debug, Clone)]
pub struct PromptAuditLog {
    path: PathBuf,
}

impl PromptAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self, prompt: &str) {
        if let Err(e) = self.append(prompt) {
            tracing::warn!("Failed to write prompt log {:?}: {}", self.path, e);
        }
    }

    fn append(&self, prompt: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        write!(
            file,
            "\n{}\nPROMPT TIME: {}\n{}",
            "=".repeat(SEPARATOR_WIDTH),
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            prompt
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_record_appends_entries() {
        let dir = TempDir::new().unwrap();
        let log = PromptAuditLog::new(dir.path().join("logs").join("prompts.log"));

        log.record("first prompt");
        log.record("second prompt");

        let contents = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(contents.matches("PROMPT TIME: ").count(), 2);
        assert!(contents.starts_with(&format!("\n{}\n", "=".repeat(40))));
        assert!(contents.ends_with("second prompt"));
    }

    #[test]
    fn test_record_failure_is_ignored() {
        let dir = TempDir::new().unwrap();
        // A directory cannot be opened for appending
        let log = PromptAuditLog::new(dir.path());
        log.record("dropped");
    }
}
