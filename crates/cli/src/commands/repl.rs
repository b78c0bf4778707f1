//! Interactive question loop.
//!
//! Besides questions, a line may be a directive:
//! - `NEWPROJECT:<dir>` documents `<dir>`, copies its project document into
//!   the docs directory and re-ingests the docs directory
//! - `NEWDOCS:` re-ingests the docs directory
//! - `exit` leaves the loop

use crate::commands::{docgen::run_docgen, knowledge::ingest};
use clap::Args;
use docrag_core::{config::AppConfig, AppError, AppResult};
use docrag_knowledge::docgen::{DocgenOptions, DOCUMENT_NAME};
use docrag_knowledge::rag::AskPipeline;
use docrag_knowledge::IngestOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Interactive question loop
#[derive(Args, Debug)]
pub struct ReplCommand {}

#[derive(Debug, PartialEq, Eq)]
enum Directive {
    Exit,
    NewProject(PathBuf),
    NewDocs,
    Question(String),
    Empty,
}

fn parse_line(line: &str) -> Directive {
    let line = line.trim();
    if line.is_empty() {
        Directive::Empty
    } else if line.eq_ignore_ascii_case("exit") {
        Directive::Exit
    } else if let Some(dir) = line.strip_prefix("NEWPROJECT:") {
        Directive::NewProject(PathBuf::from(dir.trim()))
    } else if line.starts_with("NEWDOCS:") {
        Directive::NewDocs
    } else {
        Directive::Question(line.to_string())
    }
}

impl ReplCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let pipeline = AskPipeline::from_config(config)?;
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            print!("\nQuestion: ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };

            let result = match parse_line(&line) {
                Directive::Empty => continue,
                Directive::Exit => break,
                Directive::NewProject(dir) => new_project(config, &dir).await,
                Directive::NewDocs => reingest_docs(config).await,
                Directive::Question(question) => pipeline
                    .ask(&question)
                    .await
                    .map(|answer| println!("\nAnswer: {}", answer.answer)),
            };

            if let Err(e) = result {
                println!("\nError: {}", e);
            }
        }

        Ok(())
    }
}

async fn new_project(config: &AppConfig, dir: &Path) -> AppResult<()> {
    if !dir.is_dir() {
        return Err(AppError::Other(format!("Invalid directory: {}", dir.display())));
    }
    println!("Set new project directory: {}", dir.display());

    let report = run_docgen(config, &DocgenOptions::new(dir)).await?;
    let document = report.document_path.ok_or_else(|| {
        AppError::Other(format!("No {} was generated for {}", DOCUMENT_NAME, dir.display()))
    })?;

    let docs_dir = config.docs_dir();
    tokio::fs::create_dir_all(&docs_dir).await?;
    let target = docs_dir.join(docs_file_name(dir));
    tokio::fs::copy(&document, &target).await?;
    println!("Copied project document to {}", target.display());

    reingest_docs(config).await
}

/// Name of the copied project document, unique per project directory.
fn docs_file_name(project_dir: &Path) -> String {
    let project = project_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string());
    format!("{}_{}", project, DOCUMENT_NAME)
}

async fn reingest_docs(config: &AppConfig) -> AppResult<()> {
    let options = IngestOptions {
        base_name: config.rag.knowledge_base.clone(),
        paths: vec![config.docs_dir()],
        reset: false,
    };

    let stats = ingest(config, options, None).await?;
    println!(
        "Re-ingested docs: {} new or changed, {} unchanged, {} failed",
        stats.sources_count, stats.skipped_count, stats.failed_count
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_directives() {
        assert_eq!(parse_line("  exit "), Directive::Exit);
        assert_eq!(parse_line("EXIT"), Directive::Exit);
        assert_eq!(parse_line("NEWDOCS:"), Directive::NewDocs);
        assert_eq!(
            parse_line("NEWPROJECT: /tmp/project "),
            Directive::NewProject(PathBuf::from("/tmp/project"))
        );
        assert_eq!(parse_line("   "), Directive::Empty);
        assert_eq!(
            parse_line("What is the login endpoint?"),
            Directive::Question("What is the login endpoint?".to_string())
        );
    }

    #[test]
    fn test_docs_file_name() {
        assert_eq!(
            docs_file_name(Path::new("/home/me/shop-api")),
            "shop-api_DOCGEN_DOCUMENT.md"
        );
    }
}
