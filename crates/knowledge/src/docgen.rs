//! LLM-generated source documentation and text summaries.
//!
//! [`generate_docs`] sends source files to the LLM in batches and asks for
//! every file back with documentation comments added, plus a running project
//! document (`DOCGEN_DOCUMENT.md`) that each batch extends. The reply uses
//! `=== FILENAME: path ===` section headers.

use docrag_core::{AppError, AppResult};
use docrag_llm::LlmClient;
use docrag_prompt::{build_prompt, PromptDefinition};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions of files sent for documentation.
pub const SOURCE_EXTENSIONS: &[&str] = &[
    "py", "js", "ts", "cpp", "c", "h", "java", "rb", "go", "rs", "cs", "md",
];

/// Name of the generated project document.
pub const DOCUMENT_NAME: &str = "DOCGEN_DOCUMENT.md";

/// Name of the file written by [`summarize_directory`].
pub const SUMMARY_NAME: &str = "SUMMARY.txt";

pub const DEFAULT_BATCH_SIZE: usize = 5;

const SECTION_PREFIX: &str = "=== FILENAME:";

#[derive(Debug, Clone)]
pub struct DocgenOptions {
    pub project_dir: PathBuf,
    /// Files per LLM request
    pub batch_size: usize,
    /// Overwrite source files with the documented versions
    pub write_back: bool,
}

impl DocgenOptions {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            write_back: false,
        }
    }
}

/// A source file gathered for documentation.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Path relative to the project, `/` separated
    pub relative: String,
    pub content: String,
}

/// How a file in the reply was matched to a gathered file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    ExactPath,
    SimilarPath,
    FileName,
    Unmatched,
}

#[derive(Debug, Clone)]
pub struct DocumentedFile {
    pub path: PathBuf,
    /// New content, or the original content when unmatched
    pub content: String,
    pub matched: MatchKind,
}

#[derive(Debug, Default)]
pub struct DocgenReport {
    pub files_total: usize,
    pub files_documented: usize,
    pub batches: usize,
    pub batches_failed: usize,
    /// Written project document, if the LLM produced one
    pub document_path: Option<PathBuf>,
}

/// Collect non-empty source files below `project_dir`, skipping hidden
/// entries and the generated project document.
pub fn gather_files(project_dir: &Path) -> AppResult<Vec<SourceFile>> {
    if !project_dir.is_dir() {
        return Err(AppError::Other(format!(
            "Not a directory: {:?}",
            project_dir
        )));
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(project_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.')
        });

    for entry in walker.filter_map(|e| e.ok()) {
        let path = entry.path();
        if !entry.file_type().is_file() || !has_source_extension(path) {
            continue;
        }
        if entry.file_name() == DOCUMENT_NAME {
            continue;
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!("Skipping {:?}: {}", path, e);
                continue;
            }
        };
        if content.trim().is_empty() {
            continue;
        }

        let relative = path
            .strip_prefix(project_dir)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");

        files.push(SourceFile {
            path: path.to_path_buf(),
            relative,
            content,
        });
    }

    tracing::info!("Found {} files to document in {:?}", files.len(), project_dir);
    Ok(files)
}

fn has_source_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SOURCE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Lower-case, `/` separated, without a leading `./` or project prefix.
fn normalize_path(raw: &str, project_prefix: &str) -> String {
    let mut path = raw.trim().replace('\\', "/").to_lowercase();
    if !project_prefix.is_empty() {
        if let Some(rest) = path.strip_prefix(project_prefix) {
            path = rest.trim_start_matches('/').to_string();
        }
    }
    path.trim_start_matches("./").to_string()
}

/// Split a reply into `(normalized path, content)` sections, in order.
pub fn parse_response(response: &str, project_dir: &Path) -> Vec<(String, String)> {
    let prefix = project_dir.to_string_lossy().replace('\\', "/").to_lowercase();
    let mut sections = Vec::new();
    let mut current: Option<(String, Vec<&str>)> = None;

    for line in response.lines() {
        if let Some(rest) = line.strip_prefix(SECTION_PREFIX) {
            if let Some((path, lines)) = current.take() {
                sections.push((path, lines.join("\n").trim().to_string()));
            }
            let raw = rest.split("===").next().unwrap_or("");
            current = Some((normalize_path(raw, &prefix), Vec::new()));
        } else if let Some((_, lines)) = current.as_mut() {
            lines.push(line);
        }
    }

    if let Some((path, lines)) = current {
        sections.push((path, lines.join("\n").trim().to_string()));
    }

    sections
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn parent(path: &str) -> &str {
    path.rsplit_once('/').map(|(p, _)| p).unwrap_or("")
}

/// Match reply sections back to the gathered files: exact relative path,
/// then the same file name in a related directory, then file name only.
pub fn match_files(originals: &[SourceFile], sections: &[(String, String)]) -> Vec<DocumentedFile> {
    originals
        .iter()
        .map(|orig| {
            let wanted = orig.relative.to_lowercase();
            let wanted_name = file_name(&wanted);
            let wanted_parent = parent(&wanted);

            let exact = sections
                .iter()
                .find(|(path, _)| *path == wanted)
                .map(|(_, c)| (c, MatchKind::ExactPath));

            let similar = || {
                sections
                    .iter()
                    .find(|(path, _)| {
                        let p = parent(path);
                        file_name(path) == wanted_name
                            && (wanted_parent.contains(p) || p.contains(wanted_parent))
                    })
                    .map(|(_, c)| (c, MatchKind::SimilarPath))
            };

            let by_name = || {
                sections
                    .iter()
                    .find(|(path, _)| file_name(path) == wanted_name)
                    .map(|(_, c)| (c, MatchKind::FileName))
            };

            match exact.or_else(similar).or_else(by_name) {
                Some((content, matched)) => {
                    if matched != MatchKind::ExactPath {
                        tracing::debug!("Matched {} by {:?}", orig.relative, matched);
                    }
                    DocumentedFile {
                        path: orig.path.clone(),
                        content: content.clone(),
                        matched,
                    }
                }
                None => {
                    tracing::warn!("File not returned by the LLM: {}", orig.relative);
                    DocumentedFile {
                        path: orig.path.clone(),
                        content: orig.content.clone(),
                        matched: MatchKind::Unmatched,
                    }
                }
            }
        })
        .collect()
}

fn render_files(files: &[SourceFile]) -> String {
    files
        .iter()
        .map(|f| format!("\n{} {} ===\n{}", SECTION_PREFIX, f.relative, f.content))
        .collect()
}

/// Document every source file of a project and write `DOCGEN_DOCUMENT.md`.
///
/// A batch whose LLM call fails is logged and skipped.
pub async fn generate_docs(
    options: &DocgenOptions,
    llm: &dyn LlmClient,
    model: &str,
    prompt: &PromptDefinition,
) -> AppResult<DocgenReport> {
    let files = gather_files(&options.project_dir)?;
    let mut report = DocgenReport {
        files_total: files.len(),
        ..Default::default()
    };

    if files.is_empty() {
        tracing::warn!("No source files found in {:?}", options.project_dir);
        return Ok(report);
    }

    let document_key = DOCUMENT_NAME.to_lowercase();
    let mut project_document = String::new();
    let batches: Vec<&[SourceFile]> = files.chunks(options.batch_size.max(1)).collect();
    report.batches = batches.len();

    for (i, batch) in batches.into_iter().enumerate() {
        tracing::info!(
            "Processing batch {}/{} ({} files)",
            i + 1,
            report.batches,
            batch.len()
        );

        let mut vars = HashMap::new();
        vars.insert("files".to_string(), render_files(batch));
        vars.insert("documentPath".to_string(), DOCUMENT_NAME.to_string());
        vars.insert("projectDocument".to_string(), project_document.clone());
        let built = build_prompt(prompt, vars, None)?;

        let request = crate::llm_request(built, model);

        let response = match llm.complete(&request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Batch {} failed, skipping: {}", i + 1, e);
                report.batches_failed += 1;
                continue;
            }
        };

        let sections = parse_response(&response.content, &options.project_dir);
        tracing::debug!("Reply contained {} sections", sections.len());

        for documented in match_files(batch, &sections) {
            if documented.matched == MatchKind::Unmatched {
                continue;
            }
            report.files_documented += 1;
            if options.write_back {
                tokio::fs::write(&documented.path, &documented.content).await?;
                tracing::info!("Updated {:?}", documented.path);
            }
        }

        if let Some((_, content)) = sections
            .iter()
            .find(|(path, _)| file_name(path) == document_key)
        {
            project_document = content.clone();
        }
    }

    if !project_document.trim().is_empty() {
        let path = options.project_dir.join(DOCUMENT_NAME);
        tokio::fs::write(&path, &project_document).await?;
        tracing::info!("Wrote project document {:?}", path);
        report.document_path = Some(path);
    }

    Ok(report)
}

/// Summarize every non-empty `.txt` file below `dir` into `dir/SUMMARY.txt`.
///
/// Returns `None` when there is nothing to summarize.
pub async fn summarize_directory(
    dir: &Path,
    llm: &dyn LlmClient,
    model: &str,
    prompt: &PromptDefinition,
) -> AppResult<Option<PathBuf>> {
    if !dir.is_dir() {
        return Err(AppError::Other(format!("Not a directory: {:?}", dir)));
    }

    let mut sections = Vec::new();
    for entry in WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        let is_txt = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("txt"))
            .unwrap_or(false);
        if !entry.file_type().is_file() || !is_txt || entry.file_name() == SUMMARY_NAME {
            continue;
        }

        match std::fs::read_to_string(path) {
            Ok(content) if !content.trim().is_empty() => sections.push(format!(
                "=== {} ===\n{}",
                entry.file_name().to_string_lossy(),
                content.trim()
            )),
            Ok(_) => {}
            Err(e) => tracing::warn!("Skipping {:?}: {}", path, e),
        }
    }

    if sections.is_empty() {
        tracing::warn!("No text files to summarize in {:?}", dir);
        return Ok(None);
    }

    tracing::info!("Summarizing {} text files", sections.len());

    let mut vars = HashMap::new();
    vars.insert("files".to_string(), sections.join("\n\n"));
    let built = build_prompt(prompt, vars, None)?;

    let request = crate::llm_request(built, model);
    let response = llm.complete(&request).await?;

    let output = dir.join(SUMMARY_NAME);
    tokio::fs::write(&output, response.content.trim()).await?;
    Ok(Some(output))
}
