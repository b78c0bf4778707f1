//! Batch conversion of a directory of PDFs into text files.
//!
//! Extraction is CPU bound and runs on the blocking thread pool, at most
//! `workers` files at a time. Every file succeeds or fails on its own.

use crate::parser::{extract_pdf_pages, format_pages};
use docrag_core::{AppError, AppResult};
use docrag_llm::LlmClient;
use docrag_prompt::{build_prompt, PromptDefinition};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default number of concurrent conversions.
pub const DEFAULT_WORKERS: usize = 3;

/// Page-wise text extraction from a document.
pub trait TextExtractor: Send + Sync {
    fn extract_pages(&self, path: &Path) -> AppResult<Vec<String>>;
}

/// [`TextExtractor`] backed by `pdf-extract`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract_pages(&self, path: &Path) -> AppResult<Vec<String>> {
        extract_pdf_pages(path)
    }
}

/// Passes extracted text through the LLM before it is written.
pub struct Restructurer {
    llm: Arc<dyn LlmClient>,
    model: String,
    prompt: PromptDefinition,
}

impl Restructurer {
    pub fn new(llm: Arc<dyn LlmClient>, model: impl Into<String>, prompt: PromptDefinition) -> Self {
        Self {
            llm,
            model: model.into(),
            prompt,
        }
    }

    pub async fn restructure(&self, content: &str) -> AppResult<String> {
        let mut vars = HashMap::new();
        vars.insert("content".to_string(), content.to_string());
        let built = build_prompt(&self.prompt, vars, None)?;

        let request = crate::llm_request(built, self.model.clone());

        let response = self.llm.complete(&request).await?;
        Ok(response.content)
    }
}

#[derive(Debug, Clone)]
pub struct PdfBatchOptions {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub workers: usize,
}

impl PdfBatchOptions {
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            workers: DEFAULT_WORKERS,
        }
    }
}

/// Outcome of a batch conversion.
#[derive(Debug, Default)]
pub struct PdfBatchReport {
    /// Written text files
    pub converted: Vec<PathBuf>,
    /// Input files that failed, with the reason
    pub failed: Vec<(PathBuf, String)>,
}

/// Convert every `*.pdf` directly inside `input_dir` into `<stem>.txt` in
/// `output_dir`.
pub async fn convert_directory(
    options: &PdfBatchOptions,
    extractor: Arc<dyn TextExtractor>,
    restructurer: Option<Arc<Restructurer>>,
) -> AppResult<PdfBatchReport> {
    let inputs = list_pdfs(&options.input_dir)?;
    tokio::fs::create_dir_all(&options.output_dir).await?;

    tracing::info!(
        "Converting {} PDFs from {:?} with {} workers",
        inputs.len(),
        options.input_dir,
        options.workers.max(1)
    );

    let results: Vec<(PathBuf, AppResult<PathBuf>)> = stream::iter(inputs)
        .map(|input| {
            let extractor = extractor.clone();
            let restructurer = restructurer.clone();
            let output_dir = options.output_dir.clone();
            async move {
                let result =
                    convert_file(&input, &output_dir, extractor, restructurer.as_deref()).await;
                (input, result)
            }
        })
        .buffer_unordered(options.workers.max(1))
        .collect()
        .await;

    let mut report = PdfBatchReport::default();
    for (input, result) in results {
        match result {
            Ok(output) => {
                tracing::info!("Converted {:?} -> {:?}", input, output);
                report.converted.push(output);
            }
            Err(e) => {
                tracing::error!("Failed to convert {:?}: {}", input, e);
                report.failed.push((input, e.to_string()));
            }
        }
    }

    report.converted.sort();
    report.failed.sort_by(|a, b| a.0.cmp(&b.0));

    tracing::info!(
        "PDF conversion finished: {} converted, {} failed",
        report.converted.len(),
        report.failed.len()
    );
    Ok(report)
}

fn list_pdfs(dir: &Path) -> AppResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(AppError::Knowledge(format!(
            "Input directory does not exist: {:?}",
            dir
        )));
    }

    let mut pdfs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_pdf = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        if is_pdf && path.is_file() {
            pdfs.push(path);
        }
    }

    pdfs.sort();
    Ok(pdfs)
}

async fn convert_file(
    input: &Path,
    output_dir: &Path,
    extractor: Arc<dyn TextExtractor>,
    restructurer: Option<&Restructurer>,
) -> AppResult<PathBuf> {
    let path = input.to_path_buf();
    let pages = tokio::task::spawn_blocking(move || extractor.extract_pages(&path))
        .await
        .map_err(|e| AppError::Knowledge(format!("Extraction task failed: {}", e)))??;

    let mut text = format_pages(&pages);
    if text.trim().is_empty() {
        return Err(AppError::Knowledge("No text extracted".to_string()));
    }

    if let Some(restructurer) = restructurer {
        tracing::debug!("Restructuring {:?}", input);
        text = restructurer.restructure(&text).await?;
    }

    let stem = input
        .file_stem()
        .ok_or_else(|| AppError::Knowledge(format!("Invalid file name: {:?}", input)))?;
    let output = output_dir.join(format!("{}.txt", stem.to_string_lossy()));
    tokio::fs::write(&output, text).await?;

    Ok(output)
}
