//! Batch PDF to text conversion.

use clap::Args;
use docrag_core::{config::AppConfig, AppResult};
use docrag_knowledge::pdf_batch::{
    convert_directory, PdfBatchOptions, PdfTextExtractor, Restructurer, DEFAULT_WORKERS,
};
use docrag_llm::create_client_from_config;
use docrag_prompt::{defaults, load_prompt};
use std::path::PathBuf;
use std::sync::Arc;

/// Convert every PDF in a directory to a text file
#[derive(Args, Debug)]
pub struct ConvertPdfsCommand {
    /// Directory containing PDF files
    pub input: PathBuf,

    /// Directory for the text files
    pub output: PathBuf,

    /// Number of files converted concurrently
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// Restructure the extracted text with the LLM
    #[arg(long)]
    pub restructure: bool,
}

impl ConvertPdfsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let options = PdfBatchOptions {
            input_dir: self.input.clone(),
            output_dir: self.output.clone(),
            workers: self.workers,
        };

        let restructurer = if self.restructure {
            let llm = create_client_from_config(config)?;
            let prompt = load_prompt(&config.workspace, defaults::PDF_RESTRUCTURE)?;
            Some(Arc::new(Restructurer::new(llm, config.model.clone(), prompt)))
        } else {
            None
        };

        let report = convert_directory(&options, Arc::new(PdfTextExtractor), restructurer).await?;

        for path in &report.converted {
            println!("Converted {}", path.display());
        }
        for (path, reason) in &report.failed {
            eprintln!("Failed {}: {}", path.display(), reason);
        }
        println!(
            "{} converted, {} failed",
            report.converted.len(),
            report.failed.len()
        );

        Ok(())
    }
}
