//! Documentation generation command.

use clap::Args;
use docrag_core::{config::AppConfig, AppResult};
use docrag_knowledge::docgen::{
    generate_docs, summarize_directory, DocgenOptions, DocgenReport, DEFAULT_BATCH_SIZE,
};
use docrag_llm::create_client_from_config;
use docrag_prompt::{defaults, load_prompt};
use std::path::PathBuf;

/// Generate documentation for a project with the LLM
#[derive(Args, Debug)]
pub struct DocgenCommand {
    /// Project directory (or text directory with --summary)
    pub dir: PathBuf,

    /// Overwrite source files with the documented versions
    #[arg(long, conflicts_with = "summary")]
    pub write_back: bool,

    /// Files sent per LLM request
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Summarize the .txt files of the directory into SUMMARY.txt instead
    #[arg(long)]
    pub summary: bool,
}

impl DocgenCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        if self.summary {
            let llm = create_client_from_config(config)?;
            let prompt = load_prompt(&config.workspace, defaults::DOCGEN_SUMMARY)?;
            match summarize_directory(&self.dir, llm.as_ref(), &config.model, &prompt).await? {
                Some(path) => println!("Summary written to {}", path.display()),
                None => println!("No text files to summarize in {}", self.dir.display()),
            }
            return Ok(());
        }

        let options = DocgenOptions {
            project_dir: self.dir.clone(),
            batch_size: self.batch_size,
            write_back: self.write_back,
        };
        let report = run_docgen(config, &options).await?;

        println!(
            "Documented {}/{} files in {} batches ({} failed)",
            report.files_documented, report.files_total, report.batches, report.batches_failed
        );
        if let Some(path) = &report.document_path {
            println!("Project document: {}", path.display());
        }

        Ok(())
    }
}

pub(crate) async fn run_docgen(
    config: &AppConfig,
    options: &DocgenOptions,
) -> AppResult<DocgenReport> {
    let llm = create_client_from_config(config)?;
    let prompt = load_prompt(&config.workspace, defaults::DOCGEN_DOCUMENT)?;
    generate_docs(options, llm.as_ref(), &config.model, &prompt).await
}

