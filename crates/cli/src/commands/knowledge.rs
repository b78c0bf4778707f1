//! Knowledge command handler.
//!
//! Handles local knowledge base management.

use clap::{Args, Subcommand};
use docrag_core::{config::AppConfig, AppResult};
use docrag_knowledge::{create_provider, EmbeddingConfig, IngestOptions, IngestStats};
use std::path::PathBuf;

/// Knowledge base management
#[derive(Args, Debug)]
pub struct KnowledgeCommand {
    #[command(subcommand)]
    pub action: KnowledgeAction,
}

#[derive(Subcommand, Debug)]
pub enum KnowledgeAction {
    /// Ingest files and directories
    Ingest(KnowledgeIngestCommand),
    /// Show the chunks closest to a query
    Search(KnowledgeSearchCommand),
    /// Show knowledge base statistics
    Stats(KnowledgeStatsCommand),
    /// Remove every source and chunk
    Clean(KnowledgeCleanCommand),
}

/// Ingest documents
#[derive(Args, Debug)]
pub struct KnowledgeIngestCommand {
    /// Knowledge base name
    pub base: String,

    /// Files or directories to ingest
    #[arg(long, required = true)]
    pub path: Vec<PathBuf>,

    /// Embedding provider to record for this base (ollama, mock)
    #[arg(long)]
    pub embedder: Option<String>,

    /// Reset base before ingesting
    #[arg(long)]
    pub reset: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl KnowledgeIngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing knowledge ingest command for base '{}'", self.base);

        let options = IngestOptions {
            base_name: self.base.clone(),
            paths: self.path.clone(),
            reset: self.reset,
        };

        let stats = ingest(config, options, self.embedder.as_deref()).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            println!(
                "Ingested {} sources ({} chunks, {} bytes) in {:.2}s; {} unchanged, {} failed",
                stats.sources_count,
                stats.chunks_count,
                stats.bytes_processed,
                stats.duration_secs,
                stats.skipped_count,
                stats.failed_count
            );
        }

        Ok(())
    }
}

/// Ingest with the embedder configured for the base, optionally switching
/// provider first.
pub(crate) async fn ingest(
    config: &AppConfig,
    options: IngestOptions,
    embedder: Option<&str>,
) -> AppResult<IngestStats> {
    let mut kb_config = docrag_knowledge::config::load_config(&config.workspace, &options.base_name)?;

    match embedder {
        Some("mock") => kb_config.embedding = EmbeddingConfig::mock(kb_config.embedding.dimensions),
        Some(provider) => kb_config.embedding.provider = provider.to_string(),
        None => {}
    }

    let provider = create_provider(&kb_config.embedding)?;
    docrag_knowledge::ingest(&config.workspace, options, provider.as_ref()).await
}

/// Search the knowledge base without calling the LLM
#[derive(Args, Debug)]
pub struct KnowledgeSearchCommand {
    /// Knowledge base name
    pub base: String,

    /// Query text
    pub query: String,

    /// Number of chunks to retrieve
    #[arg(short = 'k', long, default_value = "3")]
    pub top_k: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl KnowledgeSearchCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing knowledge search command for base '{}'", self.base);

        let kb_config = docrag_knowledge::config::load_config(&config.workspace, &self.base)?;
        let provider = create_provider(&kb_config.embedding)?;
        let results = docrag_knowledge::search(
            &config.workspace,
            &self.base,
            &self.query,
            self.top_k,
            provider.as_ref(),
        )
        .await?;

        if self.json {
            let output: Vec<_> = results
                .iter()
                .map(|(chunk, score)| {
                    serde_json::json!({
                        "sourceId": chunk.source_id,
                        "position": chunk.position,
                        "score": score,
                        "text": chunk.text,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else if results.is_empty() {
            println!("No chunks found");
        } else {
            for (i, (chunk, score)) in results.iter().enumerate() {
                println!("[{}] score {:.3}", i + 1, score);
                println!("{}\n", chunk.text);
            }
        }

        Ok(())
    }
}

/// Clean knowledge base
#[derive(Args, Debug)]
pub struct KnowledgeCleanCommand {
    /// Knowledge base name
    pub base: String,
}

impl KnowledgeCleanCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing knowledge clean command for base '{}'", self.base);

        docrag_knowledge::clean(&config.workspace, &self.base)?;

        println!("Knowledge base '{}' cleaned", self.base);

        Ok(())
    }
}

/// Show knowledge base stats
#[derive(Args, Debug)]
pub struct KnowledgeStatsCommand {
    /// Knowledge base name
    pub base: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl KnowledgeStatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing knowledge stats command for base '{}'", self.base);

        let stats = docrag_knowledge::stats(&config.workspace, &self.base)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            println!("Knowledge base: {}", stats.base_name);
            println!("  Sources: {}", stats.sources_count);
            println!("  Chunks: {}", stats.chunks_count);
            println!("  DB size: {} bytes", stats.db_size_bytes);
            if let Some(last_learn) = stats.last_learn_at {
                println!("  Last ingest: {}", last_learn);
            }
        }

        Ok(())
    }
}

impl KnowledgeCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        match &self.action {
            KnowledgeAction::Ingest(cmd) => cmd.execute(config).await,
            KnowledgeAction::Search(cmd) => cmd.execute(config).await,
            KnowledgeAction::Stats(cmd) => cmd.execute(config).await,
            KnowledgeAction::Clean(cmd) => cmd.execute(config).await,
        }
    }
}
