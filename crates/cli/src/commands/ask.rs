//! Ask command handler.

use clap::Args;
use docrag_core::{config::AppConfig, AppResult};
use docrag_knowledge::rag::AskPipeline;

/// Answer one question from the knowledge base
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Number of chunks to retrieve (overrides rag.topK)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");

        let mut pipeline = AskPipeline::from_config(config)?;
        if let Some(top_k) = self.top_k {
            pipeline = pipeline.with_top_k(top_k);
        }

        let answer = pipeline.ask(&self.question).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&answer)?);
        } else {
            if answer.cached {
                tracing::info!("Answer served from cache");
            }
            println!("{}", answer.answer);
        }

        Ok(())
    }
}
