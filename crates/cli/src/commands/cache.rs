//! Answer cache inspection.

use clap::{Args, Subcommand};
use docrag_core::{config::AppConfig, AppResult};
use docrag_knowledge::rag::AnswerCache;

/// Inspect or clear the answer cache
#[derive(Args, Debug)]
pub struct CacheCommand {
    #[command(subcommand)]
    pub action: CacheAction,
}

#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Print every cached question and answer
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete every cached answer
    Clear,
}

impl CacheCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let cache = AnswerCache::open(&config.cache_path())?;

        match &self.action {
            CacheAction::Show { json } => {
                let entries = cache.entries()?;
                if *json {
                    println!("{}", serde_json::to_string_pretty(&entries)?);
                } else if entries.is_empty() {
                    println!("Cache is empty");
                } else {
                    for (question, answer) in &entries {
                        println!("Q: {}\nA: {}\n", question, answer);
                    }
                    println!("{} cached answers", entries.len());
                }
            }
            CacheAction::Clear => {
                cache.clear()?;
                println!("Cache cleared.");
            }
        }

        Ok(())
    }
}
