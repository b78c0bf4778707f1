//! docrag CLI
//!
//! Main entry point for the docrag command-line tool: question answering over
//! a local knowledge base, document ingestion, PDF conversion and
//! LLM-generated documentation.

mod commands;

use clap::{Parser, Subcommand};
use commands::{
    AskCommand, CacheCommand, ConvertPdfsCommand, DocgenCommand, KnowledgeCommand, ReplCommand,
    ServeCommand,
};
use docrag_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Instrument;

/// docrag - retrieval-augmented answers over your documentation
#[derive(Parser, Debug)]
#[command(name = "docrag")]
#[command(about = "Retrieval-augmented answers over your documentation", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "DOCRAG_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "DOCRAG_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// LLM provider (ollama, openai, openrouter)
    #[arg(short, long, global = true, env = "DOCRAG_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "DOCRAG_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer a question from the knowledge base
    Ask(AskCommand),

    /// Interactive question loop
    Repl(ReplCommand),

    /// Serve the HTTP API
    Serve(ServeCommand),

    /// Knowledge base management
    Knowledge(KnowledgeCommand),

    /// Convert a directory of PDFs to text files
    ConvertPdfs(ConvertPdfsCommand),

    /// Generate documentation with the LLM
    Docgen(DocgenCommand),

    /// Inspect or clear the answer cache
    Cache(CacheCommand),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Ask(_) => "ask",
            Commands::Repl(_) => "repl",
            Commands::Serve(_) => "serve",
            Commands::Knowledge(_) => "knowledge",
            Commands::ConvertPdfs(_) => "convert-pdfs",
            Commands::Docgen(_) => "docgen",
            Commands::Cache(_) => "cache",
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Command failed: {}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> AppResult<()> {
    let config = AppConfig::load_from(cli.workspace, cli.config)?.with_overrides(
        None,
        None,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.log_format, config.no_color)?;

    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    config.ensure_docrag_dir()?;

    let span = tracing::info_span!("command", name = cli.command.name());
    let result = async {
        match cli.command {
            Commands::Ask(cmd) => cmd.execute(&config).await,
            Commands::Repl(cmd) => cmd.execute(&config).await,
            Commands::Serve(cmd) => cmd.execute(&config).await,
            Commands::Knowledge(cmd) => cmd.execute(&config).await,
            Commands::ConvertPdfs(cmd) => cmd.execute(&config).await,
            Commands::Docgen(cmd) => cmd.execute(&config).await,
            Commands::Cache(cmd) => cmd.execute(&config).await,
        }
    }
    .instrument(span)
    .await;

    if result.is_ok() {
        tracing::info!("Command completed successfully");
    }

    result
}
