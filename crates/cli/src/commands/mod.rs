//! Command handlers for the docrag CLI.

pub mod ask;
pub mod cache;
pub mod convert;
pub mod docgen;
pub mod knowledge;
pub mod repl;
pub mod serve;

pub use ask::AskCommand;
pub use cache::CacheCommand;
pub use convert::ConvertPdfsCommand;
pub use docgen::DocgenCommand;
pub use knowledge::KnowledgeCommand;
pub use repl::ReplCommand;
pub use serve::ServeCommand;
