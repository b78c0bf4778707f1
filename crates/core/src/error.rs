//! Error types for docrag.
//!
//! This module defines a unified error enum that covers all error categories
//! in the toolchain: configuration, I/O, LLM, knowledge base, prompt, answer
//! cache and ask-pipeline errors.

use thiserror::Error;

/// Unified error type for docrag.
///
/// All library functions return `Result<T, AppError>`.
/// Errors are represented and propagated, never panicked on.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// LLM provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Knowledge base, loader and vector store errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Answer cache errors
    #[error("Cache error: {0}")]
    Cache(String),

    /// A stage of the ask pipeline failed
    #[error("{stage} failed: {message}")]
    Pipeline { stage: String, message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Wrap an error as a failure of the named pipeline stage.
    pub fn pipeline(stage: impl Into<String>, err: impl std::fmt::Display) -> Self {
        AppError::Pipeline {
            stage: stage.into(),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
