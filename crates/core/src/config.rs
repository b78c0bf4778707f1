//! Configuration management for docrag.
//!
//! Configuration is merged from several sources, later ones winning:
//! - built-in defaults
//! - environment variables (`DOCRAG_*`)
//! - the workspace config file (`.docrag/config.yaml`)
//! - command-line flags
//!
//! All persisted state (answer cache, knowledge bases, prompt log) lives
//! under the workspace's `.docrag/` directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::logging::LogFormat;

/// Name of the per-workspace state directory.
pub const STATE_DIR: &str = ".docrag";

/// Default OpenAI-compatible endpoint (OpenRouter).
pub const DEFAULT_OPENAI_ENDPOINT: &str = "https://openrouter.ai/api/v1";

/// Default Ollama endpoint.
pub const DEFAULT_OLLAMA_ENDPOINT: &str = "http://localhost:11434";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .docrag/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Active LLM provider ("ollama" or "openai")
    pub provider: String,

    /// Default model identifier
    pub model: String,

    /// API key for the LLM provider
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Log line format
    pub log_format: LogFormat,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// LLM provider configurations
    pub llm: Option<LlmConfig>,

    /// Question answering settings
    pub rag: RagConfig,

    /// HTTP server settings
    pub server: ServerConfig,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    /// Any OpenAI-compatible chat completions API (OpenAI, OpenRouter, ...).
    OpenAI {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        endpoint: Option<String>,
    },
    Ollama {
        endpoint: String,
        model: String,
        #[serde(rename = "embeddingModel")]
        embedding_model: Option<String>,
        timeout: Option<u64>,
    },
}

/// Question answering settings (`rag:` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    /// Knowledge base the ask pipeline searches
    #[serde(rename = "knowledgeBase", default = "default_knowledge_base")]
    pub knowledge_base: String,

    /// Number of chunks retrieved per question
    #[serde(rename = "topK", default = "default_top_k")]
    pub top_k: usize,

    /// Directory re-ingested by the REPL `NEWDOCS:` directive
    #[serde(rename = "docsDir", default)]
    pub docs_dir: Option<PathBuf>,

    /// Model used for keyword extraction (defaults to the answer model)
    #[serde(rename = "keywordModel", default)]
    pub keyword_model: Option<String>,
}

fn default_knowledge_base() -> String {
    "default".to_string()
}

fn default_top_k() -> usize {
    3
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            knowledge_base: default_knowledge_base(),
            top_k: default_top_k(),
            docs_dir: None,
            keyword_model: None,
        }
    }
}

/// HTTP server settings (`server:` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// Socket address string, e.g. `127.0.0.1:8000`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    rag: Option<RagConfig>,
    server: Option<ServerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    format: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "ollama".to_string(),
            model: "llama3.2".to_string(),
            api_key: None,
            log_level: None,
            log_format: LogFormat::default(),
            verbose: false,
            no_color: false,
            llm: None,
            rag: RagConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables, the config file and defaults.
    ///
    /// Environment variables:
    /// - `DOCRAG_WORKSPACE`: Override workspace path
    /// - `DOCRAG_CONFIG`: Path to config file
    /// - `DOCRAG_PROVIDER`: LLM provider
    /// - `DOCRAG_MODEL`: Model identifier
    /// - `DOCRAG_API_KEY`: API key
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use docrag_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Like [`AppConfig::load`], with a workspace and config file that take
    /// precedence over `DOCRAG_WORKSPACE` and `DOCRAG_CONFIG`.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) =
            workspace.or_else(|| std::env::var_os("DOCRAG_WORKSPACE").map(PathBuf::from))
        {
            config.workspace = workspace;
        }

        if let Some(config_file) =
            config_file.or_else(|| std::env::var_os("DOCRAG_CONFIG").map(PathBuf::from))
        {
            config.config_file = Some(config_file);
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.docrag_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("DOCRAG_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("DOCRAG_MODEL") {
            config.model = model;
        }

        if let Ok(key) = std::env::var("DOCRAG_API_KEY") {
            config.api_key = Some(key);
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into a copy of this config.
    pub fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        self.merge_yaml_str(&contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config file {:?}: {}", path, e)))
    }

    fn merge_yaml_str(&self, contents: &str) -> AppResult<Self> {
        let config_file: ConfigFile = if contents.trim().is_empty() {
            ConfigFile::default()
        } else {
            serde_yaml::from_str(contents)?
        };

        let mut result = self.clone();

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(format) = logging.format {
                result.log_format = LogFormat::parse(&format);
            }
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();

            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                result.model = provider_config.model().to_string();
            }

            result.llm = Some(llm);
        }

        if let Some(rag) = config_file.rag {
            result.rag = rag;
        }

        if let Some(server) = config_file.server {
            result.server = server;
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the config file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .docrag directory.
    pub fn docrag_dir(&self) -> PathBuf {
        self.workspace.join(STATE_DIR)
    }

    /// Ensure the .docrag directory exists.
    pub fn ensure_docrag_dir(&self) -> AppResult<()> {
        let dir = self.docrag_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create {} directory: {}", STATE_DIR, e))
            })?;
        }
        Ok(())
    }

    /// Path of the persisted answer cache.
    pub fn cache_path(&self) -> PathBuf {
        self.docrag_dir().join("cache.sqlite")
    }

    /// Path of the prompt audit log.
    pub fn prompt_log_path(&self) -> PathBuf {
        self.docrag_dir().join("logs").join("prompts.log")
    }

    /// Directory the REPL re-ingests on `NEWDOCS:`; relative paths resolve
    /// against the workspace.
    pub fn docs_dir(&self) -> PathBuf {
        match &self.rag.docs_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => self.workspace.join(dir),
            None => self.workspace.join("docs"),
        }
    }

    /// Model used for keyword extraction.
    pub fn keyword_model(&self) -> &str {
        self.rag.keyword_model.as_deref().unwrap_or(&self.model)
    }

    /// Get the configuration of a provider.
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.llm.as_ref().and_then(|llm| llm.providers.get(provider))
    }

    /// Endpoint of the active provider, falling back to the provider default.
    pub fn provider_endpoint(&self) -> Option<String> {
        match self.get_provider_config(&self.provider) {
            Some(ProviderConfig::OpenAI { endpoint, .. }) => endpoint.clone(),
            Some(ProviderConfig::Ollama { endpoint, .. }) => Some(endpoint.clone()),
            None => None,
        }
    }

    /// Resolve API key: `DOCRAG_API_KEY` first, then the provider's `apiKeyEnv`.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        match self.get_provider_config(provider) {
            Some(ProviderConfig::OpenAI { api_key_env, .. }) => std::env::var(api_key_env).ok(),
            _ => None,
        }
    }

    /// Validate configuration for the active provider.
    pub fn validate(&self) -> AppResult<()> {
        let provider = self.provider.as_str();
        let known_providers = ["openai", "openrouter", "ollama"];

        if !known_providers.contains(&provider) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                provider,
                known_providers.join(", ")
            )));
        }

        if let Some(ProviderConfig::OpenAI { api_key_env, .. }) = self.get_provider_config(provider)
        {
            if self.api_key.is_none() && std::env::var(api_key_env).is_err() {
                return Err(AppError::Config(format!(
                    "API key not found in environment variable: {}",
                    api_key_env
                )));
            }
        }

        if self.rag.top_k == 0 {
            return Err(AppError::Config("rag.topK must be at least 1".to_string()));
        }

        Ok(())
    }
}

impl ProviderConfig {
    /// Model configured for this provider.
    pub fn model(&self) -> &str {
        match self {
            ProviderConfig::OpenAI { model, .. } | ProviderConfig::Ollama { model, .. } => model,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "ollama");
        assert_eq!(config.model, "llama3.2");
        assert_eq!(config.rag.top_k, 3);
        assert_eq!(config.rag.knowledge_base, "default");
        assert_eq!(config.server.bind_addr(), "127.0.0.1:8000");
        assert!(!config.verbose);
        assert!(!config.no_color);
    }

    #[test]
    fn test_state_paths() {
        let mut config = AppConfig::default();
        config.workspace = PathBuf::from("/tmp/ws");
        assert!(config.docrag_dir().ends_with(".docrag"));
        assert_eq!(config.cache_path(), PathBuf::from("/tmp/ws/.docrag/cache.sqlite"));
        assert_eq!(
            config.prompt_log_path(),
            PathBuf::from("/tmp/ws/.docrag/logs/prompts.log")
        );
        assert_eq!(config.docs_dir(), PathBuf::from("/tmp/ws/docs"));
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default();
        let overridden = config.with_overrides(
            None,
            None,
            Some("openai".to_string()),
            Some("gpt-4o-mini".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(overridden.provider, "openai");
        assert_eq!(overridden.model, "gpt-4o-mini");
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_merge_yaml_sections() {
        let yaml = r#"
llm:
  activeProvider: ollama
  providers:
    ollama:
      endpoint: http://localhost:11434
      model: mistral
      embeddingModel: all-minilm
logging:
  level: warn
  format: json
rag:
  knowledgeBase: api-docs
  topK: 5
  docsDir: kap
server:
  port: 9000
"#;
        let config = AppConfig::default().merge_yaml_str(yaml).unwrap();
        assert_eq!(config.provider, "ollama");
        assert_eq!(config.model, "mistral");
        assert_eq!(config.log_level.as_deref(), Some("warn"));
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.rag.knowledge_base, "api-docs");
        assert_eq!(config.rag.top_k, 5);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(
            config.provider_endpoint().as_deref(),
            Some("http://localhost:11434")
        );
        assert_eq!(config.keyword_model(), "mistral");
    }

    #[test]
    fn test_merge_empty_yaml_keeps_defaults() {
        let config = AppConfig::default().merge_yaml_str("").unwrap();
        assert_eq!(config.provider, "ollama");
        assert_eq!(config.rag.top_k, 3);
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = AppConfig::default();
        config.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_ollama() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_openai_with_explicit_key() {
        let yaml = r#"
llm:
  activeProvider: openai
  providers:
    openai:
      apiKeyEnv: DOCRAG_TEST_KEY_THAT_IS_NOT_SET
      model: mistralai/mistral-7b-instruct
"#;
        let config = AppConfig::default().merge_yaml_str(yaml).unwrap();
        assert!(config.validate().is_err());

        let mut with_key = config.clone();
        with_key.api_key = Some("sk-test".to_string());
        assert!(with_key.validate().is_ok());
        assert_eq!(with_key.resolve_api_key("openai").as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_load_from_reads_workspace_config() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(STATE_DIR)).unwrap();
        std::fs::write(
            dir.path().join(STATE_DIR).join("config.yaml"),
            "rag:\n  topK: 7\n",
        )
        .unwrap();

        let config = AppConfig::load_from(Some(dir.path().to_path_buf()), None).unwrap();
        assert_eq!(config.workspace, dir.path());
        assert_eq!(config.rag.top_k, 7);
    }

    #[test]
    fn test_load_from_missing_workspace() {
        let result = AppConfig::load_from(Some(PathBuf::from("/definitely/not/here")), None);
        assert!(result.is_err());
    }
}
