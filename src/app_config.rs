use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use log::warn;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::AppError;
use crate::markup::LinkTextPolicy;
use crate::translation::prompts::{StylePrompt, TranslationStyle, default_prompts};

/// Settings read from `conf.json`: provider, chunking and pipeline behavior
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Translation config
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Chapter pipeline settings
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation provider type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    // @provider: Moonshot (OpenAI-compatible)
    #[default]
    Moonshot,
    // @provider: OpenAI
    OpenAI,
    // @provider: Anthropic
    Anthropic,
    // @provider: Ollama
    Ollama,
}

impl TranslationProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Moonshot => "Moonshot",
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::Ollama => "Ollama",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Moonshot => "moonshot".to_string(),
            Self::OpenAI => "openai".to_string(),
            Self::Anthropic => "anthropic".to_string(),
            Self::Ollama => "ollama".to_string(),
        }
    }

    /// Whether requests go to a hosted API that needs a key
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, Self::Ollama)
    }
}

impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "moonshot" => Ok(Self::Moonshot),
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Max concurrent requests
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: TranslationProvider) -> Self {
        Self {
            provider_type: provider_type.to_lowercase_string(),
            model: default_model(provider_type),
            api_key: String::new(),
            endpoint: default_endpoint(provider_type),
            concurrent_requests: default_concurrent_requests(),
            timeout_secs: match provider_type {
                TranslationProvider::Ollama | TranslationProvider::Anthropic => default_slow_timeout_secs(),
                _ => default_timeout_secs(),
            },
        }
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Translation provider to use
    #[serde(default)]
    pub provider: TranslationProvider,

    /// Available translation providers
    #[serde(default = "default_available_providers")]
    pub available_providers: Vec<ProviderConfig>,

    /// Common translation settings
    #[serde(default)]
    pub common: TranslationCommonConfig,

    /// Prompt style for the book
    #[serde(default)]
    pub style: TranslationStyle,

    /// Prompt overrides per style
    #[serde(default = "default_prompts")]
    pub prompts: Vec<StylePrompt>,
}

/// Common translation settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationCommonConfig {
    /// Retry count for failed requests
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Backoff base for retries (in milliseconds), doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Temperature parameter for text generation (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Whether translated chunks are cached for the run
    #[serde(default = "default_true")]
    pub enable_cache: bool,
}

impl Default for TranslationCommonConfig {
    fn default() -> Self {
        Self {
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            temperature: default_temperature(),
            enable_cache: true,
        }
    }
}

/// Chapter pipeline settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Maximum characters per translation chunk
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,

    /// Chapters processed at the same time
    #[serde(default = "default_concurrent_chapters")]
    pub concurrent_chapters: usize,

    /// Chapters with less extracted text are passed through untranslated
    #[serde(default = "default_min_chapter_chars")]
    pub min_chapter_chars: usize,

    /// Handling of link text during extraction
    #[serde(default)]
    pub link_text: LinkTextPolicy,

    /// Strip model commentary from translations
    #[serde(default = "default_true")]
    pub clean_output: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: default_max_chunk_chars(),
            concurrent_chapters: default_concurrent_chapters(),
            min_chapter_chars: default_min_chapter_chars(),
            link_text: LinkTextPolicy::default(),
            clean_output: true,
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_concurrent_requests() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_slow_timeout_secs() -> u64 {
    120
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_temperature() -> f32 {
    0.3
}

fn default_true() -> bool {
    true
}

fn default_max_chunk_chars() -> usize {
    1500
}

fn default_concurrent_chapters() -> usize {
    3
}

fn default_min_chapter_chars() -> usize {
    10
}

fn default_endpoint(provider: TranslationProvider) -> String {
    match provider {
        TranslationProvider::Moonshot => crate::providers::openai::MOONSHOT_ENDPOINT,
        TranslationProvider::OpenAI => crate::providers::openai::OPENAI_ENDPOINT,
        TranslationProvider::Anthropic => crate::providers::anthropic::ANTHROPIC_ENDPOINT,
        TranslationProvider::Ollama => crate::providers::ollama::OLLAMA_ENDPOINT,
    }
    .to_string()
}

fn default_model(provider: TranslationProvider) -> String {
    match provider {
        TranslationProvider::Moonshot => "moonshot-v1-8k",
        TranslationProvider::OpenAI => "gpt-4o-mini",
        TranslationProvider::Anthropic => "claude-3-haiku-20240307",
        TranslationProvider::Ollama => "qwen2.5:7b",
    }
    .to_string()
}

fn default_available_providers() -> Vec<ProviderConfig> {
    [
        TranslationProvider::Moonshot,
        TranslationProvider::OpenAI,
        TranslationProvider::Anthropic,
        TranslationProvider::Ollama,
    ]
    .into_iter()
    .map(ProviderConfig::new)
    .collect()
}

impl Config {
    /// Load the configuration file, writing a default one when it does not exist
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let file = File::open(path).context(format!("Failed to open config file: {:?}", path))?;
            let reader = BufReader::new(file);
            let config: Config =
                serde_json::from_reader(reader).context(format!("Failed to parse config file: {:?}", path))?;
            return Ok(config);
        }

        warn!("Config file not found at {:?}, creating default config.", path);
        let config = Config::default();
        let config_json =
            serde_json::to_string_pretty(&config).context("Failed to serialize default config to JSON")?;
        std::fs::write(path, config_json).context(format!("Failed to write default config to file: {:?}", path))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        let provider = self.translation.provider;

        if provider.requires_api_key() && self.translation.get_api_key().is_empty() {
            return Err(AppError::Config(format!(
                "Translation API key is required for {} provider",
                provider.display_name()
            ))
            .into());
        }

        let endpoint = self.translation.get_endpoint();
        Url::parse(&endpoint)
            .map_err(|e| AppError::Config(format!("Invalid endpoint '{}' for {}: {}", endpoint, provider, e)))?;

        if self.pipeline.max_chunk_chars == 0 {
            return Err(AppError::Config("pipeline.max_chunk_chars must be greater than zero".to_string()).into());
        }
        if self.pipeline.concurrent_chapters == 0 {
            return Err(AppError::Config("pipeline.concurrent_chapters must be greater than zero".to_string()).into());
        }
        if self.translation.optimal_concurrent_requests() == 0 {
            return Err(AppError::Config(format!("concurrent_requests must be greater than zero for {}", provider)).into());
        }

        Ok(())
    }
}

impl TranslationConfig {
    pub fn optimal_concurrent_requests(&self) -> usize {
        self.get_active_provider_config()
            .map(|provider_config| provider_config.concurrent_requests)
            .unwrap_or_else(default_concurrent_requests)
    }

    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        self.get_provider_config(&self.provider)
    }

    /// Get a specific provider configuration by type
    pub fn get_provider_config(&self, provider_type: &TranslationProvider) -> Option<&ProviderConfig> {
        let provider_str = provider_type.to_lowercase_string();
        self.available_providers.iter().find(|p| p.provider_type == provider_str)
    }

    /// Mutable configuration of the active provider, created with defaults if missing
    pub fn active_provider_config_mut(&mut self) -> &mut ProviderConfig {
        let provider_str = self.provider.to_lowercase_string();
        let position = match self.available_providers.iter().position(|p| p.provider_type == provider_str) {
            Some(position) => position,
            None => {
                self.available_providers.push(ProviderConfig::new(self.provider));
                self.available_providers.len() - 1
            }
        };
        &mut self.available_providers[position]
    }

    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        self.get_active_provider_config()
            .filter(|provider_config| !provider_config.model.is_empty())
            .map(|provider_config| provider_config.model.clone())
            .unwrap_or_else(|| default_model(self.provider))
    }

    /// Get the API key for the active provider
    pub fn get_api_key(&self) -> String {
        self.get_active_provider_config()
            .map(|provider_config| provider_config.api_key.clone())
            .unwrap_or_default()
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        self.get_active_provider_config()
            .filter(|provider_config| !provider_config.endpoint.is_empty())
            .map(|provider_config| provider_config.endpoint.clone())
            .unwrap_or_else(|| default_endpoint(self.provider))
    }

    /// Get the request timeout for the active provider
    pub fn get_timeout_secs(&self) -> u64 {
        self.get_active_provider_config()
            .map(|provider_config| provider_config.timeout_secs)
            .unwrap_or_else(default_timeout_secs)
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::default(),
            available_providers: default_available_providers(),
            common: TranslationCommonConfig::default(),
            style: TranslationStyle::default(),
            prompts: default_prompts(),
        }
    }
}
