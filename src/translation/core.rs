/*!
 * Core translation service implementation.
 *
 * This module contains the main TranslationService struct and its implementation,
 * which is responsible for translating text using various AI providers.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, error, warn};

use super::ChunkTranslator;
use super::cache::{CacheKey, TranslationCache};
use super::prompts::{StylePrompt, TranslationStyle, prompt_for};
use crate::app_config::{TranslationConfig, TranslationProvider as ConfigTranslationProvider};
use crate::errors::{ProviderError, TranslationError};
use crate::providers::anthropic::Anthropic;
use crate::providers::ollama::Ollama;
use crate::providers::openai::OpenAI;
use crate::providers::{CompletionRequest, Provider};

/// Retry and sampling options of the service
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationOptions {
    /// Retries after the first attempt
    pub retry_count: u32,
    /// Base backoff, doubled on every retry
    pub retry_backoff_ms: u64,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for TranslationOptions {
    fn default() -> Self {
        Self {
            retry_count: 3,
            retry_backoff_ms: 1000,
            temperature: 0.3,
            max_tokens: 4000,
        }
    }
}

/// Counters collected over a run
#[derive(Debug, Default)]
struct ServiceCounters {
    requests: AtomicUsize,
    retries: AtomicUsize,
    failures: AtomicUsize,
}

/// Snapshot of the service counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ServiceStats {
    /// Provider requests sent, including retries
    pub requests: usize,
    pub retries: usize,
    /// Chunks that could not be translated
    pub failures: usize,
    pub cache_hits: usize,
}

/// Provider-backed chunk translator with retries and caching
#[derive(Clone)]
pub struct TranslationService {
    /// Provider implementation
    provider: Arc<dyn Provider>,
    model: String,
    prompts: Vec<StylePrompt>,
    pub options: TranslationOptions,
    cache: TranslationCache,
    counters: Arc<ServiceCounters>,
}

impl TranslationService {
    /// Create a service for the configured provider
    pub fn new(config: &TranslationConfig) -> Result<Self> {
        let api_key = config.get_api_key();
        let endpoint = config.get_endpoint();
        let timeout_secs = config.get_timeout_secs();

        let provider: Arc<dyn Provider> = match config.provider {
            ConfigTranslationProvider::Moonshot => Arc::new(OpenAI::moonshot(api_key, endpoint, timeout_secs)),
            ConfigTranslationProvider::OpenAI => Arc::new(OpenAI::new(api_key, endpoint, timeout_secs)),
            ConfigTranslationProvider::Anthropic => Arc::new(Anthropic::new(api_key, endpoint, timeout_secs)),
            ConfigTranslationProvider::Ollama => Arc::new(Ollama::new(endpoint, timeout_secs)),
        };

        Ok(Self::with_provider(provider, config.get_model(), config))
    }

    /// Create a service around an existing provider
    pub fn with_provider(provider: Arc<dyn Provider>, model: impl Into<String>, config: &TranslationConfig) -> Self {
        Self {
            provider,
            model: model.into(),
            prompts: config.prompts.clone(),
            options: TranslationOptions {
                retry_count: config.common.retry_count,
                retry_backoff_ms: config.common.retry_backoff_ms,
                temperature: config.common.temperature,
                ..TranslationOptions::default()
            },
            cache: TranslationCache::new(config.common.enable_cache),
            counters: Arc::new(ServiceCounters::default()),
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    pub fn stats(&self) -> ServiceStats {
        let (cache_hits, _, _) = self.cache.stats();
        ServiceStats {
            requests: self.counters.requests.load(Ordering::Relaxed),
            retries: self.counters.retries.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
            cache_hits,
        }
    }

    /// Check that the provider is reachable with the configured credentials
    pub async fn test_connection(&self) -> Result<(), ProviderError> {
        self.provider.test_connection(&self.model).await
    }

    /// Translate a piece of text, consulting the cache first
    pub async fn translate_text(&self, text: &str, style: TranslationStyle) -> Result<String, TranslationError> {
        let key = CacheKey::new(self.provider.name(), &self.model, style, text);
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }

        let result = self.translate_with_retry(text, style).await;
        match &result {
            Ok(translation) => self.cache.store(key, translation),
            Err(e) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                error!("Translation via {} failed: {}", self.provider.name(), e);
            }
        }
        result
    }

    fn build_request(&self, text: &str, style: TranslationStyle) -> CompletionRequest {
        let prompt = prompt_for(&self.prompts, style);
        CompletionRequest::new(&self.model, prompt.render_user(text))
            .system(prompt.system_prompt)
            .temperature(self.options.temperature)
            .max_tokens(self.options.max_tokens)
    }

    async fn translate_with_retry(&self, text: &str, style: TranslationStyle) -> Result<String, TranslationError> {
        let request = self.build_request(text, style);
        let attempts = self.options.retry_count + 1;
        let mut last_error = String::new();

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = self.options.retry_backoff_ms.saturating_mul(1u64 << (attempt - 1).min(16));
                debug!("Retrying in {} ms (attempt {}/{})", delay, attempt + 1, attempts);
                self.counters.retries.fetch_add(1, Ordering::Relaxed);
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            self.counters.requests.fetch_add(1, Ordering::Relaxed);
            match self.provider.complete(request.clone()).await {
                Ok(output) if output.trim().is_empty() => {
                    warn!("{} returned an empty translation", self.provider.name());
                    last_error = TranslationError::EmptyResponse.to_string();
                }
                Ok(output) => return Ok(output),
                Err(e) if e.is_retryable() => {
                    warn!("{} request failed: {}", self.provider.name(), e);
                    last_error = e.to_string();
                }
                Err(e) => return Err(TranslationError::Provider(e)),
            }
        }

        Err(TranslationError::RetriesExhausted { attempts, last_error })
    }
}

#[async_trait]
impl ChunkTranslator for TranslationService {
    async fn translate_chunk(&self, text: &str, style: TranslationStyle) -> Result<String, TranslationError> {
        self.translate_text(text, style).await
    }
}
