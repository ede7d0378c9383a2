/*!
 * Provider implementations for different translation services.
 *
 * This module contains client implementations for various LLM providers:
 * - OpenAI: OpenAI-compatible chat completions (OpenAI, Moonshot)
 * - Anthropic: Anthropic Messages API
 * - Ollama: Local LLM server
 * - Mock: scripted provider for tests
 */

use std::fmt::Debug;

use async_trait::async_trait;

use crate::errors::ProviderError;

pub mod anthropic;
pub mod mock;
pub mod ollama;
pub mod openai;

/// A single-turn completion request shared by all providers
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Model identifier
    pub model: String,
    /// System prompt, if the conversation has one
    pub system_prompt: Option<String>,
    /// User message
    pub user_message: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Upper bound on generated tokens
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, user_message: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_prompt: None,
            user_message: user_message.into(),
            temperature: 0.3,
            max_tokens: 4000,
        }
    }

    pub fn system(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Common trait for all LLM providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be used interchangeably in the translation service.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Short name used in logs and cache keys
    fn name(&self) -> &str;

    /// Complete a request and return the generated text
    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError>;

    /// Send a minimal request to check credentials and reachability
    async fn test_connection(&self, model: &str) -> Result<(), ProviderError> {
        self.complete(CompletionRequest::new(model, "Hello").max_tokens(10))
            .await
            .map(|_| ())
    }
}

/// Classify a transport error
pub(crate) fn request_error(provider: &str, error: reqwest::Error) -> ProviderError {
    if error.is_timeout() || error.is_connect() {
        ProviderError::ConnectionError(format!("{}: {}", provider, error))
    } else {
        ProviderError::RequestFailed(format!("{}: {}", provider, error))
    }
}

/// Turn a non-success response into the matching `ProviderError`
pub(crate) async fn check_status(
    provider: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to get error response text".to_string());
    log::error!("{} API error ({}): {}", provider, status, error_text);
    Err(ProviderError::from_status(status.as_u16(), error_text))
}

/// Join an endpoint and a path without doubling slashes
pub(crate) fn join_endpoint(endpoint: &str, path: &str) -> String {
    format!("{}/{}", endpoint.trim_end_matches('/'), path.trim_start_matches('/'))
}
