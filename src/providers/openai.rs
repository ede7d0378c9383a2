/*!
 * Client for OpenAI-compatible chat completion APIs.
 *
 * Moonshot exposes the same `/chat/completions` contract, so both providers share
 * this client and differ only in endpoint and default model.
 */

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{CompletionRequest, Provider, check_status, join_endpoint, request_error};
use crate::errors::ProviderError;

/// Public OpenAI endpoint
pub const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1";

/// Public Moonshot endpoint
pub const MOONSHOT_ENDPOINT: &str = "https://api.moonshot.cn/v1";

/// OpenAI-compatible client
#[derive(Debug)]
pub struct OpenAI {
    client: Client,
    api_key: String,
    endpoint: String,
    /// Label used in logs ("openai", "moonshot")
    name: String,
}

/// Chat message in the OpenAI wire format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIMessage {
    pub role: String,
    pub content: String,
}

/// Chat completion request body
#[derive(Debug, Serialize)]
pub struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    temperature: f32,
    max_tokens: u32,
}

/// Chat completion response body
#[derive(Debug, Deserialize)]
pub struct OpenAIResponse {
    pub choices: Vec<OpenAIChoice>,
    #[serde(default)]
    pub usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
pub struct OpenAIChoice {
    pub message: OpenAIMessage,
}

/// Token usage information
#[derive(Debug, Deserialize)]
pub struct OpenAIUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl OpenAIRequest {
    pub fn from_completion(request: &CompletionRequest) -> Self {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system_prompt {
            messages.push(OpenAIMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.push(OpenAIMessage {
            role: "user".to_string(),
            content: request.user_message.clone(),
        });
        Self {
            model: request.model.clone(),
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }
}

impl OpenAI {
    /// Create a new client; an empty endpoint means the public OpenAI API
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>, timeout_secs: u64) -> Self {
        let endpoint = endpoint.into();
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            endpoint: if endpoint.is_empty() { OPENAI_ENDPOINT.to_string() } else { endpoint },
            name: "openai".to_string(),
        }
    }

    /// Client for Moonshot; an empty endpoint means the public Moonshot API
    pub fn moonshot(api_key: impl Into<String>, endpoint: impl Into<String>, timeout_secs: u64) -> Self {
        let endpoint = endpoint.into();
        let endpoint = if endpoint.is_empty() { MOONSHOT_ENDPOINT.to_string() } else { endpoint };
        Self {
            name: "moonshot".to_string(),
            ..Self::new(api_key, endpoint, timeout_secs)
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send a chat completion request
    pub async fn chat(&self, request: &OpenAIRequest) -> Result<OpenAIResponse, ProviderError> {
        let url = join_endpoint(&self.endpoint, "chat/completions");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| request_error(&self.name, e))?;
        let response = check_status(&self.name, response).await?;

        let body = response
            .json::<OpenAIResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(format!("{} response: {}", self.name, e)))?;
        if let Some(usage) = &body.usage {
            debug!(
                "{} usage: {} prompt tokens, {} completion tokens",
                self.name, usage.prompt_tokens, usage.completion_tokens
            );
        }
        Ok(body)
    }

    /// Text of the first choice
    pub fn extract_text(response: &OpenAIResponse) -> Option<String> {
        response.choices.first().map(|choice| choice.message.content.clone())
    }
}

#[async_trait]
impl Provider for OpenAI {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError> {
        let response = self.chat(&OpenAIRequest::from_completion(&request)).await?;
        Self::extract_text(&response)
            .ok_or_else(|| ProviderError::ParseError(format!("{} response has no choices", self.name)))
    }
}
