use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{CompletionRequest, Provider, check_status, join_endpoint, request_error};
use crate::errors::ProviderError;

/// Public Anthropic endpoint
pub const ANTHROPIC_ENDPOINT: &str = "https://api.anthropic.com";

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Client for the Anthropic messages API
#[derive(Debug)]
pub struct Anthropic {
    client: Client,
    api_key: String,
    endpoint: String,
}

/// Body of a `/v1/messages` call
#[derive(Debug, Serialize)]
pub struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    // Anthropic takes the system prompt outside the message list
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnthropicMessage {
    pub role: String,
    pub content: String,
}

/// Token usage information
#[derive(Debug, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Anthropic response
#[derive(Debug, Deserialize)]
pub struct AnthropicResponse {
    pub content: Vec<AnthropicContent>,
    pub usage: TokenUsage,
}

/// One block of a response; only `text` blocks carry translation output
#[derive(Debug, Deserialize)]
pub struct AnthropicContent {
    /// The type of content
    #[serde(rename = "type")]
    pub content_type: String,

    /// The text content; absent for non-text blocks
    #[serde(default)]
    pub text: String,
}

impl AnthropicRequest {
    /// Create a new Anthropic request
    pub fn new(model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            system: None,
            temperature: None,
            max_tokens,
        }
    }

    /// Add a message to the request
    pub fn add_message(mut self, role: impl Into<String>, content: impl Into<String>) -> Self {
        self.messages.push(AnthropicMessage {
            role: role.into(),
            content: content.into(),
        });
        self
    }

    /// Set the system prompt
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn from_completion(request: &CompletionRequest) -> Self {
        let mut built = Self::new(&request.model, request.max_tokens)
            .add_message("user", &request.user_message)
            .temperature(request.temperature);
        if let Some(system) = &request.system_prompt {
            built = built.system(system);
        }
        built
    }
}

impl Anthropic {
    /// Create a new Anthropic client; an empty endpoint means the public API
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>, timeout_secs: u64) -> Self {
        let endpoint = endpoint.into();
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            endpoint: if endpoint.is_empty() { ANTHROPIC_ENDPOINT.to_string() } else { endpoint },
        }
    }

    /// Complete a messages request
    pub async fn messages(&self, request: &AnthropicRequest) -> Result<AnthropicResponse, ProviderError> {
        let api_url = join_endpoint(&self.endpoint, "v1/messages");

        let response = self
            .client
            .post(&api_url)
            .header("Content-Type", "application/json")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(request)
            .send()
            .await
            .map_err(|e| request_error("anthropic", e))?;
        let response = check_status("anthropic", response).await?;

        let body = response
            .json::<AnthropicResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(format!("anthropic response: {}", e)))?;
        debug!(
            "anthropic usage: {} input tokens, {} output tokens",
            body.usage.input_tokens, body.usage.output_tokens
        );
        Ok(body)
    }

    /// Extract text from Anthropic response
    pub fn extract_text_from_response(response: &AnthropicResponse) -> String {
        response
            .content
            .iter()
            .filter(|c| c.content_type == "text")
            .map(|c| c.text.as_str())
            .collect()
    }
}

#[async_trait]
impl Provider for Anthropic {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError> {
        let response = self.messages(&AnthropicRequest::from_completion(&request)).await?;
        Ok(Self::extract_text_from_response(&response))
    }
}
