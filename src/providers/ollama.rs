use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{CompletionRequest, Provider, check_status, join_endpoint, request_error};
use crate::errors::ProviderError;

/// Default local Ollama server
pub const OLLAMA_ENDPOINT: &str = "http://localhost:11434";

/// Client for a local Ollama server
#[derive(Debug)]
pub struct Ollama {
    /// Base URL including scheme and port
    base_url: String,
    client: Client,
}

/// Chat message object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender (system, user, assistant)
    pub role: String,
    /// Content of the message
    pub content: String,
}

/// Additional model parameters
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GenerationOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Maximum number of tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
}

/// Chat request for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerationOptions>,
    /// Whether to stream the response
    stream: bool,
}

/// Chat response from the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Model name
    #[serde(default)]
    pub model: String,
    /// Response message
    pub message: ChatMessage,
    /// Whether the generation is complete
    #[serde(default)]
    pub done: bool,
    /// Number of prompt tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_eval_count: Option<u64>,
    /// Number of generated tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u64>,
}

impl ChatRequest {
    pub fn from_completion(request: &CompletionRequest) -> Self {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system_prompt {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: request.user_message.clone(),
        });
        Self {
            model: request.model.clone(),
            messages,
            options: Some(GenerationOptions {
                temperature: Some(request.temperature),
                num_predict: Some(request.max_tokens),
            }),
            stream: false,
        }
    }
}

impl Ollama {
    /// Create a client for `endpoint`; an empty endpoint means the local default server.
    /// A missing scheme defaults to `http://`.
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Self {
        let endpoint = endpoint.into();
        let base_url = if endpoint.is_empty() {
            OLLAMA_ENDPOINT.to_string()
        } else if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint
        } else {
            format!("http://{}", endpoint)
        };

        Self {
            base_url,
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                // Ollama speaks HTTP/1.1
                .http1_only()
                .pool_idle_timeout(Duration::from_secs(90))
                .tcp_keepalive(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Chat with the Ollama API
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let url = join_endpoint(&self.base_url, "api/chat");

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| request_error("ollama", e))?;
        let response = check_status("ollama", response).await?;

        let response_text = response
            .text()
            .await
            .map_err(|e| ProviderError::ParseError(format!("ollama response text: {}", e)))?;
        parse_chat_response(&response_text)
    }
}

/// Parse a chat response body. Servers that ignore `stream: false` answer with one JSON
/// object per line; their message contents are concatenated.
pub fn parse_chat_response(body: &str) -> Result<ChatResponse, ProviderError> {
    match serde_json::from_str::<ChatResponse>(body) {
        Ok(chat_response) => Ok(chat_response),
        Err(e) => {
            let preview: String = body.chars().take(500).collect();
            error!("Failed to parse Ollama chat response: {}. Raw response: {}", e, preview);

            let parts: Vec<ChatResponse> = body
                .lines()
                .filter(|line| !line.trim().is_empty())
                .filter_map(|line| serde_json::from_str::<ChatResponse>(line).ok())
                .collect();
            let Some(last) = parts.last() else {
                return Err(ProviderError::ParseError(format!("ollama response: {}", e)));
            };

            debug!("Recovered {} streamed Ollama response lines", parts.len());
            let content: String = parts.iter().map(|part| part.message.content.as_str()).collect();
            Ok(ChatResponse {
                model: last.model.clone(),
                message: ChatMessage {
                    role: "assistant".to_string(),
                    content,
                },
                done: true,
                prompt_eval_count: last.prompt_eval_count,
                eval_count: last.eval_count,
            })
        }
    }
}

#[async_trait]
impl Provider for Ollama {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError> {
        let response = self.chat(&ChatRequest::from_completion(&request)).await?;
        Ok(response.message.content)
    }
}
