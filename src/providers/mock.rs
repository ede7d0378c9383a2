/*!
 * Mock provider implementations for testing.
 *
 * This module provides mock providers that simulate different behaviors:
 * - `MockProvider::working()` - Always succeeds with a marked translation
 * - `MockProvider::intermittent(n)` - Fails every nth request
 * - `MockProvider::failing()` - Always fails with a retryable error
 * - `MockProvider::unauthorized()` - Always fails with a non-retryable error
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{CompletionRequest, Provider};
use crate::errors::ProviderError;

/// Marker the working mock puts in front of every "translation"
pub const MOCK_TRANSLATION_PREFIX: &str = "译：";

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds
    Working,
    /// Fails every Nth request
    Intermittent { fail_every: usize },
    /// Always fails with a server error
    Failing,
    /// Always fails with an authentication error
    Unauthorized,
    /// Returns empty text
    Empty,
    /// Succeeds after a delay
    Slow { delay_ms: u64 },
}

/// Mock provider for testing translation behavior
#[derive(Debug, Clone)]
pub struct MockProvider {
    behavior: MockBehavior,
    /// Shared between clones
    request_count: Arc<AtomicUsize>,
    /// Custom response generator for the working behaviors
    custom_response: Option<fn(&CompletionRequest) -> String>,
}

impl MockProvider {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            custom_response: None,
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent {
            fail_every: fail_every.max(1),
        })
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn unauthorized() -> Self {
        Self::new(MockBehavior::Unauthorized)
    }

    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Set a custom response generator
    pub fn with_custom_response(mut self, generator: fn(&CompletionRequest) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    fn respond(&self, request: &CompletionRequest) -> String {
        match self.custom_response {
            Some(generator) => generator(request),
            None => format!("{}{}", MOCK_TRANSLATION_PREFIX, request.user_message),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);

        match self.behavior {
            MockBehavior::Working => Ok(self.respond(&request)),
            MockBehavior::Intermittent { fail_every } => {
                if count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        status_code: 503,
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                    })
                } else {
                    Ok(self.respond(&request))
                }
            }
            MockBehavior::Failing => Err(ProviderError::ApiError {
                status_code: 500,
                message: "Simulated provider failure".to_string(),
            }),
            MockBehavior::Unauthorized => Err(ProviderError::AuthenticationError("Simulated bad API key".to_string())),
            MockBehavior::Empty => Ok(String::new()),
            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                Ok(self.respond(&request))
            }
        }
    }
}
