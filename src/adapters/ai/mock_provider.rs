//! Mock AI Provider for testing.
//!
//! Provides a configurable mock implementation of the AIProvider port,
//! allowing tests to run without calling real AI APIs.
//!
//! # Features
//!
//! - Pre-configured responses, consumed in order
//! - Simulated delays
//! - Error injection for degraded-turn testing
//! - Call tracking per request purpose
//!
//! # Example
//!
//! ```ignore
//! let provider = MockAIProvider::new()
//!     .with_response("[]")
//!     .with_error(MockError::Unavailable { message: "down".into() });
//!
//! let response = provider.complete(request).await?;
//! assert_eq!(response.content, "[]");
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::sleep;

use crate::ports::{
    AIError, AIProvider, CompletionRequest, CompletionResponse, FinishReason, RequestPurpose,
    TokenUsage,
};

/// Mock AI provider for testing.
#[derive(Debug, Clone)]
pub struct MockAIProvider {
    /// Pre-configured responses (consumed in order).
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    /// Model name reported on every response.
    model: String,
    /// Simulated latency per request.
    delay: Duration,
    /// Call history for verification.
    calls: Arc<Mutex<Vec<CompletionRequest>>>,
}

/// A configured mock response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Return a successful completion.
    Success {
        content: String,
        usage: TokenUsage,
        finish_reason: FinishReason,
    },
    /// Return an error.
    Error(MockError),
}

/// Mock error types for testing error handling.
#[derive(Debug, Clone)]
pub enum MockError {
    /// Simulate rate limiting.
    RateLimited { retry_after_secs: u32 },
    /// Simulate context too long.
    ContextTooLong { tokens: u32, max: u32 },
    /// Simulate provider unavailable.
    Unavailable { message: String },
    /// Simulate authentication failure.
    AuthenticationFailed,
    /// Simulate network error.
    Network { message: String },
    /// Simulate timeout.
    Timeout { timeout_secs: u32 },
}

impl From<MockError> for AIError {
    fn from(err: MockError) -> Self {
        match err {
            MockError::RateLimited { retry_after_secs } => AIError::rate_limited(retry_after_secs),
            MockError::ContextTooLong { tokens, max } => AIError::context_too_long(tokens, max),
            MockError::Unavailable { message } => AIError::unavailable(message),
            MockError::AuthenticationFailed => AIError::AuthenticationFailed,
            MockError::Network { message } => AIError::network(message),
            MockError::Timeout { timeout_secs } => AIError::Timeout { timeout_secs },
        }
    }
}

impl Default for MockAIProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockAIProvider {
    /// Creates a new mock provider with default settings.
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            model: "mock-model-1".to_string(),
            delay: Duration::ZERO,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Adds a successful response to the queue.
    pub fn with_response(self, content: impl Into<String>) -> Self {
        self.with_response_usage(content, TokenUsage::new(10, 20))
    }

    /// Adds a successful response with specific token usage.
    pub fn with_response_usage(self, content: impl Into<String>, usage: TokenUsage) -> Self {
        lock(&self.responses).push_back(MockResponse::Success {
            content: content.into(),
            usage,
            finish_reason: FinishReason::Stop,
        });
        self
    }

    /// Adds a response that stopped for `finish_reason`, e.g. a reply cut
    /// off at the token limit.
    pub fn with_finish_reason(
        self,
        content: impl Into<String>,
        usage: TokenUsage,
        finish_reason: FinishReason,
    ) -> Self {
        lock(&self.responses).push_back(MockResponse::Success {
            content: content.into(),
            usage,
            finish_reason,
        });
        self
    }

    /// Adds an error response to the queue.
    pub fn with_error(self, error: MockError) -> Self {
        lock(&self.responses).push_back(MockResponse::Error(error));
        self
    }

    /// Sets simulated latency per request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Returns the number of calls made to this provider.
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Returns the recorded calls made for one purpose, oldest first.
    pub fn calls_for(&self, purpose: RequestPurpose) -> Vec<CompletionRequest> {
        lock(&self.calls)
            .iter()
            .filter(|call| call.metadata.purpose == purpose)
            .cloned()
            .collect()
    }

    /// Returns the most recent call, if any.
    pub fn last_call(&self) -> Option<CompletionRequest> {
        lock(&self.calls).last().cloned()
    }

    /// Gets the next response or a default.
    fn next_response(&self) -> MockResponse {
        lock(&self.responses)
            .pop_front()
            .unwrap_or_else(|| MockResponse::Success {
                content: "Mock response".to_string(),
                usage: TokenUsage::new(5, 10),
                finish_reason: FinishReason::Stop,
            })
    }
}

#[async_trait]
impl AIProvider for MockAIProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AIError> {
        lock(&self.calls).push(request);

        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        match self.next_response() {
            MockResponse::Success {
                content,
                usage,
                finish_reason,
            } => Ok(CompletionResponse {
                content,
                usage,
                model: self.model.clone(),
                finish_reason,
            }),
            MockResponse::Error(err) => Err(err.into()),
        }
    }
}
