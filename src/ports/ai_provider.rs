//! AI Provider Port - Interface for LLM provider integrations.
//!
//! The conversation core makes three kinds of calls through this port:
//! the role-play chat completion, question-status classification and
//! history summarization. All three are plain non-streaming completions.
//!
//! # Example
//!
//! ```ignore
//! use async_trait::async_trait;
//!
//! struct EchoProvider;
//!
//! #[async_trait]
//! impl AIProvider for EchoProvider {
//!     async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AIError> {
//!         Ok(CompletionResponse {
//!             content: "สวัสดีค่ะ".to_string(),
//!             usage: TokenUsage::default(),
//!             model: "echo".to_string(),
//!             finish_reason: FinishReason::Stop,
//!         })
//!     }
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::conversation::GenerationParams;
use crate::domain::foundation::SessionId;

/// Port for AI/LLM provider interactions.
#[async_trait]
pub trait AIProvider: Send + Sync {
    /// Generate a single completion.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AIError>;
}

/// Request for AI completion.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Ordered role/content pairs sent as-is.
    pub messages: Vec<Message>,
    /// Prepended as a system message when set.
    pub system_prompt: Option<String>,
    /// Model override; the provider's configured model when `None`.
    pub model: Option<String>,
    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub frequency_penalty: Option<f32>,
    pub presence_penalty: Option<f32>,
    /// Fixed sampling seed (exam mode).
    pub seed: Option<i64>,
    /// Request metadata for tracing.
    pub metadata: RequestMetadata,
}

impl CompletionRequest {
    /// Creates a new completion request with required metadata.
    pub fn new(metadata: RequestMetadata) -> Self {
        Self {
            messages: Vec::new(),
            system_prompt: None,
            model: None,
            max_tokens: None,
            temperature: None,
            top_p: None,
            frequency_penalty: None,
            presence_penalty: None,
            seed: None,
            metadata,
        }
    }

    /// Adds a message to the conversation.
    pub fn with_message(mut self, role: MessageRole, content: impl Into<String>) -> Self {
        self.messages.push(Message {
            role,
            content: content.into(),
        });
        self
    }

    /// Replaces all messages.
    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    /// Sets the system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Sets the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the maximum tokens to generate.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Applies resolved generation parameters.
    pub fn with_generation(mut self, params: &GenerationParams) -> Self {
        self.temperature = params.temperature;
        self.top_p = params.top_p;
        self.frequency_penalty = params.frequency_penalty;
        self.presence_penalty = params.presence_penalty;
        self.seed = params.seed;
        self.max_tokens = params.max_tokens;
        self
    }
}

/// A message in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who sent this message.
    pub role: MessageRole,
    /// Message content.
    pub content: String,
}

impl Message {
    /// Creates a new message.
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Creates a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Creates an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// Role of the message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instructions (guides model behavior).
    System,
    /// User input.
    User,
    /// Assistant (model) response.
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// Why a request is being made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestPurpose {
    /// The role-play reply.
    Chat,
    /// Question-status classification.
    Classification,
    /// History summarization.
    Summarization,
}

/// Request metadata for tracing.
#[derive(Debug, Clone)]
pub struct RequestMetadata {
    /// Session the request belongs to.
    pub session_id: SessionId,
    pub purpose: RequestPurpose,
    /// Trace ID for log correlation.
    pub trace_id: String,
}

impl RequestMetadata {
    /// Creates new request metadata.
    pub fn new(session_id: SessionId, purpose: RequestPurpose, trace_id: impl Into<String>) -> Self {
        Self {
            session_id,
            purpose,
            trace_id: trace_id.into(),
        }
    }
}

/// Response from AI completion.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Generated content.
    pub content: String,
    /// Provider-reported token usage.
    pub usage: TokenUsage,
    /// Model that generated the response.
    pub model: String,
    /// Why the model stopped generating.
    pub finish_reason: FinishReason,
}

/// Token usage counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt.
    pub input_tokens: u64,
    /// Tokens in the completion.
    pub output_tokens: u64,
    /// Total tokens as reported by the provider.
    pub total_tokens: u64,
}

impl TokenUsage {
    /// Creates usage with `total = input + output`.
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
        }
    }

    /// Creates zero usage.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Accumulates another usage report.
    pub fn add(&mut self, other: &TokenUsage) {
        self.input_tokens = self.input_tokens.saturating_add(other.input_tokens);
        self.output_tokens = self.output_tokens.saturating_add(other.output_tokens);
        self.total_tokens = self.total_tokens.saturating_add(other.total_tokens);
    }
}

/// Reason the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural stop (end of response).
    Stop,
    /// Hit max_tokens limit.
    Length,
    /// Content was filtered for safety.
    ContentFilter,
    /// An error occurred.
    Error,
}

/// AI provider errors.
#[derive(Debug, thiserror::Error)]
pub enum AIError {
    /// Rate limited by provider.
    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds until retry is allowed.
        retry_after_secs: u32,
    },

    /// Context (prompt + history) exceeds model limit.
    #[error("context too long: {tokens} tokens exceeds {max} limit")]
    ContextTooLong {
        /// Actual token count.
        tokens: u32,
        /// Maximum allowed.
        max: u32,
    },

    /// Provider is unavailable.
    #[error("provider unavailable: {message}")]
    Unavailable {
        /// Error details.
        message: String,
    },

    /// API key or authentication failed.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Network error during request.
    #[error("network error: {0}")]
    Network(String),

    /// Failed to parse provider response.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid request configuration.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Request timed out.
    #[error("request timed out after {timeout_secs}s")]
    Timeout {
        /// Configured timeout.
        timeout_secs: u32,
    },
}

impl AIError {
    /// Creates a rate limited error.
    pub fn rate_limited(retry_after_secs: u32) -> Self {
        Self::RateLimited { retry_after_secs }
    }

    /// Creates a context too long error.
    pub fn context_too_long(tokens: u32, max: u32) -> Self {
        Self::ContextTooLong { tokens, max }
    }

    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Creates a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    /// Returns true if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AIError::RateLimited { .. }
                | AIError::Unavailable { .. }
                | AIError::Network(_)
                | AIError::Timeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_metadata() -> RequestMetadata {
        RequestMetadata::new(SessionId::new(), RequestPurpose::Chat, "trace-123")
    }

    #[test]
    fn completion_request_builder_works() {
        let request = CompletionRequest::new(test_metadata())
            .with_message(MessageRole::User, "สวัสดีครับ")
            .with_system_prompt("Be brief")
            .with_model("gpt-4o-mini")
            .with_max_tokens(100);

        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].role, MessageRole::User);
        assert_eq!(request.system_prompt, Some("Be brief".to_string()));
        assert_eq!(request.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(request.max_tokens, Some(100));
        assert!(request.temperature.is_none());
    }

    #[test]
    fn with_generation_copies_every_parameter() {
        let params = GenerationParams {
            temperature: Some(0.5),
            top_p: Some(0.8),
            frequency_penalty: Some(0.1),
            presence_penalty: Some(-0.1),
            seed: Some(42),
            max_tokens: Some(200),
        };
        let request = CompletionRequest::new(test_metadata()).with_generation(&params);

        assert_eq!(request.top_p, Some(0.8));
        assert_eq!(request.presence_penalty, Some(-0.1));
        assert_eq!(request.seed, Some(42));
        assert_eq!(request.max_tokens, Some(200));
    }

    #[test]
    fn token_usage_new_computes_total() {
        let usage = TokenUsage::new(100, 50);
        assert_eq!(usage.total_tokens, 150);
    }

    #[test]
    fn token_usage_add_accumulates() {
        let mut usage = TokenUsage::zero();
        usage.add(&TokenUsage::new(10, 5));
        usage.add(&TokenUsage::new(7, 3));
        assert_eq!(usage, TokenUsage::new(17, 8));
    }

    #[test]
    fn message_role_serializes_lowercase() {
        let json = serde_json::to_string(&MessageRole::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
    }

    #[test]
    fn retryable_errors_are_classified() {
        assert!(AIError::rate_limited(5).is_retryable());
        assert!(AIError::network("reset").is_retryable());
        assert!(AIError::Timeout { timeout_secs: 30 }.is_retryable());
        assert!(!AIError::AuthenticationFailed.is_retryable());
        assert!(!AIError::parse("bad json").is_retryable());
    }
}
