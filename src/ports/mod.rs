//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `AIProvider` - Chat, classification and summarization completions
//! - `CaseRepository` - Loading authored case profiles

mod ai_provider;
mod case_repository;

pub use ai_provider::{
    AIError, AIProvider, CompletionRequest, CompletionResponse, FinishReason, Message,
    MessageRole, RequestMetadata, RequestPurpose, TokenUsage,
};
pub use case_repository::{CaseLoadError, CaseRepository};
