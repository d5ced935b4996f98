//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the application to external systems:
//! - `ai` - OpenAI-compatible chat completions and a mock provider
//! - `case` - Case profiles from disk or memory
//! - `session` - In-memory live-session registry

pub mod ai;
pub mod case;
pub mod session;

pub use ai::{MockAIProvider, MockError, OpenAIConfig, OpenAIProvider};
pub use case::{FileCaseRepository, InMemoryCaseRepository};
pub use session::InMemorySessionStore;
