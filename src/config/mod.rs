//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `OSCE_SIM` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use osce_simulator::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Cases are read from {}", config.session.case_dir.display());
//! ```

mod ai;
mod conversation;
mod error;
mod server;
mod session;

pub use ai::AiConfig;
pub use conversation::ConversationConfig;
pub use error::{ConfigError, ValidationError};
pub use server::{LogFormat, ServerConfig};
pub use session::SessionConfig;

use serde::Deserialize;

use crate::application::conversation::EngineConfig;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Process configuration (log filter and format)
    #[serde(default)]
    pub server: ServerConfig,

    /// AI provider configuration (OpenAI-compatible API)
    #[serde(default)]
    pub ai: AiConfig,

    /// Conversation engine configuration (model, exam mode, memory)
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// Session lifecycle configuration (timeouts, case directory)
    #[serde(default)]
    pub session: SessionConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `OSCE_SIM` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `OSCE_SIM__AI__OPENAI_API_KEY=...` -> `ai.openai_api_key = ...`
    /// - `OSCE_SIM__CONVERSATION__MEMORY_MODE=truncate` -> `conversation.memory_mode = truncate`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types,
    /// including an unsupported chat model.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("OSCE_SIM")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.ai.validate()?;
        self.conversation.validate()?;
        self.session.validate()?;
        Ok(())
    }

    /// Engine configuration for new sessions
    pub fn engine_config(&self) -> EngineConfig {
        self.conversation.to_engine_config(&self.ai)
    }
}
