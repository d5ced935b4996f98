//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Too many retries configured: {0} (at most {limit})", limit = super::ai::MAX_RETRIES_LIMIT)]
    InvalidMaxRetries(u32),

    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("Model name must not be empty: {0}")]
    EmptyModel(&'static str),

    #[error("Session inactivity timeout must be positive")]
    InvalidInactivityTimeout,

    #[error("Reaper interval must be positive and shorter than the inactivity timeout")]
    InvalidReaperInterval,

    #[error("Invalid conversation setting: {0}")]
    Conversation(#[from] crate::domain::foundation::ValidationError),
}
