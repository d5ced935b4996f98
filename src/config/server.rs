//! Process-level configuration

use serde::Deserialize;

/// Process-level configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Rust log filter directive
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log line format
    #[serde(default)]
    pub log_format: LogFormat,
}

/// How log lines are rendered
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line, for log shippers
    Json,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info,osce_simulator=debug".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.log_level, "info,osce_simulator=debug");
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn test_log_format_parses_lowercase() {
        let format: LogFormat = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(format, LogFormat::Json);
        assert!(serde_json::from_str::<LogFormat>("\"xml\"").is_err());
    }
}
