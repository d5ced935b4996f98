//! Session lifecycle configuration

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::application::session::SessionReaperConfig;

use super::error::ValidationError;

/// Session lifecycle configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Idle seconds before a session is ended
    #[serde(default = "default_inactivity_timeout")]
    pub inactivity_timeout_secs: u64,

    /// Seconds between reaper sweeps
    #[serde(default = "default_reaper_interval")]
    pub reaper_interval_secs: u64,

    /// Directory holding `<case_id>.json` / `.yaml` case files
    #[serde(default = "default_case_dir")]
    pub case_dir: PathBuf,
}

impl SessionConfig {
    pub fn reaper_config(&self) -> SessionReaperConfig {
        SessionReaperConfig::default()
            .with_inactivity_timeout(Duration::from_secs(self.inactivity_timeout_secs))
            .with_sweep_interval(Duration::from_secs(self.reaper_interval_secs))
    }

    /// Validate session configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.inactivity_timeout_secs == 0 {
            return Err(ValidationError::InvalidInactivityTimeout);
        }
        if self.reaper_interval_secs == 0 || self.reaper_interval_secs > self.inactivity_timeout_secs {
            return Err(ValidationError::InvalidReaperInterval);
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout_secs: default_inactivity_timeout(),
            reaper_interval_secs: default_reaper_interval(),
            case_dir: default_case_dir(),
        }
    }
}

fn default_inactivity_timeout() -> u64 {
    1800
}

fn default_reaper_interval() -> u64 {
    60
}

fn default_case_dir() -> PathBuf {
    PathBuf::from("cases")
}
