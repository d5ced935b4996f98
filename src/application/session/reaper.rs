//! SessionReaper - Background service that ends abandoned sessions.
//!
//! Every sweep removes sessions whose last activity is older than the
//! inactivity timeout and closes their engines, logging the final usage.
//!
//! ## Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `inactivity_timeout` | 30 min | Idle time before a session is ended |
//! | `sweep_interval` | 60 s | How often to look for idle sessions |
//!
//! ## Graceful Shutdown
//!
//! The service listens on a watch channel and runs one last sweep before
//! returning.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;

use crate::domain::foundation::Timestamp;

use super::store::SessionStore;

/// Configuration for the SessionReaper service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionReaperConfig {
    pub inactivity_timeout: Duration,
    pub sweep_interval: Duration,
}

impl Default for SessionReaperConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout: Duration::from_secs(1800),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl SessionReaperConfig {
    pub fn with_inactivity_timeout(mut self, timeout: Duration) -> Self {
        self.inactivity_timeout = timeout;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }
}

/// Background service that reaps idle sessions.
pub struct SessionReaper {
    sessions: Arc<dyn SessionStore>,
    config: SessionReaperConfig,
}

impl SessionReaper {
    pub fn new(sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            sessions,
            config: SessionReaperConfig::default(),
        }
    }

    pub fn with_config(sessions: Arc<dyn SessionStore>, config: SessionReaperConfig) -> Self {
        Self { sessions, config }
    }

    /// Run the sweep loop until the shutdown signal is received.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.config.sweep_interval);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        self.sweep_once().await;
                        tracing::debug!("Session reaper stopped");
                        return;
                    }
                }

                _ = interval.tick() => {
                    self.sweep_once().await;
                }
            }
        }
    }

    /// Ends every idle session once. Returns how many were reaped.
    pub async fn sweep_once(&self) -> usize {
        let idle = self
            .sessions
            .idle_sessions(self.config.inactivity_timeout, Timestamp::now())
            .await;

        let mut reaped = 0;
        for session_id in idle {
            // Another caller may have ended it since the scan.
            let Ok(entry) = self.sessions.remove(session_id).await else {
                continue;
            };
            let mut engine = entry.engine.lock().await;
            let usage = engine.close();
            reaped += 1;
            tracing::info!(
                session_id = %session_id,
                case_id = %entry.metadata.case_id,
                turns = engine.turn_count(),
                total_tokens = usage.total_tokens,
                "Reaped idle session"
            );
        }
        reaped
    }
}
