//! Orchestrator configuration.

use hearth_core::SessionParams;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for the inference orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Hard wall-clock timeout for one generation call.
    #[serde(default = "default_generation_timeout_secs")]
    pub generation_timeout_secs: u64,

    /// How long `initialize`/`cleanup` wait for an in-flight generation
    /// before force-releasing the session.
    #[serde(default = "default_settle_wait_secs")]
    pub settle_wait_secs: u64,

    /// Fixed native session parameters.
    #[serde(default)]
    pub session: SessionParams,
}

fn default_generation_timeout_secs() -> u64 {
    60
}

fn default_settle_wait_secs() -> u64 {
    5
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            generation_timeout_secs: default_generation_timeout_secs(),
            settle_wait_secs: default_settle_wait_secs(),
            session: SessionParams::default(),
        }
    }
}

impl OrchestratorConfig {
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }

    pub fn settle_wait(&self) -> Duration {
        Duration::from_secs(self.settle_wait_secs)
    }
}
