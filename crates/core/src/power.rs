//! Power status domain types.
//!
//! The admission controller reads a `PowerState` snapshot that an external
//! platform provider pushes asynchronously. The snapshot types live here so
//! both the controller and the host application share one definition.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::watch;

/// A point-in-time snapshot of device power status.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerState {
    /// Battery level in [0.0, 1.0].
    pub level: f32,
    /// Whether the device is plugged in.
    pub charging: bool,
    /// Whether the OS low-power mode is enabled.
    pub low_power: bool,
}

impl Default for PowerState {
    /// The fallback snapshot used when no provider is available:
    /// full battery, not charging, no low-power mode.
    fn default() -> Self {
        Self {
            level: 1.0,
            charging: false,
            low_power: false,
        }
    }
}

/// Batching parameters derived from the current power state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    /// Flush as soon as this many requests are pending.
    pub max_batch_size: usize,
    /// Flush a partial batch after this long.
    pub max_wait: Duration,
}

impl BatchConfig {
    pub fn new(max_batch_size: usize, max_wait_ms: u64) -> Self {
        Self {
            max_batch_size,
            max_wait: Duration::from_millis(max_wait_ms),
        }
    }
}

/// A push-based source of power status updates.
///
/// The platform side implements this; the admission controller consumes the
/// initial snapshot synchronously and then follows the watch channel.
pub trait PowerStatusSource: Send + Sync {
    /// Current snapshot, read synchronously.
    fn current(&self) -> PowerState;

    /// Subscribe to subsequent updates.
    fn subscribe(&self) -> watch::Receiver<PowerState>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_full_battery() {
        let state = PowerState::default();
        assert_eq!(state.level, 1.0);
        assert!(!state.charging);
        assert!(!state.low_power);
    }

    #[test]
    fn batch_config_wait_in_millis() {
        let cfg = BatchConfig::new(5, 5000);
        assert_eq!(cfg.max_batch_size, 5);
        assert_eq!(cfg.max_wait, Duration::from_secs(5));
    }
}
