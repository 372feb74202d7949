//! Power snapshot and admission policy.
//!
//! `PowerMonitor` keeps the latest `PowerState` pushed by an external
//! provider and answers policy questions synchronously. When no provider
//! is ever attached the snapshot stays at the full-battery default, so
//! every policy degrades to "no restriction".

use hearth_core::{BatchConfig, PowerState, PowerStatusSource};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Battery level below which uncharged inference is throttled.
const THROTTLE_LEVEL: f32 = 0.20;

/// Battery level below which non-critical background work is deferred.
const DEFER_LEVEL: f32 = 0.15;

/// Holds the power snapshot and derives admission decisions from it.
#[derive(Clone, Default)]
pub struct PowerMonitor {
    state: Arc<RwLock<PowerState>>,
}

impl PowerMonitor {
    /// Create a monitor with the fallback snapshot (full battery).
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the provider's current snapshot and follow its updates.
    ///
    /// Returns the updater task handle so the host can abort it on
    /// shutdown.
    pub fn attach(&self, source: &dyn PowerStatusSource) -> JoinHandle<()> {
        self.set_state(source.current());
        let mut rx = source.subscribe();
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let snapshot = *rx.borrow();
                debug!(
                    level = snapshot.level,
                    charging = snapshot.charging,
                    low_power = snapshot.low_power,
                    "Power state updated"
                );
                *state.write().expect("power state lock poisoned") = snapshot;
            }
            info!("Power status provider went away, keeping last snapshot");
        })
    }

    /// Replace the snapshot directly (tests, synchronous providers).
    pub fn set_state(&self, snapshot: PowerState) {
        *self.state.write().expect("power state lock poisoned") = snapshot;
    }

    /// The current snapshot.
    pub fn current(&self) -> PowerState {
        *self.state.read().expect("power state lock poisoned")
    }

    /// Whether inference should be throttled right now.
    ///
    /// Charging always disables throttling regardless of level.
    pub fn should_throttle_inference(&self) -> bool {
        let s = self.current();
        !s.charging && (s.level < THROTTLE_LEVEL || s.low_power)
    }

    /// Whether non-critical background work should be deferred.
    ///
    /// Stricter than throttling and deliberately charging-insensitive:
    /// background work stays deferred even while plugged in.
    pub fn should_defer_non_critical(&self) -> bool {
        let s = self.current();
        s.level < DEFER_LEVEL || s.low_power
    }

    /// Batching parameters for the current power state.
    pub fn batch_config(&self) -> BatchConfig {
        let s = self.current();
        if s.charging {
            BatchConfig::new(1, 100)
        } else if s.level < THROTTLE_LEVEL || s.low_power {
            BatchConfig::new(5, 5000)
        } else if s.level < 0.50 {
            BatchConfig::new(3, 2000)
        } else {
            BatchConfig::new(2, 1000)
        }
    }

    /// Coarser delay schedule used for single-request gating (not
    /// batching).
    pub fn recommended_delay(&self) -> Duration {
        let s = self.current();
        if s.charging {
            Duration::ZERO
        } else if s.level < 0.15 {
            Duration::from_millis(5000)
        } else if s.level < 0.30 {
            Duration::from_millis(2000)
        } else {
            Duration::ZERO
        }
    }
}
