//! Power-aware admission control for Hearth.
//!
//! Independent of context management and generation: this crate only knows
//! about the device power snapshot and turns it into throttle/defer/batch
//! decisions. The batching queue accepts concurrent callers and flushes
//! them as one batch; the direct chat flow does not go through it and uses
//! only the delay/throttle decisions.

pub mod monitor;
pub mod queue;

pub use monitor::PowerMonitor;
pub use queue::BatchQueue;
