//! Inference orchestration for Hearth.
//!
//! The orchestrator owns the single native generation session: it decides
//! when a generation may start (single-flight), bounds it with a hard
//! wall-clock timeout, normalizes whatever the native binding returns, and
//! deterministically cleans and size-bounds the text. When the platform
//! has no native capability it degrades to the stub engine with identical
//! call signatures, so the caller-visible contract never changes.

pub mod chat;
pub mod config;
pub mod orchestrator;
pub mod postprocess;
pub mod stub;
pub mod template;

pub use chat::ChatSession;
pub use config::OrchestratorConfig;
pub use orchestrator::{EngineState, Orchestrator};
pub use stub::{StubEngine, StubSession};
