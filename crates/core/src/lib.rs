//! # Hearth Core
//!
//! Domain types, traits, and error definitions for the Hearth on-device
//! inference orchestrator. This crate has **zero framework dependencies** —
//! it defines the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is defined as a trait here: the native
//! generation provider, the conversation store, and the power status source.
//! Implementations live in their respective crates (or in the host
//! application). This enables:
//! - Swapping the real native binding for the stub engine at startup
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod engine;
pub mod error;
pub mod generation;
pub mod message;
pub mod power;
pub mod store;

// Re-export key types at crate root for ergonomics
pub use engine::{ModelHandle, NativeEngine, NativeOutput, NativeSession, SessionParams};
pub use error::{ContextError, EngineError, Error, Result, StoreError};
pub use generation::{GenerationInput, GenerationOptions};
pub use message::{Message, Role};
pub use power::{BatchConfig, PowerState, PowerStatusSource};
pub use store::{ConversationStore, InMemoryStore};
