//! Error types for the Hearth domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant. Every variant is a
//! distinguishable identifier so a presentation layer can map it to
//! user-facing text; that mapping lives outside this crate.

use thiserror::Error;

/// The top-level error type for all Hearth operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Engine errors ---
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    // --- Context errors ---
    #[error("Context error: {0}")]
    Context(#[from] ContextError),

    // --- Store errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Errors from the inference orchestrator and native sessions.
///
/// `Clone` because the batch queue fans a single batch failure out to
/// every queued caller.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("Engine is not initialized")]
    NotInitialized,

    #[error("A generation is already in progress")]
    AlreadyGenerating,

    #[error("Malformed generation input: {0}")]
    MalformedInput(String),

    #[error("Engine produced an empty response")]
    EmptyResponse,

    #[error("Generation timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    #[error("No native generation capability: {0}")]
    CapabilityUnavailable(String),

    #[error("Native engine error: {0}")]
    Native(String),

    #[error("Native session was released")]
    Released,
}

/// Errors from the context window manager.
#[derive(Debug, Clone, Error)]
pub enum ContextError {
    #[error("Embedding dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },
}

/// Errors from the conversation store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),
}
