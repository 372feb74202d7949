//! Context window management for Hearth.
//!
//! Owns the active/archived message sequences, the placeholder embedding
//! function, and semantic retrieval over the archive. Pure in-memory data
//! structure: no internal locking, callers serialize access.

pub mod embedding;
pub mod window;

pub use embedding::{cosine_similarity, generate_embedding, EMBEDDING_DIM};
pub use window::{estimate_tokens, ContextWindow, ACTIVE_LIMIT, TOKEN_LIMIT};
