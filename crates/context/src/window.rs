//! Sliding context window with archival.
//!
//! The window keeps the most recent turns in a bounded `active` sequence
//! and moves overflow to an unbounded `archived` sequence, preserving
//! relative order (stable FIFO eviction). Archived messages stay available
//! to semantic retrieval; only an explicit reset clears them.
//!
//! # Determinism
//!
//! Context assembly is deterministic: identical inputs always produce
//! identical outputs. No random or time-dependent logic is used.

use hearth_core::{ContextError, Message};
use tracing::debug;

use crate::embedding::cosine_similarity;

/// Maximum number of messages kept in the active window.
pub const ACTIVE_LIMIT: usize = 10;

/// Token ceiling for an assembled context (chars / 4 heuristic).
pub const TOKEN_LIMIT: usize = 2048;

/// Default number of archived messages pulled in by retrieval.
pub const DEFAULT_TOP_K: usize = 3;

/// Estimate the token count for a message sequence.
///
/// Heuristic: 1 token ≈ 4 characters, rounded up over the total content
/// length. A fixed approximation, not a real tokenizer.
pub fn estimate_tokens(messages: &[Message]) -> usize {
    let chars: usize = messages.iter().map(|m| m.content.chars().count()).sum();
    chars.div_ceil(4)
}

/// The active/archived message sequences for one conversation.
#[derive(Debug, Default, Clone)]
pub struct ContextWindow {
    active: Vec<Message>,
    archived: Vec<Message>,
}

impl ContextWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message to the active window, then run window maintenance:
    /// anything past the limit moves to the end of the archive, oldest
    /// first.
    pub fn add_message(&mut self, message: Message) {
        self.active.push(message);
        if self.active.len() > ACTIVE_LIMIT {
            let overflow = self.active.len() - ACTIVE_LIMIT;
            self.archived.extend(self.active.drain(..overflow));
            debug!(
                archived = overflow,
                active = self.active.len(),
                archive_total = self.archived.len(),
                "Window maintenance moved overflow to archive"
            );
        }
    }

    /// The bounded recent window, oldest first.
    pub fn active(&self) -> &[Message] {
        &self.active
    }

    /// Everything evicted from the active window, oldest first.
    pub fn archived(&self) -> &[Message] {
        &self.archived
    }

    /// Retrieve up to `top_k` archived messages most similar to the query
    /// embedding, sorted by descending similarity (stable: ties keep
    /// original archive order). Only archived messages carrying an
    /// embedding are considered.
    pub fn retrieve_relevant(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<Message>, ContextError> {
        let mut scored: Vec<(f32, &Message)> = Vec::new();
        for message in &self.archived {
            if let Some(embedding) = &message.embedding {
                let score = cosine_similarity(embedding, query_embedding)?;
                scored.push((score, message));
            }
        }

        // sort_by is stable, so equal scores preserve archive order.
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored.into_iter().map(|(_, m)| m.clone()).collect())
    }

    /// Assemble the context for a generation call.
    ///
    /// When a query embedding is supplied, retrieved archived messages are
    /// placed *before* the entire active sequence. Semantically relevant
    /// older material deliberately precedes the most recent turns; the
    /// ordering is not chronological.
    pub fn build_context(
        &self,
        query_embedding: Option<&[f32]>,
    ) -> Result<Vec<Message>, ContextError> {
        let mut context = match query_embedding {
            Some(embedding) => self.retrieve_relevant(embedding, DEFAULT_TOP_K)?,
            None => Vec::new(),
        };
        context.extend(self.active.iter().cloned());
        Ok(context)
    }

    /// Whether a message sequence fits the fixed token ceiling.
    pub fn is_within_token_limit(messages: &[Message]) -> bool {
        estimate_tokens(messages) <= TOKEN_LIMIT
    }

    /// Empty both sequences.
    pub fn clear(&mut self) {
        self.active.clear();
        self.archived.clear();
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn archived_len(&self) -> usize {
        self.archived.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.archived.is_empty()
    }
}
