//! Placeholder embeddings and similarity.
//!
//! The embedding is a deterministic hashed bag-of-words vector, not a real
//! embedding model: lowercase the text, split on whitespace, hash each
//! token into one of 128 buckets, L2-normalize. Identical text always
//! yields a bit-identical vector, which is the only property retrieval
//! relies on. Do not "improve" this into a learned model — the contract
//! is determinism.

use hearth_core::ContextError;

/// Fixed embedding dimensionality.
pub const EMBEDDING_DIM: usize = 128;

/// Polynomial string hash over the token's UTF-8 bytes.
fn token_hash(token: &str) -> u32 {
    let mut h: u32 = 0;
    for byte in token.bytes() {
        h = h.wrapping_mul(31).wrapping_add(u32::from(byte));
    }
    h
}

/// Generate the deterministic 128-dim embedding for a text.
///
/// The result is L2-normalized (norm ≈ 1) for any tokenizable text; a
/// zero vector (empty/whitespace-only input) is left as-is by treating
/// its norm as 1.
pub fn generate_embedding(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; EMBEDDING_DIM];

    for token in text.to_lowercase().split_whitespace() {
        let bucket = (token_hash(token) as usize) % EMBEDDING_DIM;
        vector[bucket] += 1.0;
    }

    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    let norm = if norm == 0.0 { 1.0 } else { norm };
    for v in &mut vector {
        *v /= norm;
    }
    vector
}

/// Cosine similarity between two vectors of equal length.
///
/// Accumulates in f64 for stability; fails when the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, ContextError> {
    if a.len() != b.len() {
        return Err(ContextError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = f64::from(*x);
        let y = f64::from(*y);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        return Ok(0.0);
    }
    Ok((dot / denom) as f32)
}
