//! The native generation capability seam.
//!
//! The actual text-generation engine is an opaque, long-running native
//! library owned by the host platform. Hearth talks to it through exactly
//! one interface — `NativeEngine` hands out `NativeSession`s — with two
//! implementations chosen once at startup: the real platform binding
//! (host-provided) and the stub engine in `hearth-engine`.
//!
//! Native bindings disagree on the shape of a generation result: some
//! return plain text, others wrap it in an object under one of several
//! conventional field names. `NativeOutput` absorbs all of those shapes
//! and normalizes them before they reach orchestrator logic.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::generation::GenerationOptions;
use crate::message::Message;

/// An opaque pointer to a model the host has already downloaded.
///
/// Two handles are considered the same model iff their paths match;
/// re-initializing with an identical handle is a no-op.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelHandle {
    /// Filesystem path to the model weights.
    pub path: String,
    /// Human-readable model name.
    pub name: String,
}

impl PartialEq for ModelHandle {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for ModelHandle {}

impl ModelHandle {
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
        }
    }
}

/// Fixed parameters used to acquire a native session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionParams {
    /// Context length in tokens.
    pub context_length: u32,
    /// Prompt-processing batch size.
    pub batch_size: u32,
    /// CPU threads used for inference.
    pub threads: u32,
    /// Whether to lock model memory (avoids paging stalls mid-generation).
    pub mlock: bool,
    /// Layers offloaded to the GPU. Zero on this class of device.
    pub gpu_layers: u32,
}

impl Default for SessionParams {
    fn default() -> Self {
        Self {
            context_length: 2048,
            batch_size: 512,
            threads: 4,
            mlock: true,
            gpu_layers: 0,
        }
    }
}

/// A generation result as produced by a native binding, in whichever shape
/// the binding happens to use.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NativeOutput {
    /// The binding returned plain text.
    Text(String),
    /// The binding returned a structured object.
    Structured(serde_json::Value),
}

/// Field names under which structured bindings expose the generated text.
const TEXT_FIELDS: &[&str] = &["text", "content", "response", "completion", "output"];

impl NativeOutput {
    /// Normalize any conventional output shape into the generated text.
    ///
    /// Returns `None` when the shape carries no recognizable text field.
    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Text(text) => Some(text),
            Self::Structured(value) => {
                if let serde_json::Value::String(text) = value {
                    return Some(text);
                }
                let obj = value.as_object()?;
                for field in TEXT_FIELDS {
                    if let Some(serde_json::Value::String(text)) = obj.get(*field) {
                        return Some(text.clone());
                    }
                }
                None
            }
        }
    }
}

impl From<&str> for NativeOutput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// A live generation session owned by exactly one orchestrator instance.
#[async_trait]
pub trait NativeSession: Send + Sync {
    /// Run one generation over ordered role-tagged messages.
    async fn complete(
        &mut self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> std::result::Result<NativeOutput, EngineError>;

    /// Release native resources. After this the session must not be used.
    async fn release(&mut self) -> std::result::Result<(), EngineError>;
}

/// The native capability: acquires sessions for a model handle.
#[async_trait]
pub trait NativeEngine: Send + Sync {
    /// A short name for logging (e.g. "llama", "stub").
    fn name(&self) -> &str;

    /// Acquire a new session. `EngineError::CapabilityUnavailable` signals
    /// that this platform cannot run real inference at all, which the
    /// orchestrator turns into stub mode rather than a hard failure.
    async fn acquire(
        &self,
        handle: &ModelHandle,
        params: &SessionParams,
    ) -> std::result::Result<Box<dyn NativeSession>, EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_text_passes_through() {
        let out = NativeOutput::Text("hello".into());
        assert_eq!(out.into_text().as_deref(), Some("hello"));
    }

    #[test]
    fn structured_text_field() {
        let out = NativeOutput::Structured(json!({"text": "hi"}));
        assert_eq!(out.into_text().as_deref(), Some("hi"));
    }

    #[test]
    fn structured_alternate_fields() {
        for field in ["content", "response", "completion", "output"] {
            let out = NativeOutput::Structured(json!({ field: "value" }));
            assert_eq!(out.into_text().as_deref(), Some("value"), "field {field}");
        }
    }

    #[test]
    fn structured_bare_string_value() {
        let out = NativeOutput::Structured(json!("raw"));
        assert_eq!(out.into_text().as_deref(), Some("raw"));
    }

    #[test]
    fn unrecognized_shape_is_none() {
        let out = NativeOutput::Structured(json!({"tokens": [1, 2, 3]}));
        assert!(out.into_text().is_none());
    }

    #[test]
    fn untagged_deserialization_picks_shape() {
        let text: NativeOutput = serde_json::from_str("\"plain\"").unwrap();
        assert!(matches!(text, NativeOutput::Text(_)));
        let obj: NativeOutput = serde_json::from_str("{\"text\":\"x\"}").unwrap();
        assert!(matches!(obj, NativeOutput::Structured(_)));
    }

    #[test]
    fn default_session_params_are_fixed() {
        let params = SessionParams::default();
        assert_eq!(params.context_length, 2048);
        assert_eq!(params.batch_size, 512);
        assert_eq!(params.threads, 4);
        assert!(params.mlock);
        assert_eq!(params.gpu_layers, 0);
    }

    #[test]
    fn handles_compare_by_path_only() {
        let a = ModelHandle::new("/models/tiny.gguf", "tiny");
        let b = ModelHandle::new("/models/tiny.gguf", "tinyllama-1.1b");
        let c = ModelHandle::new("/models/other.gguf", "tiny");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
