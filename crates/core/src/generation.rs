//! Generation request types.
//!
//! `GenerationOptions` carries the sampling parameters for a native call.
//! Out-of-range values are clamped into their defined ranges rather than
//! rejected, so a sloppy caller still gets a usable request.

use serde::{Deserialize, Serialize};

use crate::message::Message;

/// Sampling options for a single generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Maximum tokens to generate.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Temperature, clamped to [0.1, 2.0].
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Nucleus sampling threshold, clamped to [0.1, 1.0].
    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Top-k sampling cutoff.
    #[serde(default = "default_top_k")]
    pub top_k: u32,

    /// Repetition penalty, clamped to >= 1.0.
    #[serde(default = "default_repeat_penalty")]
    pub repeat_penalty: f32,

    /// Stop sequences.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
}

fn default_max_tokens() -> u32 {
    512
}

fn default_temperature() -> f32 {
    0.7
}

fn default_top_p() -> f32 {
    0.9
}

fn default_top_k() -> u32 {
    40
}

fn default_repeat_penalty() -> f32 {
    1.1
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            top_k: default_top_k(),
            repeat_penalty: default_repeat_penalty(),
            stop: Vec::new(),
        }
    }
}

impl GenerationOptions {
    /// Return a copy with every value clamped into its defined range.
    pub fn clamped(&self) -> Self {
        Self {
            max_tokens: self.max_tokens,
            temperature: self.temperature.clamp(0.1, 2.0),
            top_p: self.top_p.clamp(0.1, 1.0),
            top_k: self.top_k,
            repeat_penalty: self.repeat_penalty.max(1.0),
            stop: self.stop.clone(),
        }
    }
}

/// Input accepted by the orchestrator's `generate` call.
///
/// A bare string is promoted to a one-turn message list with a default
/// system preamble during input normalization.
#[derive(Debug, Clone)]
pub enum GenerationInput {
    /// A single user turn with no prior context.
    Text(String),
    /// An explicit ordered message list.
    Messages(Vec<Message>),
}

impl From<&str> for GenerationInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for GenerationInput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<Message>> for GenerationInput {
    fn from(messages: Vec<Message>) -> Self {
        Self::Messages(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_in_range() {
        let opts = GenerationOptions::default();
        assert_eq!(opts.max_tokens, 512);
        assert_eq!(opts.clamped(), opts);
    }

    #[test]
    fn clamp_pulls_values_into_range() {
        let opts = GenerationOptions {
            temperature: 9.0,
            top_p: 0.0,
            repeat_penalty: 0.2,
            ..Default::default()
        };
        let clamped = opts.clamped();
        assert_eq!(clamped.temperature, 2.0);
        assert_eq!(clamped.top_p, 0.1);
        assert_eq!(clamped.repeat_penalty, 1.0);
    }

    #[test]
    fn clamp_leaves_valid_values_alone() {
        let opts = GenerationOptions {
            temperature: 0.3,
            top_p: 0.85,
            repeat_penalty: 1.2,
            ..Default::default()
        };
        assert_eq!(opts.clamped(), opts);
    }

    #[test]
    fn input_from_str_is_text() {
        let input: GenerationInput = "hello".into();
        assert!(matches!(input, GenerationInput::Text(t) if t == "hello"));
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let opts: GenerationOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(opts, GenerationOptions::default());
    }
}
