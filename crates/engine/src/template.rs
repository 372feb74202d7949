//! Chat template wire format.
//!
//! Used when a native binding accepts a raw prompt string rather than
//! structured messages:
//! `<|system|>\n{content}</s>\n<|user|>\n{content}</s>\n<|assistant|>\n`
//!
//! A formatted prompt always ends with a bare assistant-start marker
//! awaiting completion.

use hearth_core::{Message, Role};

/// Turn-start markers.
pub const SYSTEM_MARKER: &str = "<|system|>";
pub const USER_MARKER: &str = "<|user|>";
pub const ASSISTANT_MARKER: &str = "<|assistant|>";

/// End-of-turn marker.
pub const END_OF_TURN: &str = "</s>";

/// End-of-text marker some bindings emit instead of end-of-turn.
pub const END_OF_TEXT: &str = "<|endoftext|>";

fn marker_for(role: Role) -> &'static str {
    match role {
        Role::System => SYSTEM_MARKER,
        Role::User => USER_MARKER,
        Role::Assistant => ASSISTANT_MARKER,
    }
}

/// Format ordered messages into the raw prompt wire format.
pub fn format_prompt(messages: &[Message]) -> String {
    let mut prompt = String::new();
    for msg in messages {
        prompt.push_str(marker_for(msg.role));
        prompt.push('\n');
        prompt.push_str(&msg.content);
        prompt.push_str(END_OF_TURN);
        prompt.push('\n');
    }
    prompt.push_str(ASSISTANT_MARKER);
    prompt.push('\n');
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_conversation_layout() {
        let messages = vec![
            Message::system("You are helpful."),
            Message::user("Hello!"),
            Message::assistant("Hi, how can I help?"),
            Message::user("What is Rust?"),
        ];
        let prompt = format_prompt(&messages);

        assert!(prompt.starts_with("<|system|>\nYou are helpful.</s>\n"));
        assert!(prompt.contains("<|user|>\nHello!</s>\n"));
        assert!(prompt.contains("<|assistant|>\nHi, how can I help?</s>\n"));
        assert!(prompt.ends_with("<|assistant|>\n"));
    }

    #[test]
    fn empty_conversation_is_bare_assistant_start() {
        assert_eq!(format_prompt(&[]), "<|assistant|>\n");
    }

    #[test]
    fn every_turn_is_closed() {
        let messages = vec![Message::user("a"), Message::user("b")];
        let prompt = format_prompt(&messages);
        assert_eq!(prompt.matches(END_OF_TURN).count(), 2);
    }
}
