//! Prompt assembly for the generation call.
//!
//! Produces one instruction string with four fixed sections, in order:
//! the system instruction, a `Context:` block of the retrieved chunks, a
//! `Chat History:` block of the recent turns, and the new question with an
//! empty answer slot. Nothing is truncated here; the prompt grows with its
//! inputs and the generation service's input limit is the caller's problem.

use crate::models::Turn;

/// Fixed instruction prefixed to every prompt.
pub const SYSTEM_INSTRUCTION: &str = "You are a helpful assistant, that answers based on the \
context and document provided. Use the provided context and chat history to answer the user's \
question.";

/// Compose the full prompt for one question.
///
/// `context` holds the retrieved chunk texts in rank order; `history` holds
/// the recent turns in chronological order (oldest first).
pub fn compose(question: &str, context: &[String], history: &[Turn]) -> String {
    let context_block = context.join("\n\n");

    let history_block = history
        .iter()
        .map(|turn| format!("User: {}\nBot: {}", turn.question, turn.answer))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{}\n\nContext:\n{}\n\nChat History:\n{}\n\nUser: {}\nBot:",
        SYSTEM_INSTRUCTION, context_block, history_block, question
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_appear_in_fixed_order() {
        let context = vec!["first chunk".to_string(), "second chunk".to_string()];
        let history = vec![Turn::new("q1", "a1")];
        let prompt = compose("what now?", &context, &history);

        let instruction_pos = prompt.find(SYSTEM_INSTRUCTION).unwrap();
        let context_pos = prompt.find("Context:").unwrap();
        let history_pos = prompt.find("Chat History:").unwrap();
        let question_pos = prompt.find("User: what now?").unwrap();

        assert!(instruction_pos < context_pos);
        assert!(context_pos < history_pos);
        assert!(history_pos < question_pos);
        assert!(prompt.ends_with("Bot:"));
    }

    #[test]
    fn chunks_are_joined_by_blank_lines() {
        let context = vec!["alpha".to_string(), "beta".to_string()];
        let prompt = compose("q", &context, &[]);
        assert!(prompt.contains("alpha\n\nbeta"));
    }

    #[test]
    fn history_renders_two_lines_per_turn_chronologically() {
        let history = vec![Turn::new("first?", "one."), Turn::new("second?", "two.")];
        let prompt = compose("third?", &[], &history);
        assert!(prompt.contains("User: first?\nBot: one.\nUser: second?\nBot: two."));
    }

    #[test]
    fn empty_history_and_context_still_compose() {
        let prompt = compose("hello", &[], &[]);
        assert!(prompt.contains("Context:\n\n"));
        assert!(prompt.contains("Chat History:\n\n"));
        assert!(prompt.ends_with("User: hello\nBot:"));
    }
}
