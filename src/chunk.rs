//! Fixed-width text chunker.
//!
//! Splits document text into [`Chunk`]s of at most `max_width` characters
//! using greedy word-wrapping: breaks happen on whitespace boundaries and a
//! word is never split unless it alone exceeds the width. Consecutive chunks
//! do not overlap. Joining the output back with single spaces reproduces the
//! input up to whitespace normalization at the wrap points.

use crate::error::ChatError;
use crate::models::Chunk;

/// Split text into chunks of at most `max_width` characters.
///
/// Pure function. Empty (or all-whitespace) input yields an empty sequence.
/// A `max_width` of zero is rejected with [`ChatError::Config`].
pub fn chunk_text(text: &str, max_width: usize) -> Result<Vec<Chunk>, ChatError> {
    if max_width == 0 {
        return Err(ChatError::Config(
            "chunk width must be a positive integer".to_string(),
        ));
    }

    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize; // in chars, not bytes

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > max_width {
            // A single word wider than the limit: flush the buffer, then
            // hard-split the word. The final partial piece stays in the
            // buffer so following words continue filling it.
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(max_width) {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                current = piece.iter().collect();
                current_len = piece.len();
            }
            continue;
        }

        let would_be = if current.is_empty() {
            word_len
        } else {
            current_len + 1 + word_len // +1 for the joining space
        };

        if would_be > max_width {
            lines.push(std::mem::take(&mut current));
            current = word.to_string();
            current_len = word_len;
        } else {
            if !current.is_empty() {
                current.push(' ');
                current_len += 1;
            }
            current.push_str(word);
            current_len += word_len;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }

    Ok(lines
        .into_iter()
        .enumerate()
        .map(|(index, text)| Chunk { index, text })
        .collect())
}
