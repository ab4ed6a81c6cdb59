//! Core data models for the chat pipeline.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A bounded-length contiguous piece of the source document, the unit of
/// retrieval. Chunks are immutable once created; the whole sequence is
/// replaced wholesale when a new document is uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position within the document's chunk sequence, starting at 0.
    pub index: usize,
    pub text: String,
}

/// One completed question/answer exchange.
#[derive(Debug, Clone, Serialize)]
pub struct Turn {
    pub question: String,
    pub answer: String,
    /// When the answer came back. Rendering metadata only.
    pub answered_at: DateTime<Utc>,
}

impl Turn {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            answered_at: Utc::now(),
        }
    }
}

/// A chunk with its cosine-similarity score against a query.
#[derive(Debug, Clone, Serialize)]
pub struct RankedChunk {
    /// Index of the chunk in the document's chunk sequence.
    pub index: usize,
    /// Cosine similarity in `[0.0, 1.0]`.
    pub score: f64,
    pub text: String,
}
