//! Error taxonomy for the chat pipeline.
//!
//! Every fallible operation in the core returns [`ChatError`]; the CLI and
//! HTTP layers surface the message to the user as-is. Nothing is retried
//! automatically and nothing is swallowed, with one documented exception:
//! query terms outside the fitted vocabulary are silently dropped during
//! ranking (a designed approximation, not an error).

/// Errors surfaced by the chat core.
#[derive(Debug)]
pub enum ChatError {
    /// Invalid configuration (e.g. chunk width of zero).
    Config(String),
    /// File bytes could not be decoded into text (invalid UTF-8, broken PDF).
    Decode(String),
    /// The document produced no chunks, so no vocabulary can be fitted.
    InsufficientData,
    /// A question was asked before a document was successfully indexed.
    NotReady,
    /// The external generation service failed (network, auth, quota, or a
    /// malformed response). Carries the underlying cause as text.
    Generation(String),
}

impl std::fmt::Display for ChatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatError::Config(msg) => write!(f, "invalid configuration: {}", msg),
            ChatError::Decode(msg) => write!(f, "could not decode file: {}", msg),
            ChatError::InsufficientData => {
                write!(f, "document is empty: nothing to index")
            }
            ChatError::NotReady => {
                write!(f, "no document indexed yet: upload a file first")
            }
            ChatError::Generation(msg) => write!(f, "generation failed: {}", msg),
        }
    }
}

impl std::error::Error for ChatError {}
