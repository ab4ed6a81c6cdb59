//! # docchat
//!
//! Chat with a single uploaded document. The document (plain text or PDF)
//! is split into fixed-width chunks, indexed with TF-IDF weights, and each
//! question is answered by Gemini grounded in the top-ranked chunks plus
//! recent chat history.
//!
//! ## Architecture
//!
//! ```text
//! file bytes ──▶ extract ──▶ chunk ──▶ rank (TF-IDF index)
//!                                         │
//! question ───────────────────────────────┤
//!                                         ▼
//!                  history ──▶ prompt ──▶ generate (Gemini) ──▶ turn
//! ```
//!
//! All state lives in a [`session::Session`]: the chunk/index pair is
//! bundled in one [`session::DocumentIndex`] and replaced atomically on
//! re-upload, and the turn history dies with the session.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Error taxonomy ([`error::ChatError`]) |
//! | [`extract`] | Text/PDF decoding |
//! | [`chunk`] | Fixed-width word-wrap chunking |
//! | [`rank`] | TF-IDF relevance index and top-K retrieval |
//! | [`prompt`] | Prompt assembly |
//! | [`generate`] | Generator trait and the Gemini client |
//! | [`session`] | Session context: document, index, history |
//! | [`server`] | JSON HTTP API |

pub mod chunk;
pub mod config;
pub mod error;
pub mod extract;
pub mod generate;
pub mod models;
pub mod prompt;
pub mod rank;
pub mod server;
pub mod session;
