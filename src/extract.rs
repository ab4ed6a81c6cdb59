//! Text extraction for uploaded files.
//!
//! The presentation layer supplies raw bytes plus a [`FileKind`]; this
//! module returns plain UTF-8 text. Plain text is decoded strictly (no
//! lossy replacement), PDF text is extracted page by page in page order
//! via `pdf-extract`.

use std::path::Path;

use crate::error::ChatError;

/// Supported upload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Text,
    Pdf,
}

impl FileKind {
    /// Infer the kind from a file name. Anything that is not `.pdf` is
    /// treated as plain text, matching the `.txt`/`.pdf` upload contract.
    pub fn from_name(name: &str) -> Self {
        match Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("pdf") => FileKind::Pdf,
            _ => FileKind::Text,
        }
    }
}

/// Extract plain text from file bytes.
///
/// Fails with [`ChatError::Decode`] when the bytes are not valid UTF-8
/// (text) or not a readable PDF.
pub fn extract_text(bytes: &[u8], kind: FileKind) -> Result<String, ChatError> {
    match kind {
        FileKind::Text => String::from_utf8(bytes.to_vec())
            .map_err(|e| ChatError::Decode(format!("file is not valid UTF-8: {}", e))),
        FileKind::Pdf => pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| ChatError::Decode(format!("PDF extraction failed: {}", e))),
    }
}
