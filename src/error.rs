//! Error kinds for processing a single annotation upload.
//!
//! Every failure while handling one document maps to exactly one of
//! these variants. None of them is fatal to the process: the caller
//! reports the message and moves on to the next upload.

use thiserror::Error;

/// Failure while turning one COCO document into area totals.
#[derive(Debug, Error)]
pub enum AreaError {
    /// The content is not syntactically valid JSON.
    #[error("invalid JSON: {0}")]
    Format(String),

    /// Valid JSON, but not the shape of a COCO annotation document.
    #[error("schema error: {0}")]
    Schema(String),

    /// Anything else (I/O while reading the upload, non-finite areas).
    #[error("{0}")]
    Unexpected(String),
}

impl AreaError {
    /// Short machine-readable kind, used in JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            AreaError::Format(_) => "format",
            AreaError::Schema(_) => "schema",
            AreaError::Unexpected(_) => "unexpected",
        }
    }
}

impl From<serde_json::Error> for AreaError {
    fn from(err: serde_json::Error) -> Self {
        use serde_json::error::Category;

        match err.classify() {
            Category::Syntax | Category::Eof => AreaError::Format(err.to_string()),
            Category::Data => AreaError::Schema(err.to_string()),
            Category::Io => AreaError::Unexpected(err.to_string()),
        }
    }
}

impl From<std::io::Error> for AreaError {
    fn from(err: std::io::Error) -> Self {
        AreaError::Unexpected(err.to_string())
    }
}
