//! Error type shared by every component of the retrieval core.
//!
//! Missing input (an unknown term, a wildcard that matches nothing, an empty
//! token sequence) is never an error; those produce empty results.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SiftError {
    /// A token or docID is missing from a structure that must contain it.
    #[error("index integrity violated: {0}")]
    Integrity(String),

    #[error("query syntax error: {0}")]
    Syntax(String),

    #[error("unsupported wildcard pattern '{pattern}': {reason}")]
    Wildcard { pattern: String, reason: &'static str },

    #[error("build cancelled")]
    Cancelled,

    #[error("artifact I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("artifact encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl SiftError {
    /// Errors caused by the caller's query rather than by the index.
    pub fn is_query_error(&self) -> bool {
        matches!(self, SiftError::Syntax(_) | SiftError::Wildcard { .. })
    }
}

pub type Result<T> = std::result::Result<T, SiftError>;
