//! Centralized error types for mboxtext.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mboxtext library.
#[derive(Error, Debug)]
pub enum MboxError {
    /// I/O error with the associated file path.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified file does not exist.
    #[error("MBOX file not found: {0}")]
    FileNotFound(PathBuf),

    /// No message with this ordinal exists in the table of contents.
    #[error("Message {0} not found")]
    MessageNotFound(usize),

    /// A range of ordinals escapes `[1, count]` or is reversed.
    #[error("Message range {start}..={end} out of bounds (mailbox has {count} messages)")]
    OutOfBounds {
        start: usize,
        end: usize,
        count: usize,
    },
}

/// Convenience alias for `Result<T, MboxError>`.
pub type Result<T> = std::result::Result<T, MboxError>;

impl MboxError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Allow `?` on `std::io::Error` when no path context is available
/// (rare, prefer `MboxError::io`).
impl From<std::io::Error> for MboxError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}
