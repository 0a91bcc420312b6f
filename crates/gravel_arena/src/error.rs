//! Error types for arena operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for arena operations.
pub type ArenaResult<T> = Result<T, ArenaError>;

/// Errors that can occur during arena operations.
///
/// Most variants are contract violations or environment failures the
/// embedding process should treat as fatal: an arena that failed to grow
/// or tripped a consistency check cannot be used safely afterwards. The
/// exception is [`ArenaError::Release`], which reports cleanup failures
/// the caller may want to log and continue past.
#[derive(Debug, Error)]
pub enum ArenaError {
    /// An I/O error occurred while setting up or growing the backing file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A growth request would push the arena past its configured maximum.
    #[error("arena max size exceeded: max {max_size}, cursor {cursor}, requested {requested}")]
    MaxSizeExceeded {
        /// The configured capacity ceiling.
        max_size: usize,
        /// The current write cursor.
        cursor: usize,
        /// The number of bytes requested past the cursor.
        requested: usize,
    },

    /// A record payload does not fit in the 4-byte length prefix.
    #[error("record payload too large: {len} bytes")]
    RecordTooLarge {
        /// The rejected payload length.
        len: usize,
    },

    /// An offset that can never start a record was passed to an operation.
    #[error("invalid record offset: {offset}")]
    InvalidOffset {
        /// The rejected offset.
        offset: usize,
    },

    /// An internal consistency check failed.
    #[error("arena corrupted: {message}")]
    Corrupted {
        /// Description of the violated invariant.
        message: String,
    },

    /// A step of releasing the arena's backing store failed.
    #[error("failed to {step} arena file {path}: {source}")]
    Release {
        /// The release step that failed.
        step: &'static str,
        /// Path of the backing file.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },
}

impl ArenaError {
    /// Creates a corruption error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted {
            message: message.into(),
        }
    }
}
